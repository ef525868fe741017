use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Account a user is permitted to see, as reported by the user-info provider.
///
/// Opaque to the engine beyond its identity; the display name exists for
/// front ends that enumerate accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermittedAccount {
    pub name: String,
    pub display_name: String,
}

impl PermittedAccount {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

/// Long-lived per-account credentials held inside the sealed store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileEntry {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub region: String,
}

/// Ephemeral credentials minted by the cloud role-assumption API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: SystemTime,
}
