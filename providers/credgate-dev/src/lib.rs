//! In-memory development implementations of the credgate collaborator
//! traits: a user-info table, a deterministic fake STS, and a toy
//! federation endpoint. Useful for local development and integration
//! tests; never for production.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use credgate_core::{
    CloudTokenApi, Error, FederationApi, PermittedAccount, ProfileEntry, Result,
    TokenCredentials, UserInfoProvider,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

const DEFAULT_SESSION_DURATION_SECS: u64 = 3600;
const DEFAULT_FEDERATION_ENDPOINT: &str = "https://signin.aws.amazon.com/federation";

/// User-info provider backed by in-memory tables.
#[derive(Default)]
pub struct DevUserInfo {
    accounts: Mutex<HashMap<String, Vec<PermittedAccount>>>,
    roles: Mutex<HashMap<(String, String), Vec<String>>>,
}

impl DevUserInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `account` visible to `user`.
    pub fn grant_account(&self, user: &str, account: PermittedAccount) {
        self.accounts
            .lock()
            .unwrap()
            .entry(user.to_string())
            .or_default()
            .push(account);
    }

    /// Grant `user` the role `role` within `account`.
    pub fn grant_role(&self, user: &str, account: &str, role: &str) {
        self.roles
            .lock()
            .unwrap()
            .entry((user.to_string(), account.to_string()))
            .or_default()
            .push(role.to_string());
    }

    /// Replace the role set for `user` in `account`.
    pub fn set_roles(&self, user: &str, account: &str, roles: Vec<String>) {
        self.roles
            .lock()
            .unwrap()
            .insert((user.to_string(), account.to_string()), roles);
    }
}

impl UserInfoProvider for DevUserInfo {
    fn accounts_for_user(&self, username: &str) -> Result<Vec<PermittedAccount>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .unwrap_or_default())
    }

    fn roles_for_user_in_account(&self, username: &str, account: &str) -> Result<Vec<String>> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&(username.to_string(), account.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Deterministic fake STS and federation endpoint.
///
/// Credentials are derived by hashing the profile, account, and role, so
/// repeated calls for the same triple are stable and distinct triples
/// never collide.
pub struct DevCloudApi {
    session_duration: Duration,
    endpoint: String,
}

impl Default for DevCloudApi {
    fn default() -> Self {
        Self {
            session_duration: Duration::from_secs(DEFAULT_SESSION_DURATION_SECS),
            endpoint: DEFAULT_FEDERATION_ENDPOINT.to_string(),
        }
    }
}

impl DevCloudApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn digest(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl CloudTokenApi for DevCloudApi {
    fn assume_role(
        &self,
        profile: &ProfileEntry,
        account: &str,
        role: &str,
    ) -> Result<TokenCredentials> {
        let seed = Self::digest(&[&profile.access_key_id, account, role]);
        Ok(TokenCredentials {
            access_key_id: format!("ASIA{}", &seed[..16]),
            secret_access_key: Self::digest(&[&profile.secret_access_key, account, role]),
            session_token: Self::digest(&[&seed, "session"]),
            expiration: SystemTime::now() + self.session_duration,
        })
    }
}

impl FederationApi for DevCloudApi {
    fn signin_token(&self, credentials: &TokenCredentials) -> Result<String> {
        let payload = serde_json::to_vec(credentials)
            .map_err(|err| Error::Federation(err.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    fn console_url(&self, signin_token: &str, issuer_url: &str) -> Result<String> {
        if issuer_url.is_empty() {
            return Err(Error::Federation("issuer URL must not be empty".into()));
        }
        Ok(format!(
            "{}?Action=login&Issuer={issuer_url}&SigninToken={signin_token}",
            self.endpoint
        ))
    }
}
