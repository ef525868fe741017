use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const DEFAULT_ACCOUNTS_TTL_SECS: u64 = 300;
const DEFAULT_ROLES_TTL_SECS: u64 = 120;

/// Active broker configuration.
///
/// Parsed by an external collaborator (the engine only consumes the typed
/// value) and swapped in as a whole, never mutated field-by-field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Configuration {
    /// TTL applied to entries of the user -> accounts cache.
    pub accounts_cache_ttl: Duration,
    /// TTL applied to entries of the (user, account) -> roles cache.
    pub roles_cache_ttl: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            accounts_cache_ttl: Duration::from_secs(DEFAULT_ACCOUNTS_TTL_SECS),
            roles_cache_ttl: Duration::from_secs(DEFAULT_ROLES_TTL_SECS),
        }
    }
}

impl Configuration {
    fn validate(&self) -> Result<()> {
        if self.accounts_cache_ttl.is_zero() {
            return Err(Error::Config("accounts_cache_ttl must be non-zero".into()));
        }
        if self.roles_cache_ttl.is_zero() {
            return Err(Error::Config("roles_cache_ttl must be non-zero".into()));
        }
        Ok(())
    }
}

/// Shared slot holding the active configuration.
///
/// Readers take a snapshot of the TTLs at the moment they store a cache
/// entry; entries already cached keep their original expiration after a
/// swap.
#[derive(Debug)]
pub struct ConfigHandle {
    inner: Mutex<Configuration>,
}

impl ConfigHandle {
    pub fn new(initial: Configuration) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Atomically replace the active configuration.
    ///
    /// An absent configuration is a caller error, not a reset.
    pub fn swap(&self, config: Option<Configuration>) -> Result<()> {
        let config = config.ok_or_else(|| Error::Config("no configuration supplied".into()))?;
        config.validate()?;
        debug!(
            accounts_ttl_secs = config.accounts_cache_ttl.as_secs(),
            roles_ttl_secs = config.roles_cache_ttl.as_secs(),
            "configuration updated"
        );
        *self.inner.lock().unwrap() = config;
        Ok(())
    }

    pub fn snapshot(&self) -> Configuration {
        self.inner.lock().unwrap().clone()
    }

    pub fn accounts_ttl(&self) -> Duration {
        self.inner.lock().unwrap().accounts_cache_ttl
    }

    pub fn roles_ttl(&self) -> Duration {
        self.inner.lock().unwrap().roles_cache_ttl
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_rejects_absent_configuration() {
        let handle = ConfigHandle::default();
        let before = handle.snapshot();

        let err = handle.swap(None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(handle.snapshot(), before);
    }

    #[test]
    fn swap_rejects_zero_ttls() {
        let handle = ConfigHandle::default();
        let err = handle
            .swap(Some(Configuration {
                accounts_cache_ttl: Duration::ZERO,
                roles_cache_ttl: Duration::from_secs(60),
            }))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn swap_replaces_whole_value() {
        let handle = ConfigHandle::default();
        let next = Configuration {
            accounts_cache_ttl: Duration::from_secs(30),
            roles_cache_ttl: Duration::from_secs(15),
        };
        handle.swap(Some(next.clone())).unwrap();
        assert_eq!(handle.snapshot(), next);
        assert_eq!(handle.roles_ttl(), Duration::from_secs(15));
    }
}
