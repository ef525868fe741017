use crate::cache::{PermissionCache, RoleKey};
use crate::config::ConfigHandle;
use crate::errors::Result;
use crate::types::PermittedAccount;
use crate::userinfo::UserInfoProvider;
use std::sync::Arc;
use tracing::debug;

/// Answers "may user U see account A / assume role R in A".
///
/// Decisions are memoized in two independent caches. On a miss the
/// provider is queried with no cache lock held; the result is written back
/// afterwards. Duplicate concurrent refreshes of a cold key are tolerated
/// rather than serializing every caller behind one slow lookup. Provider
/// failures fail closed: no stale cached value is ever served.
pub struct AuthorizationEngine {
    provider: Arc<dyn UserInfoProvider>,
    config: Arc<ConfigHandle>,
    accounts: PermissionCache<String, Vec<PermittedAccount>>,
    roles: PermissionCache<RoleKey, Vec<String>>,
}

impl AuthorizationEngine {
    pub fn new(provider: Arc<dyn UserInfoProvider>, config: Arc<ConfigHandle>) -> Self {
        Self {
            provider,
            config,
            accounts: PermissionCache::new(),
            roles: PermissionCache::new(),
        }
    }

    /// Accounts the user may enumerate. Display-only visibility; not a
    /// prerequisite for role authorization.
    pub fn allowed_accounts(&self, username: &str) -> Result<Vec<PermittedAccount>> {
        if let Some(accounts) = self.accounts.lookup(username) {
            debug!(user = username, "accounts cache hit");
            return Ok(accounts);
        }

        let accounts = self.provider.accounts_for_user(username)?;
        debug!(
            user = username,
            accounts = accounts.len(),
            "accounts refreshed from provider"
        );
        self.accounts.store(
            username.to_string(),
            accounts.clone(),
            self.config.accounts_ttl(),
        );
        Ok(accounts)
    }

    /// Exact, case-sensitive membership of `role` in the user's role set
    /// for `account`. Authoritative on its own.
    pub fn can_assume_role(&self, username: &str, account: &str, role: &str) -> Result<bool> {
        let key = RoleKey::new(username, account);
        let roles = match self.roles.lookup(&key) {
            Some(roles) => {
                debug!(user = username, account, "roles cache hit");
                roles
            }
            None => {
                let roles = self.provider.roles_for_user_in_account(username, account)?;
                debug!(
                    user = username,
                    account,
                    roles = roles.len(),
                    "roles refreshed from provider"
                );
                self.roles.store(key, roles.clone(), self.config.roles_ttl());
                roles
            }
        };

        Ok(roles.iter().any(|candidate| candidate == role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigHandle, Configuration};
    use crate::errors::Error;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct TableProvider {
        accounts: Mutex<HashMap<String, Vec<PermittedAccount>>>,
        roles: Mutex<HashMap<(String, String), Vec<String>>>,
        account_calls: AtomicUsize,
        role_calls: AtomicUsize,
        failing: Mutex<bool>,
    }

    impl TableProvider {
        fn grant_role(&self, user: &str, account: &str, role: &str) {
            self.roles
                .lock()
                .unwrap()
                .entry((user.to_string(), account.to_string()))
                .or_default()
                .push(role.to_string());
        }

        fn set_roles(&self, user: &str, account: &str, roles: Vec<String>) {
            self.roles
                .lock()
                .unwrap()
                .insert((user.to_string(), account.to_string()), roles);
        }

        fn grant_account(&self, user: &str, account: PermittedAccount) {
            self.accounts
                .lock()
                .unwrap()
                .entry(user.to_string())
                .or_default()
                .push(account);
        }

        fn set_failing(&self, failing: bool) {
            *self.failing.lock().unwrap() = failing;
        }
    }

    impl UserInfoProvider for TableProvider {
        fn accounts_for_user(&self, username: &str) -> Result<Vec<PermittedAccount>> {
            self.account_calls.fetch_add(1, Ordering::SeqCst);
            if *self.failing.lock().unwrap() {
                return Err(Error::Upstream("directory unavailable".into()));
            }
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .get(username)
                .cloned()
                .unwrap_or_default())
        }

        fn roles_for_user_in_account(&self, username: &str, account: &str) -> Result<Vec<String>> {
            self.role_calls.fetch_add(1, Ordering::SeqCst);
            if *self.failing.lock().unwrap() {
                return Err(Error::Upstream("directory unavailable".into()));
            }
            Ok(self
                .roles
                .lock()
                .unwrap()
                .get(&(username.to_string(), account.to_string()))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn engine_with(provider: Arc<TableProvider>, roles_ttl: Duration) -> AuthorizationEngine {
        let config = Arc::new(ConfigHandle::new(Configuration {
            accounts_cache_ttl: roles_ttl,
            roles_cache_ttl: roles_ttl,
        }));
        AuthorizationEngine::new(provider, config)
    }

    #[test]
    fn role_membership_is_exact_and_case_sensitive() {
        let provider = Arc::new(TableProvider::default());
        provider.grant_role("alice", "dev", "admin");
        let engine = engine_with(provider, Duration::from_secs(60));

        assert!(engine.can_assume_role("alice", "dev", "admin").unwrap());
        assert!(!engine.can_assume_role("alice", "dev", "Admin").unwrap());
        assert!(!engine.can_assume_role("alice", "dev", "adm").unwrap());
    }

    #[test]
    fn cached_decision_survives_upstream_changes_until_ttl() {
        let provider = Arc::new(TableProvider::default());
        provider.grant_role("alice", "dev", "admin");
        let engine = engine_with(provider.clone(), Duration::from_secs(60));

        assert!(engine.can_assume_role("alice", "dev", "admin").unwrap());
        provider.set_roles("alice", "dev", vec![]);
        // Still served from cache.
        assert!(engine.can_assume_role("alice", "dev", "admin").unwrap());
        assert_eq!(provider.role_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_entry_triggers_refresh() {
        let provider = Arc::new(TableProvider::default());
        provider.grant_role("alice", "dev", "admin");
        let engine = engine_with(provider.clone(), Duration::from_millis(20));

        assert!(engine.can_assume_role("alice", "dev", "admin").unwrap());
        provider.set_roles("alice", "dev", vec![]);
        std::thread::sleep(Duration::from_millis(40));

        assert!(!engine.can_assume_role("alice", "dev", "admin").unwrap());
        assert_eq!(provider.role_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn provider_failure_fails_closed() {
        let provider = Arc::new(TableProvider::default());
        provider.grant_role("alice", "dev", "admin");
        provider.grant_account("alice", PermittedAccount::new("dev", "Development"));
        let engine = engine_with(provider.clone(), Duration::from_millis(20));

        assert!(engine.can_assume_role("alice", "dev", "admin").unwrap());
        assert_eq!(engine.allowed_accounts("alice").unwrap().len(), 1);

        std::thread::sleep(Duration::from_millis(40));
        provider.set_failing(true);

        // Expired + failing provider: no stale fallback.
        let err = engine.can_assume_role("alice", "dev", "admin").unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        let err = engine.allowed_accounts("alice").unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));

        // The failure corrupted nothing; recovery works.
        provider.set_failing(false);
        assert!(engine.can_assume_role("alice", "dev", "admin").unwrap());
    }

    #[test]
    fn accounts_and_roles_caches_are_independent() {
        let provider = Arc::new(TableProvider::default());
        provider.grant_role("alice", "dev", "admin");
        let engine = engine_with(provider.clone(), Duration::from_secs(60));

        // Role authorization works even though the accounts list is empty.
        assert!(engine.allowed_accounts("alice").unwrap().is_empty());
        assert!(engine.can_assume_role("alice", "dev", "admin").unwrap());
    }
}
