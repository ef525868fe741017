use crate::errors::Result;
use crate::types::PermittedAccount;

/// Source of truth for what a user may see and assume.
///
/// Implementations live outside the engine (LDAP, IdP, a directory
/// service). Failures should surface as [`crate::Error::Upstream`];
/// timeout and retry policy belongs to the implementation, never the
/// engine.
pub trait UserInfoProvider: Send + Sync {
    /// Accounts the user is permitted to see. A coarse, display-oriented
    /// visibility list; not a prerequisite for role authorization.
    fn accounts_for_user(&self, username: &str) -> Result<Vec<PermittedAccount>>;

    /// Roles the user holds within one account.
    fn roles_for_user_in_account(&self, username: &str, account: &str) -> Result<Vec<String>>;
}
