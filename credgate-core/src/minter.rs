use crate::audit::{AuditRecord, AuditSink, MintOperation};
use crate::authz::AuthorizationEngine;
use crate::cloud::{CloudTokenApi, FederationApi};
use crate::errors::{Error, Result};
use crate::store::SealedCredentialStore;
use crate::types::TokenCredentials;
use std::sync::Arc;

/// Gates credential issuance on store readiness and role authorization.
///
/// Preconditions are checked in a fixed order: the store must be unsealed,
/// the user must hold the role, and the account must resolve to a stored
/// profile. Every call, success or denial, produces an audit record.
pub struct CredentialMinter {
    store: Arc<SealedCredentialStore>,
    authz: Arc<AuthorizationEngine>,
    cloud: Arc<dyn CloudTokenApi>,
    federation: Arc<dyn FederationApi>,
    audit: Arc<dyn AuditSink>,
}

impl CredentialMinter {
    pub fn new(
        store: Arc<SealedCredentialStore>,
        authz: Arc<AuthorizationEngine>,
        cloud: Arc<dyn CloudTokenApi>,
        federation: Arc<dyn FederationApi>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            authz,
            cloud,
            federation,
            audit,
        }
    }

    /// Mint ephemeral credentials for `user` assuming `role` in `account`.
    pub fn generate_token_credentials(
        &self,
        account: &str,
        role: &str,
        user: &str,
    ) -> Result<TokenCredentials> {
        let result = self.mint(account, role, user);
        self.emit(MintOperation::TokenCredentials, account, role, user, &result);
        result
    }

    /// Mint credentials and exchange them for a federated console URL
    /// scoped to `issuer_url` as the redirect target.
    pub fn console_url_for_account_role(
        &self,
        account: &str,
        role: &str,
        user: &str,
        issuer_url: &str,
    ) -> Result<String> {
        let result = (|| {
            let credentials = self.mint(account, role, user)?;
            let token = self.federation.signin_token(&credentials)?;
            self.federation.console_url(&token, issuer_url)
        })();
        self.emit(MintOperation::ConsoleUrl, account, role, user, &result);
        result
    }

    fn mint(&self, account: &str, role: &str, user: &str) -> Result<TokenCredentials> {
        if !self.store.is_unsealed() {
            return Err(Error::NotReady("credentials store is sealed".into()));
        }
        if !self.authz.can_assume_role(user, account, role)? {
            return Err(Error::Forbidden {
                user: user.to_string(),
                account: account.to_string(),
                role: role.to_string(),
            });
        }
        let profile = self.store.profile_for(account)?;
        self.cloud.assume_role(&profile, account, role)
    }

    fn emit<T>(
        &self,
        operation: MintOperation,
        account: &str,
        role: &str,
        user: &str,
        result: &Result<T>,
    ) {
        let outcome = match result {
            Ok(_) => "issued",
            Err(err) => err.label(),
        };
        self.audit.record(&AuditRecord {
            requester: user,
            account,
            role,
            operation,
            outcome,
        });
    }
}
