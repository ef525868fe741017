use crate::errors::Result;
use crate::types::{ProfileEntry, TokenCredentials};

/// Cloud role-assumption capability.
///
/// The concrete client (an STS-style API) is an external collaborator;
/// failures surface as typed errors and are never retried by the engine.
pub trait CloudTokenApi: Send + Sync {
    /// Assume `role` in `account` using the long-lived `profile` and return
    /// ephemeral credentials.
    fn assume_role(
        &self,
        profile: &ProfileEntry,
        account: &str,
        role: &str,
    ) -> Result<TokenCredentials>;
}

/// Console federation capability.
///
/// Exchanges minted temporary credentials for a federated sign-in URL.
/// Failures should surface as [`crate::Error::Federation`].
pub trait FederationApi: Send + Sync {
    /// Exchange temporary credentials for a sign-in token.
    fn signin_token(&self, credentials: &TokenCredentials) -> Result<String>;

    /// Build the console URL with `issuer_url` as the redirect target.
    fn console_url(&self, signin_token: &str, issuer_url: &str) -> Result<String>;
}
