use crate::audit::{AuditSink, TracingAuditSink};
use crate::authz::AuthorizationEngine;
use crate::cloud::{CloudTokenApi, FederationApi};
use crate::config::{ConfigHandle, Configuration};
use crate::crypto::envelope::EnvelopeDecryptor;
use crate::decryptor::Decryptor;
use crate::errors::{Error, Result};
use crate::minter::CredentialMinter;
use crate::store::{ReadyWatcher, SealedCredentialStore};
use crate::types::{PermittedAccount, TokenCredentials};
use std::path::PathBuf;
use std::sync::Arc;

/// Sole entry point exposed to request handlers.
///
/// One long-lived instance per process. The broker exclusively owns the
/// sealed store, both authorization caches, and the active configuration;
/// there is no process-wide shared state. Safe to share across concurrent
/// request-handling tasks.
pub struct Broker {
    config: Arc<ConfigHandle>,
    store: Arc<SealedCredentialStore>,
    authz: Arc<AuthorizationEngine>,
    minter: CredentialMinter,
    credentials_path: PathBuf,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("credentials_path", &self.credentials_path)
            .finish_non_exhaustive()
    }
}

impl Broker {
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// Read the encrypted credentials blob from the configured path.
    pub fn load_credentials_file(&self) -> Result<()> {
        self.store.load(&self.credentials_path)
    }

    /// Try to unseal the store with a newly supplied secret. Returns
    /// `true` once the store is (or already was) unsealed.
    pub fn process_new_unsealing_secret(&self, secret: &str) -> Result<bool> {
        self.store.unseal(secret)
    }

    /// Readiness signal for callers that must wait for the first unseal.
    pub fn ready(&self) -> ReadyWatcher {
        self.store.ready()
    }

    pub fn is_unsealed(&self) -> bool {
        self.store.is_unsealed()
    }

    /// Atomically swap in a new configuration. Entries already cached keep
    /// their original expiration; only subsequent inserts use the new TTLs.
    pub fn update_configuration(&self, config: Option<Configuration>) -> Result<()> {
        self.config.swap(config)
    }

    /// Snapshot of the active configuration.
    pub fn configuration(&self) -> Configuration {
        self.config.snapshot()
    }

    pub fn get_user_allowed_accounts(&self, username: &str) -> Result<Vec<PermittedAccount>> {
        self.authz.allowed_accounts(username)
    }

    pub fn is_user_allowed_to_assume_role(
        &self,
        username: &str,
        account: &str,
        role: &str,
    ) -> Result<bool> {
        self.authz.can_assume_role(username, account, role)
    }

    pub fn generate_token_credentials(
        &self,
        account: &str,
        role: &str,
        user: &str,
    ) -> Result<TokenCredentials> {
        self.minter.generate_token_credentials(account, role, user)
    }

    pub fn get_console_url_for_account_role(
        &self,
        account: &str,
        role: &str,
        user: &str,
        issuer_url: &str,
    ) -> Result<String> {
        self.minter
            .console_url_for_account_role(account, role, user, issuer_url)
    }
}

/// Builder wiring the broker's collaborators together.
///
/// The user-info provider, cloud token API, and federation API are
/// mandatory; the decryptor defaults to [`EnvelopeDecryptor`], the audit
/// sink to [`TracingAuditSink`], and the configuration to
/// [`Configuration::default`].
#[derive(Default)]
pub struct BrokerBuilder {
    credentials_path: Option<PathBuf>,
    user_info: Option<Arc<dyn crate::userinfo::UserInfoProvider>>,
    cloud: Option<Arc<dyn CloudTokenApi>>,
    federation: Option<Arc<dyn FederationApi>>,
    audit: Option<Arc<dyn AuditSink>>,
    decryptor: Option<Box<dyn Decryptor>>,
    configuration: Option<Configuration>,
}

impl BrokerBuilder {
    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn user_info<P>(mut self, provider: P) -> Self
    where
        P: crate::userinfo::UserInfoProvider + 'static,
    {
        self.user_info = Some(Arc::new(provider));
        self
    }

    pub fn cloud_api<C>(mut self, cloud: C) -> Self
    where
        C: CloudTokenApi + 'static,
    {
        self.cloud = Some(Arc::new(cloud));
        self
    }

    pub fn federation_api<F>(mut self, federation: F) -> Self
    where
        F: FederationApi + 'static,
    {
        self.federation = Some(Arc::new(federation));
        self
    }

    pub fn audit_sink<S>(mut self, sink: S) -> Self
    where
        S: AuditSink + 'static,
    {
        self.audit = Some(Arc::new(sink));
        self
    }

    pub fn decryptor<D>(mut self, decryptor: D) -> Self
    where
        D: Decryptor + 'static,
    {
        self.decryptor = Some(Box::new(decryptor));
        self
    }

    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn build(self) -> Result<Broker> {
        let credentials_path = self
            .credentials_path
            .ok_or_else(|| Error::Config("credentials file path not set".into()))?;
        let user_info = self
            .user_info
            .ok_or_else(|| Error::Config("user-info provider not set".into()))?;
        let cloud = self
            .cloud
            .ok_or_else(|| Error::Config("cloud token API not set".into()))?;
        let federation = self
            .federation
            .ok_or_else(|| Error::Config("federation API not set".into()))?;
        let audit = self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink));
        let decryptor = self
            .decryptor
            .unwrap_or_else(|| Box::new(EnvelopeDecryptor::new()));

        let config = Arc::new(ConfigHandle::new(self.configuration.unwrap_or_default()));
        let store = Arc::new(SealedCredentialStore::new(decryptor));
        let authz = Arc::new(AuthorizationEngine::new(user_info, config.clone()));
        let minter = CredentialMinter::new(
            store.clone(),
            authz.clone(),
            cloud,
            federation,
            audit,
        );

        Ok(Broker {
            config,
            store,
            authz,
            minter,
            credentials_path,
        })
    }
}
