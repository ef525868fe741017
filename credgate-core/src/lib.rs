//! Brokering engine for short-lived cloud account credentials.
//!
//! Issuance is gated twice: per-user role authorization (memoized in
//! TTL-bounded caches) and possession of a shared secret that unseals an
//! encrypted credentials store. Front ends, configuration file parsing,
//! and concrete cloud API clients are external collaborators behind the
//! traits defined here; [`Broker`] composes everything and is the only
//! entry point request handlers see.

pub mod audit;
pub mod authz;
pub mod broker;
pub mod cache;
pub mod cloud;
pub mod config;
pub mod crypto;
pub mod decryptor;
pub mod errors;
pub mod minter;
pub mod store;
pub mod types;
pub mod userinfo;

pub use audit::{AuditRecord, AuditSink, MintOperation, TracingAuditSink};
pub use authz::AuthorizationEngine;
pub use broker::{Broker, BrokerBuilder};
pub use cache::{PermissionCache, RoleKey};
pub use cloud::{CloudTokenApi, FederationApi};
pub use config::{ConfigHandle, Configuration};
pub use crypto::envelope::EnvelopeDecryptor;
pub use decryptor::Decryptor;
pub use errors::{Error, Result};
pub use minter::CredentialMinter;
pub use store::{ReadyWatcher, SealedCredentialStore, UnsealState};
pub use types::{PermittedAccount, ProfileEntry, TokenCredentials};
pub use userinfo::UserInfoProvider;
