use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for the brokering engine.
///
/// Cache misses are not errors; they trigger a refresh. No variant here may
/// terminate the process — every caller-triggered condition surfaces as a
/// typed `Result`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("i/o error: {0}")]
    Io(String),
    #[error("malformed credentials envelope: {0}")]
    Format(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("credentials store is not ready: {0}")]
    NotReady(String),
    #[error("user-info provider error: {0}")]
    Upstream(String),
    #[error("user {user} may not assume role {role} in account {account}")]
    Forbidden {
        user: String,
        account: String,
        role: String,
    },
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    #[error("federation error: {0}")]
    Federation(String),
}

impl Error {
    /// Short stable label for audit records and structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Format(_) => "format",
            Error::Decryption(_) => "decryption",
            Error::NotReady(_) => "not-ready",
            Error::Upstream(_) => "upstream",
            Error::Forbidden { .. } => "forbidden",
            Error::UnknownAccount(_) => "unknown-account",
            Error::Federation(_) => "federation",
        }
    }
}
