use serde::Serialize;
use tracing::info;

/// Minting operation being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MintOperation {
    TokenCredentials,
    ConsoleUrl,
}

impl MintOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MintOperation::TokenCredentials => "token_credentials",
            MintOperation::ConsoleUrl => "console_url",
        }
    }
}

/// One issuance attempt: requester, target, and outcome.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord<'a> {
    pub requester: &'a str,
    pub account: &'a str,
    pub role: &'a str,
    pub operation: MintOperation,
    pub outcome: &'a str,
}

/// Write-only, fire-and-forget audit sink.
///
/// The engine never blocks on or reacts to the sink's outcome, so
/// implementations must not return errors or panic.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord<'_>);
}

/// Default sink emitting structured events on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord<'_>) {
        info!(
            target: "audit",
            requester = record.requester,
            account = record.account,
            role = record.role,
            operation = record.operation.as_str(),
            outcome = record.outcome,
            "credential request"
        );
    }
}
