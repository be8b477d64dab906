//! Hook result types — the observability record every mutator leaves behind.
//!
//! Each configured guardrail reports one `HookResult` per request, whether or
//! not it changed anything. The aggregate is attached to the final response
//! so callers can audit which mutators fired; nothing is persisted beyond
//! the request lifecycle.

use serde::{Deserialize, Serialize};

/// One check performed by a mutator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookCheck {
    /// Check identifier (usually the mutator type tag)
    pub id: String,

    /// Arbitrary structured data describing what the check saw or did
    pub data: serde_json::Value,

    /// Whether this check altered the request
    pub transformed: bool,

    /// Error description when the check failed fail-open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookCheck {
    /// A check that ran and may or may not have rewritten the request.
    pub fn new(id: impl Into<String>, data: serde_json::Value, transformed: bool) -> Self {
        Self { id: id.into(), data, transformed, error: None }
    }

    /// A failed check recorded for a fail-open mutator error.
    pub fn failed(id: impl Into<String>, kind: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: serde_json::json!({ "error_kind": kind }),
            transformed: false,
            error: Some(message.into()),
        }
    }
}

/// The outcome of one configured guardrail for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookResult {
    /// The guardrail id from the caller's config
    pub id: String,

    /// Checks performed, in execution order
    pub checks: Vec<HookCheck>,
}

impl HookResult {
    pub fn new(id: impl Into<String>, check: HookCheck) -> Self {
        Self { id: id.into(), checks: vec![check] }
    }

    /// Whether any check in this result transformed the request.
    pub fn transformed(&self) -> bool {
        self.checks.iter().any(|c| c.transformed)
    }
}

/// Aggregated hook results for one request, split by pipeline side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookResults {
    /// Input-side guardrails, in execution order
    #[serde(default)]
    pub before_request_hooks: Vec<HookResult>,

    /// Output-side guardrails, in execution order
    #[serde(default)]
    pub after_request_hooks: Vec<HookResult>,
}

impl HookResults {
    pub fn is_empty(&self) -> bool {
        self.before_request_hooks.is_empty() && self.after_request_hooks.is_empty()
    }
}
