//! Error types for the Promptgate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; every variant carries enough
//! detail for a caller to tell a configuration mistake from a transient
//! infrastructure failure.

use thiserror::Error;

/// The top-level error type for all Promptgate operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Per-request configuration errors ---
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    // --- Mutator / guardrail errors ---
    #[error("Mutator error: {0}")]
    Mutator(#[from] MutatorError),

    // --- Upstream provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Rejections raised while parsing the per-request gateway configuration.
/// Always fatal: the request is refused before any network call.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Unknown mutator type: {0}")]
    UnknownMutator(String),

    #[error("Guardrail '{guardrail}' is missing required field: {field}")]
    MissingField { guardrail: String, field: String },

    #[error("Guardrail '{guardrail}' has invalid configuration: {reason}")]
    InvalidGuardrail { guardrail: String, reason: String },

    #[error("Invalid config header: {0}")]
    InvalidHeader(String),

    #[error("Invalid retry policy: {0}")]
    InvalidRetry(String),
}

/// Failures raised by a mutator while rewriting a request.
///
/// Retrieval-path failures (embedding, vector store, timeout) are fail-open
/// by default: the pipeline downgrades them to a failed check entry unless
/// the mutator is marked critical.
#[derive(Debug, Clone, Error)]
pub enum MutatorError {
    #[error("Unusable request: {0}")]
    Input(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store query failed: {0}")]
    VectorStore(String),

    #[error("Mutator timed out: {0}")]
    Timeout(String),

    #[error("Critical mutator '{id}' failed: {source}")]
    Critical {
        id: String,
        #[source]
        source: Box<MutatorError>,
    },
}

impl MutatorError {
    /// A short machine-readable kind, recorded in failed check entries.
    pub fn kind(&self) -> &'static str {
        match self {
            MutatorError::Input(_) => "input",
            MutatorError::Embedding(_) => "embedding",
            MutatorError::VectorStore(_) => "vector_store",
            MutatorError::Timeout(_) => "timeout",
            MutatorError::Critical { .. } => "critical",
        }
    }
}

/// Failures from the upstream LLM provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream cut off before completion: {0}")]
    Stream(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether a retry controller should attempt the call again.
    ///
    /// Network failures, timeouts, rate limits, and 5xx responses are
    /// transient; 4xx responses and auth failures will not improve on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_)
            | ProviderError::Timeout(_)
            | ProviderError::RateLimited { .. } => true,
            ProviderError::Api { status_code, .. } => *status_code >= 500,
            ProviderError::Auth(_)
            | ProviderError::Stream(_)
            | ProviderError::NotConfigured(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::Api {
            status_code: 502,
            message: "Bad Gateway".into(),
        });
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn config_error_displays_correctly() {
        let err = Error::Config(ConfigError::MissingField {
            guardrail: "skills-handbook".into(),
            field: "positive_collection_name".into(),
        });
        assert!(err.to_string().contains("skills-handbook"));
        assert!(err.to_string().contains("positive_collection_name"));
    }

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::Network("conn refused".into()).is_retryable());
        assert!(ProviderError::Timeout("30s".into()).is_retryable());
        assert!(ProviderError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(
            ProviderError::Api { status_code: 503, message: "unavailable".into() }.is_retryable()
        );

        assert!(
            !ProviderError::Api { status_code: 400, message: "bad request".into() }.is_retryable()
        );
        assert!(!ProviderError::Auth("bad key".into()).is_retryable());
        assert!(!ProviderError::Stream("cut off".into()).is_retryable());
    }

    #[test]
    fn mutator_error_kinds() {
        assert_eq!(MutatorError::Input("no user message".into()).kind(), "input");
        assert_eq!(MutatorError::VectorStore("404".into()).kind(), "vector_store");
        let critical = MutatorError::Critical {
            id: "guard-1".into(),
            source: Box::new(MutatorError::Timeout("10s".into())),
        };
        assert_eq!(critical.kind(), "critical");
        assert!(critical.to_string().contains("guard-1"));
    }
}
