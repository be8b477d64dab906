//! Per-request gateway configuration.
//!
//! Callers attach a JSON blob in the `x-promptgate-config` header describing
//! provider routing, a retry policy, and the ordered guardrail lists. The
//! blob is parsed into strongly typed structs here, rejecting bad input
//! before any network call happens. Field names on the wire are camelCase
//! where the original clients used camelCase (`topK`, `scoreThreshold`, the
//! credentials block); snake_case spellings are accepted as aliases.

use promptgate_core::error::ConfigError;
use serde::Deserialize;

/// The type tag for the memory-retrieval guardrail.
pub const MEMORY_RETRIEVAL_TYPE: &str = "memory-retrieval";

/// Everything a caller can configure for one request.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Provider name ("openai", "openrouter", "ollama", ...)
    pub provider: String,

    /// API key for the provider
    pub api_key: String,

    /// Overrides the provider's default base URL
    #[serde(default)]
    pub custom_host: Option<String>,

    /// Retry policy for the provider call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Guardrails applied to the request before the provider call
    #[serde(default)]
    pub input_guardrails: Vec<GuardrailEntry>,

    /// Guardrails applied to the response after the provider call
    #[serde(default)]
    pub output_guardrails: Vec<GuardrailEntry>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("custom_host", &self.custom_host)
            .field("retry", &self.retry)
            .field("input_guardrails", &self.input_guardrails)
            .field("output_guardrails", &self.output_guardrails)
            .finish()
    }
}

impl GatewayConfig {
    /// Parse and validate the header value. Fails fast: a bad retry policy
    /// or a guardrail without its payload never reaches the pipeline.
    pub fn from_header(raw: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = serde_json::from_str(raw)
            .map_err(|e| ConfigError::InvalidHeader(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.attempts < 1 {
            return Err(ConfigError::InvalidRetry(format!(
                "attempts must be >= 1, got {}",
                self.retry.attempts
            )));
        }
        for entry in self.input_guardrails.iter().chain(&self.output_guardrails) {
            if entry.payload().is_none() {
                return Err(ConfigError::MissingField {
                    guardrail: entry.id.clone(),
                    field: entry.kind.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Retry policy: `attempts` counts the first try. No backoff schedule means
/// the controller's default exponential schedule applies.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default)]
    pub backoff_ms: Option<Vec<u64>>,
}

fn default_attempts() -> u32 {
    1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { attempts: default_attempts(), backoff_ms: None }
    }
}

/// One configured guardrail. The type-specific payload sits under a key
/// equal to the `type` tag:
///
/// ```json
/// { "id": "g1", "type": "memory-retrieval", "memory-retrieval": { ... } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GuardrailEntry {
    /// Caller-chosen identifier, echoed in hook results
    pub id: String,

    /// Mutator type tag
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether a failure of this guardrail aborts the request
    #[serde(default)]
    pub critical: bool,

    /// Remaining keys, including the type-keyed payload
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

impl GuardrailEntry {
    /// The opaque payload under this entry's type key, if present.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.rest.get(&self.kind)
    }

    /// Deserialize the payload into a typed config, with errors attributed
    /// to this guardrail.
    pub fn typed_payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let payload = self.payload().ok_or_else(|| ConfigError::MissingField {
            guardrail: self.id.clone(),
            field: self.kind.clone(),
        })?;
        serde_json::from_value(payload.clone()).map_err(|e| ConfigError::InvalidGuardrail {
            guardrail: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// Credentials for the retrieval path: the vector store endpoint and the
/// embedding service key.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalCredentials {
    /// Vector store base URL
    pub endpoint: String,

    /// Vector store API key; empty for unauthenticated local instances
    #[serde(default, alias = "api_key")]
    pub api_key: String,

    /// Embedding service API key
    #[serde(default, alias = "embedding_api_key")]
    pub embedding_api_key: String,
}

impl std::fmt::Debug for RetrievalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalCredentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("embedding_api_key", &"[REDACTED]")
            .finish()
    }
}

/// Typed payload for the memory-retrieval guardrail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRetrievalConfig {
    pub credentials: RetrievalCredentials,

    #[serde(alias = "positive_collection_name")]
    pub positive_collection_name: String,

    #[serde(alias = "negative_collection_name")]
    pub negative_collection_name: String,

    /// Maximum matches per collection; zero or negative short-circuits to
    /// "no matches" without contacting the store
    #[serde(default = "default_top_k", alias = "top_k")]
    pub top_k: i64,

    /// Minimum similarity score for a match to be used
    #[serde(default, alias = "score_threshold")]
    pub score_threshold: f32,

    #[serde(default = "default_true", alias = "include_positive")]
    pub include_positive: bool,

    #[serde(default = "default_true", alias = "include_negative")]
    pub include_negative: bool,

    /// Per-operation timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout: u64,
}

fn default_top_k() -> i64 {
    3
}
fn default_true() -> bool {
    true
}
fn default_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handbook_header() -> String {
        r#"{
            "provider": "openai",
            "api_key": "sk-test",
            "retry": { "attempts": 3 },
            "input_guardrails": [{
                "id": "skills-handbook-memory-retrieval",
                "type": "memory-retrieval",
                "memory-retrieval": {
                    "credentials": {
                        "endpoint": "http://localhost:6333",
                        "apiKey": "",
                        "embeddingApiKey": "sk-embed"
                    },
                    "positiveCollectionName": "skills-handbook-positive",
                    "negativeCollectionName": "skills-handbook-negative",
                    "topK": 3,
                    "scoreThreshold": 0.5,
                    "includePositive": true,
                    "includeNegative": true,
                    "timeout": 10000
                }
            }]
        }"#
        .to_string()
    }

    #[test]
    fn parses_full_header() {
        let config = GatewayConfig::from_header(&handbook_header()).unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.input_guardrails.len(), 1);

        let entry = &config.input_guardrails[0];
        assert_eq!(entry.kind, MEMORY_RETRIEVAL_TYPE);
        assert!(!entry.critical);

        let payload: MemoryRetrievalConfig = entry.typed_payload().unwrap();
        assert_eq!(payload.positive_collection_name, "skills-handbook-positive");
        assert_eq!(payload.top_k, 3);
        assert!((payload.score_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(payload.timeout, 10_000);
        assert_eq!(payload.credentials.embedding_api_key, "sk-embed");
    }

    #[test]
    fn minimal_header_gets_defaults() {
        let config =
            GatewayConfig::from_header(r#"{"provider":"openai","api_key":"sk"}"#).unwrap();
        assert_eq!(config.retry.attempts, 1);
        assert!(config.retry.backoff_ms.is_none());
        assert!(config.input_guardrails.is_empty());
        assert!(config.custom_host.is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = GatewayConfig::from_header("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader(_)));
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = GatewayConfig::from_header(
            r#"{"provider":"openai","api_key":"sk","retry":{"attempts":0}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRetry(_)));
    }

    #[test]
    fn rejects_guardrail_without_payload() {
        let err = GatewayConfig::from_header(
            r#"{"provider":"openai","api_key":"sk",
                "input_guardrails":[{"id":"g1","type":"memory-retrieval"}]}"#,
        )
        .unwrap_err();
        match err {
            ConfigError::MissingField { guardrail, field } => {
                assert_eq!(guardrail, "g1");
                assert_eq!(field, "memory-retrieval");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn payload_missing_collection_is_invalid() {
        let config = GatewayConfig::from_header(
            r#"{"provider":"openai","api_key":"sk",
                "input_guardrails":[{"id":"g1","type":"memory-retrieval",
                    "memory-retrieval":{"credentials":{"endpoint":"http://localhost:6333"}}}]}"#,
        )
        .unwrap();
        let err = config.input_guardrails[0]
            .typed_payload::<MemoryRetrievalConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGuardrail { .. }));
    }

    #[test]
    fn critical_flag_parses() {
        let config = GatewayConfig::from_header(
            r#"{"provider":"openai","api_key":"sk",
                "input_guardrails":[{"id":"g1","type":"memory-retrieval","critical":true,
                    "memory-retrieval":{}}]}"#,
        )
        .unwrap();
        assert!(config.input_guardrails[0].critical);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = GatewayConfig::from_header(&handbook_header()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-test"));
        assert!(!debug.contains("sk-embed"));
        assert!(debug.contains("[REDACTED]"));
    }
}
