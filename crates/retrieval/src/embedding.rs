//! Embedding client for the retrieval path.
//!
//! Talks to an OpenAI-compatible `/embeddings` endpoint. The handbook
//! collections are seeded with `text-embedding-3-small` (1536 dimensions),
//! so queries use the same model by default.

use async_trait::async_trait;
use promptgate_core::error::MutatorError;
use serde::Deserialize;
use tracing::debug;

use crate::Embedder;

/// The embedding model the handbook collections were seeded with.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Dimensionality of [`DEFAULT_EMBEDDING_MODEL`] vectors.
pub const EMBEDDING_DIM: u64 = 1536;

/// OpenAI embeddings client.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(http: reqwest::Client, api_key: &str) -> Self {
        Self {
            http,
            base_url: "https://api.openai.com/v1".into(),
            api_key: api_key.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
        }
    }

    /// Point at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MutatorError> {
        debug!(model = %self.model, chars = text.len(), "Embedding query text");

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "encoding_format": "float",
        });

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MutatorError::Timeout(format!("embedding: {e}"))
                } else {
                    MutatorError::Embedding(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MutatorError::Embedding(format!("{status}: {message}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| MutatorError::Embedding(format!("bad response: {e}")))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| MutatorError::Embedding("no embedding in response".into()))
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embedding_response() {
        let data = r#"{
            "data": [{"embedding": [0.1, -0.2, 0.3], "index": 0}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 6, "total_tokens": 6}
        }"#;
        let parsed: EmbeddingResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let embedder = OpenAiEmbedder::new(reqwest::Client::new(), "sk")
            .with_base_url("http://localhost:8108/v1/");
        assert_eq!(embedder.base_url, "http://localhost:8108/v1");
    }
}
