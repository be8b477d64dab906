//! Minimal Qdrant REST client.
//!
//! Covers the three operations the gateway needs: ranked similarity query,
//! point upsert, and delete-and-recreate of a collection with a declared
//! dimensionality and distance metric. The HTTP connection pool is shared
//! (a cloned `reqwest::Client`); endpoint and key are per-instance.

use async_trait::async_trait;
use promptgate_core::error::MutatorError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ScoredPoint, VectorSearch};

/// A point to upsert: id, vector, and free-form payload.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// Client for one Qdrant instance.
#[derive(Clone)]
pub struct QdrantClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantClient {
    /// `api_key` empty means an unauthenticated local instance.
    pub fn new(http: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: endpoint.trim_end_matches('/').to_string(),
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }
        req
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<reqwest::Response, MutatorError> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                MutatorError::Timeout(format!("{context}: {e}"))
            } else {
                MutatorError::VectorStore(format!("{context}: {e}"))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MutatorError::VectorStore(format!("{context}: collection not found")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MutatorError::VectorStore(format!("{context}: {status} {body}")));
        }
        Ok(response)
    }

    /// Upsert points into a collection, waiting for the write to land.
    pub async fn upsert(
        &self,
        collection: &str,
        points: &[UpsertPoint],
    ) -> Result<(), MutatorError> {
        debug!(collection, count = points.len(), "Upserting points");
        let body = serde_json::json!({ "points": points });
        self.send(
            self.request(
                reqwest::Method::PUT,
                &format!("/collections/{collection}/points?wait=true"),
            )
            .json(&body),
            "upsert",
        )
        .await?;
        Ok(())
    }

    /// Delete the collection if it exists, then create it fresh with the
    /// given vector size and cosine distance.
    pub async fn recreate(&self, collection: &str, vector_size: u64) -> Result<(), MutatorError> {
        // Delete failures for a missing collection are fine
        let _ = self
            .request(reqwest::Method::DELETE, &format!("/collections/{collection}"))
            .send()
            .await;

        debug!(collection, vector_size, "Creating collection");
        let body = serde_json::json!({
            "vectors": { "size": vector_size, "distance": "Cosine" }
        });
        self.send(
            self.request(reqwest::Method::PUT, &format!("/collections/{collection}")).json(&body),
            "create collection",
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VectorSearch for QdrantClient {
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, MutatorError> {
        debug!(collection, limit, "Similarity query");
        let body = serde_json::json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    &format!("/collections/{collection}/points/query"),
                )
                .json(&body),
                "query",
            )
            .await?;

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| MutatorError::VectorStore(format!("query: bad response: {e}")))?;
        Ok(parsed.result.points)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<ScoredPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_response() {
        let data = r#"{
            "result": {
                "points": [
                    {"id": 1, "score": 0.83,
                     "payload": {"text": "Use pagination", "tool": "search",
                                 "reasoning": "Improves performance"}},
                    {"id": "9c5f", "score": 0.51, "payload": {"text": "Set timeouts"}}
                ]
            },
            "status": "ok",
            "time": 0.002
        }"#;
        let parsed: QueryResponse = serde_json::from_str(data).unwrap();
        let points = parsed.result.points;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].payload.text, "Use pagination");
        assert_eq!(points[0].payload.reasoning.as_deref(), Some("Improves performance"));
        assert!((points[0].score - 0.83).abs() < 1e-6);
        // String ids parse too
        assert_eq!(points[1].id, serde_json::json!("9c5f"));
        assert!(points[1].payload.tool.is_none());
    }

    #[test]
    fn empty_result_is_no_matches_not_error() {
        let parsed: QueryResponse =
            serde_json::from_str(r#"{"result": {"points": []}}"#).unwrap();
        assert!(parsed.result.points.is_empty());
    }

    #[test]
    fn api_key_header_only_when_nonempty() {
        let with_key = QdrantClient::new(reqwest::Client::new(), "http://localhost:6333/", "k");
        assert_eq!(with_key.base_url, "http://localhost:6333");
        assert!(with_key.api_key.is_some());

        let without = QdrantClient::new(reqwest::Client::new(), "http://localhost:6333", "");
        assert!(without.api_key.is_none());
    }

    #[test]
    fn upsert_point_serializes_flat() {
        let point = UpsertPoint {
            id: 1,
            vector: vec![0.1, 0.2],
            payload: serde_json::json!({"text": "t", "tool": "api", "reasoning": "r"}),
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["payload"]["tool"], "api");
    }
}
