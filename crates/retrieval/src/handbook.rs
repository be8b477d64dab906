//! The memory-retrieval mutator.
//!
//! Embeds the latest user query, searches the positive and negative example
//! collections concurrently, filters by score threshold, and injects the
//! survivors into the system message as `<positive_examples>` /
//! `<negative_examples>` blocks. Rendering is deterministic: the same query
//! against an unchanged corpus produces byte-identical blocks.

use async_trait::async_trait;
use promptgate_config::{GuardrailEntry, MemoryRetrievalConfig, MEMORY_RETRIEVAL_TYPE};
use promptgate_core::error::{ConfigError, MutatorError};
use promptgate_core::hook::HookCheck;
use promptgate_core::mutator::{Mutator, RequestContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{Embedder, OpenAiEmbedder, QdrantClient, ScoredPoint, VectorSearch};

/// Retrieval-augmented prompt injection, driven by the caller's guardrail
/// payload.
pub struct MemoryRetrievalMutator {
    id: String,
    critical: bool,
    config: MemoryRetrievalConfig,
    store: Arc<dyn VectorSearch>,
    embedder: Arc<dyn Embedder>,
}

impl MemoryRetrievalMutator {
    pub fn new(
        id: impl Into<String>,
        critical: bool,
        config: MemoryRetrievalConfig,
        store: Arc<dyn VectorSearch>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self { id: id.into(), critical, config, store, embedder }
    }

    /// Query one collection unless its side is disabled. `top_k <= 0` never
    /// reaches here; the caller short-circuits first.
    async fn query_side(
        &self,
        enabled: bool,
        collection: &str,
        vector: &[f32],
    ) -> Result<Vec<ScoredPoint>, MutatorError> {
        if !enabled {
            return Ok(Vec::new());
        }
        let matches = self
            .store
            .query(collection, vector, self.config.top_k as u64)
            .await?;
        // Store returns pre-sorted by descending score; keep order stable.
        // A point without memory text has nothing to inject and is dropped.
        Ok(matches
            .into_iter()
            .filter(|m| m.score >= self.config.score_threshold && !m.payload.text.is_empty())
            .collect())
    }
}

#[async_trait]
impl Mutator for MemoryRetrievalMutator {
    fn id(&self) -> &str {
        &self.id
    }

    fn critical(&self) -> bool {
        self.critical
    }

    async fn apply(&self, ctx: &mut RequestContext) -> Result<HookCheck, MutatorError> {
        let query = ctx
            .request
            .last_user_content()
            .ok_or_else(|| MutatorError::Input("no user message to build a query from".into()))?
            .to_string();

        // Nothing to retrieve: neither side included, or a non-positive
        // top-K. Neither the embedder nor the store is contacted.
        if (!self.config.include_positive && !self.config.include_negative)
            || self.config.top_k <= 0
        {
            return Ok(untransformed_check(&self.config, 0, 0));
        }

        let timeout = Duration::from_millis(self.config.timeout);

        let vector = tokio::time::timeout(timeout, self.embedder.embed(&query))
            .await
            .map_err(|_| {
                MutatorError::Timeout(format!("embedding exceeded {}ms", self.config.timeout))
            })??;

        // Independent reads: run both collection queries concurrently
        let (positive, negative) = tokio::time::timeout(timeout, async {
            tokio::try_join!(
                self.query_side(
                    self.config.include_positive,
                    &self.config.positive_collection_name,
                    &vector,
                ),
                self.query_side(
                    self.config.include_negative,
                    &self.config.negative_collection_name,
                    &vector,
                ),
            )
        })
        .await
        .map_err(|_| {
            MutatorError::Timeout(format!("vector query exceeded {}ms", self.config.timeout))
        })??;

        debug!(
            mutator = %self.id,
            positive = positive.len(),
            negative = negative.len(),
            "Memory retrieval complete"
        );

        if positive.is_empty() && negative.is_empty() {
            return Ok(untransformed_check(&self.config, 0, 0));
        }

        let mut blocks = Vec::new();
        if !positive.is_empty() {
            blocks.push(render_block("positive_examples", &positive));
        }
        if !negative.is_empty() {
            blocks.push(render_block("negative_examples", &negative));
        }
        ctx.request.inject_into_system(&blocks.join("\n\n"));

        Ok(HookCheck::new(
            MEMORY_RETRIEVAL_TYPE,
            serde_json::json!({
                "positive": side_data(&self.config.positive_collection_name, &positive),
                "negative": side_data(&self.config.negative_collection_name, &negative),
            }),
            true,
        ))
    }
}

fn untransformed_check(
    config: &MemoryRetrievalConfig,
    positive: usize,
    negative: usize,
) -> HookCheck {
    HookCheck::new(
        MEMORY_RETRIEVAL_TYPE,
        serde_json::json!({
            "positive": { "collection": config.positive_collection_name, "matches": positive },
            "negative": { "collection": config.negative_collection_name, "matches": negative },
        }),
        false,
    )
}

fn side_data(collection: &str, matches: &[ScoredPoint]) -> serde_json::Value {
    serde_json::json!({
        "collection": collection,
        "matches": matches
            .iter()
            .map(|m| serde_json::json!({ "id": m.id, "score": m.score }))
            .collect::<Vec<_>>(),
    })
}

/// Render one examples block. Each entry is its memory text plus the stored
/// reasoning, when present.
fn render_block(tag: &str, matches: &[ScoredPoint]) -> String {
    let mut out = format!("<{tag}>\n");
    for m in matches {
        out.push_str("- ");
        out.push_str(&m.payload.text);
        out.push('\n');
        if let Some(reasoning) = &m.payload.reasoning {
            out.push_str("  Reasoning: ");
            out.push_str(reasoning);
            out.push('\n');
        }
    }
    out.push_str(&format!("</{tag}>"));
    out
}

/// Registry constructor for the `memory-retrieval` type tag. The shared
/// `reqwest::Client` carries the connection pool; endpoint and keys come
/// from each request's credentials.
pub fn memory_retrieval_constructor(
    http: reqwest::Client,
) -> impl Fn(&GuardrailEntry) -> Result<Box<dyn Mutator>, ConfigError> + Send + Sync + 'static {
    move |entry| {
        let config: MemoryRetrievalConfig = entry.typed_payload()?;
        let store = Arc::new(QdrantClient::new(
            http.clone(),
            &config.credentials.endpoint,
            &config.credentials.api_key,
        ));
        let embedder =
            Arc::new(OpenAiEmbedder::new(http.clone(), &config.credentials.embedding_api_key));
        Ok(Box::new(MemoryRetrievalMutator::new(
            entry.id.clone(),
            entry.critical,
            config,
            store,
            embedder,
        )) as Box<dyn Mutator>)
    }
}
