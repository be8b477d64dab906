//! Retrieval-augmented prompt injection for Promptgate.
//!
//! The memory-retrieval mutator embeds the latest user query, runs
//! similarity searches against a positive and a negative example collection
//! in Qdrant, and splices the surviving matches into the conversation's
//! system message. The seeding path reuses the same clients to populate the
//! collections with the built-in handbook memories.

pub mod embedding;
pub mod handbook;
pub mod qdrant;
pub mod seed;

use async_trait::async_trait;
use promptgate_core::error::MutatorError;
use serde::{Deserialize, Serialize};

pub use embedding::OpenAiEmbedder;
pub use handbook::{memory_retrieval_constructor, MemoryRetrievalMutator};
pub use qdrant::QdrantClient;

/// Payload stored alongside each memory vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPayload {
    /// The memory text injected into prompts
    #[serde(default)]
    pub text: String,

    /// Tool category tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    /// Why this memory matters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// One ranked similarity match. Produced fresh per query, discarded after
/// formatting.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredPoint {
    /// Point id (Qdrant allows integers or UUID strings)
    pub id: serde_json::Value,

    /// Similarity score; cosine in [-1, 1]
    pub score: f32,

    /// The stored memory
    #[serde(default = "empty_payload")]
    pub payload: MemoryPayload,
}

fn empty_payload() -> MemoryPayload {
    MemoryPayload { text: String::new(), tool: None, reasoning: None }
}

/// Similarity search against a named collection.
///
/// Implemented by [`QdrantClient`]; tests inject fakes. Implementations are
/// safe for concurrent use by multiple in-flight requests.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Top `limit` matches for `vector`, ranked by descending score.
    /// A collection that does not exist is an error, distinct from a
    /// collection with no matches.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, MutatorError>;
}

/// Turns text into a fixed-length embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MutatorError>;
}
