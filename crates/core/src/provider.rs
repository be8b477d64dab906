//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get a response
//! back, either as a complete message or as a stream of content deltas, and
//! how to turn text into embedding vectors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ChatRequest, Message};

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated assistant message
    pub message: Message,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
///
/// Chunks are ordered; the reassembler preserves arrival order when
/// forwarding them to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn delta(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), done: false }
    }

    pub fn done() -> Self {
        Self { content: None, done: true }
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The gateway calls `complete()`
/// or `stream()` without knowing which provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<ChatResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// The receiver yields content deltas in arrival order, ends with a
    /// `done` chunk on clean completion, or an `Err` if the connection was
    /// cut off before the terminal sentinel.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single chunk followed by the terminal chunk.
    async fn stream(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let _ = tx.send(Ok(StreamChunk::delta(response.message.content))).await;
        let _ = tx.send(Ok(StreamChunk::done())).await;
        Ok(rx)
    }

    /// Generate an embedding vector for the given text.
    ///
    /// Default implementation returns an error indicating embeddings aren't
    /// supported.
    async fn embed(
        &self,
        _model: &str,
        _text: &str,
    ) -> std::result::Result<Vec<f32>, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support embeddings",
            self.name()
        )))
    }
}
