//! LLM provider implementations for Promptgate.
//!
//! - [`openai_compat`] — the OpenAI-compatible HTTP client (chat completions,
//!   streaming, embeddings); covers OpenAI, OpenRouter, Ollama, and any
//!   custom host exposing the same wire format.
//! - [`retry`] — bounded retry with failure classification and backoff.
//! - [`sse`] — incremental Server-Sent-Event reassembly.

pub mod openai_compat;
pub mod retry;
pub mod sse;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryController, RetryPolicy};
pub use sse::{SseFrame, StreamReassembler};
