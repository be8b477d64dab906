//! # Promptgate Core
//!
//! Domain types, traits, and error definitions for the Promptgate LLM gateway.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Registering new mutator kinds without touching the pipeline
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod hook;
pub mod message;
pub mod mutator;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{ConfigError, Error, MutatorError, ProviderError, Result};
pub use hook::{HookCheck, HookResult, HookResults};
pub use message::{ChatRequest, Message, Role};
pub use mutator::{Mutator, RequestContext};
pub use provider::{ChatResponse, Provider, StreamChunk, Usage};
