//! Configuration loading, validation, and management for Promptgate.
//!
//! Two configuration surfaces live here:
//! - [`ServerConfig`] — the long-lived server settings, loaded from
//!   `promptgate.toml` with environment variable overrides.
//! - [`GatewayConfig`] — the per-request configuration a caller attaches in
//!   the `x-promptgate-config` header: provider routing, retry policy, and
//!   the ordered guardrail lists. Parsed and validated eagerly, before any
//!   network call.

pub mod request;
pub mod server;

pub use request::{
    GatewayConfig, GuardrailEntry, MemoryRetrievalConfig, RetrievalCredentials, RetryConfig,
    MEMORY_RETRIEVAL_TYPE,
};
pub use server::ServerConfig;
