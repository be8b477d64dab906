//! Mutator trait — a configured pipeline step that inspects and optionally
//! rewrites a request or response.
//!
//! New mutator kinds implement this trait and register a constructor with
//! the pipeline's registry; the pipeline itself never changes.

use async_trait::async_trait;

use crate::error::MutatorError;
use crate::hook::HookCheck;
use crate::message::{ChatRequest, Message};

/// Per-request state handed to mutators.
///
/// Input-side mutators rewrite `request`; output-side mutators see the
/// provider's `response` as well. Created at request entry, dropped at
/// response completion.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The chat request being built
    pub request: ChatRequest,

    /// The provider's answer; `None` until the provider call has happened
    pub response: Option<Message>,
}

impl RequestContext {
    pub fn new(request: ChatRequest) -> Self {
        Self { request, response: None }
    }
}

/// A pipeline step that can rewrite the request (or response) in place.
#[async_trait]
pub trait Mutator: Send + Sync {
    /// The guardrail id from the caller's config.
    fn id(&self) -> &str;

    /// Whether a failure of this mutator aborts the whole request.
    ///
    /// Defaults to false: failures are downgraded to a failed check entry
    /// and the request proceeds untouched (fail-open).
    fn critical(&self) -> bool {
        false
    }

    /// Inspect and optionally rewrite the context, reporting what happened.
    async fn apply(&self, ctx: &mut RequestContext) -> Result<HookCheck, MutatorError>;
}

impl std::fmt::Debug for dyn Mutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutator").field("id", &self.id()).finish()
    }
}
