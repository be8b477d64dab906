//! Mutation pipeline — parses the per-request guardrail config into an
//! ordered list of mutator instances and runs them against the request.
//!
//! The pipeline is deliberately dumb about mutator internals: each kind
//! registers a constructor under its type tag, and the pipeline builds,
//! orders, and runs the boxed trait objects. Failure policy is fail-open by
//! default — a broken vector store degrades the request instead of blocking
//! traffic — unless the caller marks a guardrail `critical`.

pub mod registry;

use promptgate_config::GatewayConfig;
use promptgate_core::error::{ConfigError, MutatorError};
use promptgate_core::hook::{HookCheck, HookResult, HookResults};
use promptgate_core::mutator::{Mutator, RequestContext};
use tracing::{debug, warn};

pub use registry::MutatorRegistry;

/// The ordered mutators for one request, built eagerly from the caller's
/// config. Construction fails fast: an unknown type tag or bad payload is
/// rejected before any network call.
#[derive(Debug)]
pub struct MutationPipeline {
    input: Vec<Box<dyn Mutator>>,
    output: Vec<Box<dyn Mutator>>,
}

impl MutationPipeline {
    /// Build input and output mutator lists in declaration order.
    pub fn build(
        registry: &MutatorRegistry,
        config: &GatewayConfig,
    ) -> Result<Self, ConfigError> {
        let input = config
            .input_guardrails
            .iter()
            .map(|entry| registry.build(entry))
            .collect::<Result<Vec<_>, _>>()?;
        let output = config
            .output_guardrails
            .iter()
            .map(|entry| registry.build(entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { input, output })
    }

    /// Run the input-side mutators, strictly in order: mutator n+1 sees the
    /// output of mutator n. Returns one hook result per mutator, whether or
    /// not it transformed anything.
    pub async fn run_input(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Vec<HookResult>, MutatorError> {
        Self::run(&self.input, ctx).await
    }

    /// Run the output-side mutators against the provider's response.
    pub async fn run_output(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Vec<HookResult>, MutatorError> {
        Self::run(&self.output, ctx).await
    }

    pub fn has_output_mutators(&self) -> bool {
        !self.output.is_empty()
    }

    async fn run(
        mutators: &[Box<dyn Mutator>],
        ctx: &mut RequestContext,
    ) -> Result<Vec<HookResult>, MutatorError> {
        let mut results = Vec::with_capacity(mutators.len());

        for mutator in mutators {
            match mutator.apply(ctx).await {
                Ok(check) => {
                    debug!(
                        mutator = mutator.id(),
                        transformed = check.transformed,
                        "Mutator applied"
                    );
                    results.push(HookResult::new(mutator.id(), check));
                }
                Err(e) if mutator.critical() => {
                    return Err(MutatorError::Critical {
                        id: mutator.id().to_string(),
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    // Fail-open: log the failure as a check entry and
                    // proceed with the untouched request.
                    warn!(mutator = mutator.id(), error = %e, "Mutator failed, continuing");
                    results.push(HookResult::new(
                        mutator.id(),
                        HookCheck::failed(mutator.id(), e.kind(), e.to_string()),
                    ));
                }
            }
        }

        Ok(results)
    }
}

/// Convenience aggregation of both sides into the response metadata shape.
pub fn aggregate(before: Vec<HookResult>, after: Vec<HookResult>) -> HookResults {
    HookResults { before_request_hooks: before, after_request_hooks: after }
}
