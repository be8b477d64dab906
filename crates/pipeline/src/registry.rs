//! Mutator registry — maps a config type tag to a constructor.
//!
//! New mutator kinds register here without modifying the pipeline. The
//! constructor receives the full guardrail entry so it can pull its typed
//! payload and the caller-chosen id.

use promptgate_config::GuardrailEntry;
use promptgate_core::error::ConfigError;
use promptgate_core::mutator::Mutator;
use std::collections::HashMap;

type Constructor =
    Box<dyn Fn(&GuardrailEntry) -> Result<Box<dyn Mutator>, ConfigError> + Send + Sync>;

/// Registry of mutator constructors keyed by type tag.
#[derive(Default)]
pub struct MutatorRegistry {
    constructors: HashMap<String, Constructor>,
}

impl MutatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a mutator type. Replaces any previous
    /// registration for the same tag.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&GuardrailEntry) -> Result<Box<dyn Mutator>, ConfigError> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.into(), Box::new(constructor));
    }

    /// Construct a mutator for the entry; unknown type tags are rejected.
    pub fn build(&self, entry: &GuardrailEntry) -> Result<Box<dyn Mutator>, ConfigError> {
        let constructor = self
            .constructors
            .get(&entry.kind)
            .ok_or_else(|| ConfigError::UnknownMutator(entry.kind.clone()))?;
        constructor(entry)
    }

    /// The registered type tags, for diagnostics.
    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}
