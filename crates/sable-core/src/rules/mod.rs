//! Source, sink and callback rule registries
//!
//! Rules are ordered regex patterns over canonical expression names,
//! extended before an analysis run and immutable during it.

pub mod callbacks;
pub mod sinks;
pub mod sources;

pub use callbacks::{ArgSlot, CallSite, CallbackHandler, CallbackRule, CallbacksRegistry};
pub use sinks::{SinkRule, SinksRegistry};
pub use sources::{SourceRule, SourcesRegistry};

/// The complete rule configuration for one analysis run.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub sources: SourcesRegistry,
    pub sinks: SinksRegistry,
    pub callbacks: CallbacksRegistry,
}

impl RuleSet {
    pub fn with_defaults() -> Self {
        Self {
            sources: SourcesRegistry::with_defaults(),
            sinks: SinksRegistry::with_defaults(),
            callbacks: CallbacksRegistry::with_defaults(),
        }
    }

    pub fn empty() -> Self {
        Self {
            sources: SourcesRegistry::new(),
            sinks: SinksRegistry::new(),
            callbacks: CallbacksRegistry::new(),
        }
    }

    /// Appends user patterns onto the defaults. Invalid regexes are
    /// returned as warnings rather than failing the run.
    pub fn extend_patterns(&mut self, sources: &[String], sinks: &[String]) -> Vec<String> {
        let mut warnings = Vec::new();

        for pattern in sources {
            if let Err(e) = self.sources.register_pattern(pattern) {
                warnings.push(format!("invalid source pattern '{pattern}': {e}"));
            }
        }
        for pattern in sinks {
            if let Err(e) = self.sinks.register_pattern(pattern) {
                warnings.push(format!("invalid sink pattern '{pattern}': {e}"));
            }
        }

        warnings
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}
