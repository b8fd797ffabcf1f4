//! sable-core: taint-flow analysis for JavaScript
//!
//! Parses a file with SWC, walks the AST with a scope-aware symbolic
//! interpreter, and reports flows from configured source expressions to
//! configured sink calls. The CLI in `sable-cli` is a thin shell over
//! [`AnalysisSession`].

pub mod analysis;
pub mod config;
pub mod engine;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod rules;

pub use analysis::{AnalysisOptions, AnalysisResult, AnalysisSession};
pub use config::{
    Config, ConfigError, find_config_file, load_config, load_config_or_default,
    load_config_or_default_with_warnings,
};
pub use engine::{EngineError, NodeEvent};
pub use parser::{Language, ParseError, ParsedFile, Parser, detect_language};
pub use report::{ChainEntry, ChainKind, Position, Report, SinkRef, SourceRef};
pub use rules::{RuleSet, SinkRule, SourceRule};
