//! CLI subcommands

pub mod rules;
pub mod scan;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan JavaScript files for tainted source-to-sink flows
    Scan(scan::ScanArgs),
    /// List the active source and sink patterns
    Rules(rules::RulesArgs),
}
