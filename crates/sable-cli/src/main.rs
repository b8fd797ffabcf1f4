//! Sable CLI - command-line interface for the Sable taint analyzer
//!
//! Finds flows from untrusted sources to dangerous sinks in JavaScript.

mod commands;
mod output;

use clap::Parser;
use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "sable",
    author,
    version,
    about = "Taint-flow static analyzer for JavaScript",
    long_about = "Sable scans JavaScript for flows from untrusted sources (like\n\
                  process.argv or request parameters) into dangerous sinks (like\n\
                  eval or child_process.exec), following assignments, calls and\n\
                  module imports along the way."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            let clean = args.run()?;
            if !clean {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Rules(args) => args.run(),
    }
}
