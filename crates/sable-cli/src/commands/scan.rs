//! Scan command - runs the taint analysis over files or directories

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use rayon::prelude::*;
use walkdir::WalkDir;

use sable_core::{AnalysisSession, load_config_or_default_with_warnings};

use crate::output::json;
use crate::output::pretty::PrettyFormatter;
use crate::output::FileReport;

const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx"];
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Path to file or directory to scan
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Follow relative require() calls into their files
    #[arg(short, long)]
    pub recursive: bool,

    /// Print every resolved node while walking
    #[arg(short, long)]
    pub verbose: bool,

    /// Log recoverable analysis trouble
    #[arg(short, long)]
    pub debug: bool,

    /// List every sink call observed, tainted or not
    #[arg(long)]
    pub sinks: bool,

    /// Additional source pattern (repeatable)
    #[arg(long = "source", value_name = "REGEX")]
    pub sources: Vec<String>,

    /// Additional sink pattern (repeatable)
    #[arg(long = "sink", value_name = "REGEX")]
    pub sink_patterns: Vec<String>,
}

impl ScanArgs {
    /// Returns true when the scan found no tainted flows.
    pub fn run(&self) -> anyhow::Result<bool> {
        let config_dir = if self.path.is_file() {
            self.path.parent().unwrap_or_else(|| Path::new("."))
        } else {
            self.path.as_path()
        };
        let (config, config_warnings) = load_config_or_default_with_warnings(config_dir);
        for warning in &config_warnings {
            eprintln!("warning: {warning}");
        }

        let mut options = config.to_options();
        options.recursive |= self.recursive;
        options.verbose |= self.verbose;
        options.debug |= self.debug;

        let mut source_patterns = config.rules.sources.clone();
        source_patterns.extend(self.sources.iter().cloned());
        let mut sink_patterns = config.rules.sinks.clone();
        sink_patterns.extend(self.sink_patterns.iter().cloned());

        // Surface invalid patterns once, up front.
        {
            let mut probe = sable_core::RuleSet::with_defaults();
            for warning in probe.extend_patterns(&source_patterns, &sink_patterns) {
                eprintln!("warning: {warning}");
            }
        }

        let files = discover_files(&self.path)?;
        anyhow::ensure!(
            !files.is_empty(),
            "no JavaScript files found under {}",
            self.path.display()
        );

        let verbose = options.verbose;
        let results: Vec<anyhow::Result<FileReport>> = files
            .par_iter()
            .map(|file| {
                let mut session = AnalysisSession::with_options(options.clone());
                session
                    .rules_mut()
                    .extend_patterns(&source_patterns, &sink_patterns);
                if verbose {
                    session.set_node_hook(Box::new(|event| {
                        println!(
                            "[{}:{}] {} {}",
                            event.file, event.position, event.kind, event.name
                        );
                    }));
                }

                let result = session
                    .analyze_file(file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                Ok(FileReport {
                    file: file.display().to_string(),
                    reports: result.reports,
                    reported_sinks: result.reported_sinks,
                    parse_errors: result
                        .parse_errors
                        .iter()
                        .map(|e| e.to_string())
                        .collect(),
                })
            })
            .collect();
        let reports: Vec<FileReport> = results.into_iter().collect::<anyhow::Result<_>>()?;

        let clean = reports.iter().all(|file| !file.has_findings());

        match self.format.as_str() {
            "json" => println!("{}", json::format(&reports)?),
            "text" => {
                let sources = load_sources(&reports);
                let formatter = PrettyFormatter::with_sources(sources).show_sinks(self.sinks);
                print!("{}", formatter.format(&reports));
            }
            other => anyhow::bail!("unknown output format '{other}' (expected text or json)"),
        }

        Ok(clean)
    }
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Collects analyzable files under `path` in sorted order, skipping
/// dependency and VCS directories.
fn discover_files(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    anyhow::ensure!(path.is_dir(), "path does not exist: {}", path.display());

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| has_source_extension(path))
        .collect();
    files.sort();
    Ok(files)
}

fn load_sources(reports: &[FileReport]) -> HashMap<String, String> {
    reports
        .iter()
        .filter_map(|report| {
            fs::read_to_string(&report.file)
                .ok()
                .map(|source| (report.file.clone(), source))
        })
        .collect()
}
