//! Rules command - shows the patterns a scan would use

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use sable_core::{RuleSet, load_config_or_default_with_warnings};

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Directory whose sable.toml should be included
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,
}

impl RulesArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        let (config, config_warnings) = load_config_or_default_with_warnings(&self.path);
        for warning in &config_warnings {
            eprintln!("warning: {warning}");
        }
        let mut rules = RuleSet::with_defaults();
        for warning in rules.extend_patterns(&config.rules.sources, &config.rules.sinks) {
            eprintln!("warning: {warning}");
        }

        print!("{}", render(&rules));
        Ok(())
    }
}

fn render(rules: &RuleSet) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", "sources".bold()));
    for pattern in rules.sources.patterns() {
        output.push_str(&format!("  {pattern}\n"));
    }

    output.push_str(&format!("{}\n", "sinks".bold()));
    for pattern in rules.sinks.patterns() {
        output.push_str(&format!("  {pattern}\n"));
    }

    output.push_str(&format!("{}\n", "callbacks".bold()));
    for pattern in rules.callbacks.patterns() {
        output.push_str(&format!("  {pattern}\n"));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn render_lists_all_sections() {
        colored::control::set_override(false);
        let output = render(&RuleSet::with_defaults());

        assert!(output.contains("sources\n"));
        assert!(output.contains("  ^process.*$\n"));
        assert!(output.contains("sinks\n"));
        assert!(output.contains("  ^eval$\n"));
        assert!(output.contains("callbacks\n"));
        assert!(output.contains("readFile"));
    }

    #[test]
    fn run_includes_config_patterns() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("sable.toml"),
            "[rules]\nsinks = [\"^db\\\\.query$\"]\n",
        )
        .unwrap();

        let (config, warnings) = load_config_or_default_with_warnings(dir.path());
        let mut rules = RuleSet::with_defaults();
        rules.extend_patterns(&config.rules.sources, &config.rules.sinks);

        assert!(warnings.is_empty());
        assert!(render(&rules).contains("^db\\.query$"));
    }
}
