//! Configuration loading for sable.toml files
//!
//! Looks for `sable.toml` in the scanned directory or any ancestor.
//! Unknown keys are tolerated but surfaced as warnings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisOptions;

pub const CONFIG_FILENAME: &str = "sable.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub recursive: bool,
    pub verbose: bool,
    pub debug: bool,
    pub max_steps: u64,
    pub follow_packages: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let defaults = AnalysisOptions::default();
        Self {
            recursive: defaults.recursive,
            verbose: defaults.verbose,
            debug: defaults.debug,
            max_steps: defaults.max_steps,
            follow_packages: defaults.follow_packages,
        }
    }
}

/// Extra rule patterns appended after the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub sources: Vec<String>,
    pub sinks: Vec<String>,
}

impl Config {
    pub fn to_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            recursive: self.analysis.recursive,
            verbose: self.analysis.verbose,
            debug: self.analysis.debug,
            max_steps: self.analysis.max_steps,
            follow_packages: self.analysis.follow_packages.clone(),
        }
    }
}

/// Walks up from `start_dir` looking for a config file.
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Loads the config plus warnings for keys the schema does not know.
pub fn load_config_with_warnings(path: &Path) -> Result<(Config, Vec<String>), ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = detect_unknown_keys(&contents);
    Ok((config, warnings))
}

fn detect_unknown_keys(contents: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let Ok(value) = toml::from_str::<toml::Value>(contents) else {
        return warnings;
    };
    let Some(table) = value.as_table() else {
        return warnings;
    };

    for (section, entry) in table {
        match section.as_str() {
            "analysis" => {
                if let Some(keys) = entry.as_table() {
                    for key in keys.keys() {
                        if !matches!(
                            key.as_str(),
                            "recursive" | "verbose" | "debug" | "max_steps"
                                | "follow_packages"
                        ) {
                            warnings.push(format!("unknown key 'analysis.{key}'"));
                        }
                    }
                }
            }
            "rules" => {
                if let Some(keys) = entry.as_table() {
                    for key in keys.keys() {
                        if !matches!(key.as_str(), "sources" | "sinks") {
                            warnings.push(format!("unknown key 'rules.{key}'"));
                        }
                    }
                }
            }
            other => warnings.push(format!("unknown section '{other}'")),
        }
    }

    warnings
}

/// Finds and loads the nearest config, falling back to defaults when none
/// exists or it fails to load. Warnings (unknown keys, an unreadable or
/// malformed file) come back for the caller to surface.
pub fn load_config_or_default_with_warnings(start_dir: &Path) -> (Config, Vec<String>) {
    match find_config_file(start_dir) {
        Some(path) => match load_config_with_warnings(&path) {
            Ok((config, warnings)) => (config, warnings),
            Err(e) => (Config::default(), vec![format!("ignoring config file: {e}")]),
        },
        None => (Config::default(), Vec::new()),
    }
}

/// Finds and loads the nearest config, logging anything worth flagging.
pub fn load_config_or_default(start_dir: &Path) -> Config {
    let (config, warnings) = load_config_or_default_with_warnings(start_dir);
    for warning in warnings {
        tracing::warn!(%warning, "config");
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_config_matches_default_options() {
        let config = Config::default();
        let options = config.to_options();

        assert!(!options.recursive);
        assert!(!options.verbose);
        assert!(!options.debug);
        assert_eq!(options.max_steps, 500_000);
    }

    #[test]
    fn parse_full_config() {
        let text = r#"
[analysis]
recursive = true
verbose = true
max_steps = 1000

[rules]
sources = ["^req\\.query"]
sinks = ["^db\\.query$"]
"#;
        let config: Config = toml::from_str(text).unwrap();

        assert!(config.analysis.recursive);
        assert!(config.analysis.verbose);
        assert!(!config.analysis.debug);
        assert_eq!(config.analysis.max_steps, 1000);
        assert_eq!(config.rules.sources, vec!["^req\\.query"]);
        assert_eq!(config.rules.sinks, vec!["^db\\.query$"]);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[analysis]\nrecursive = true\n").unwrap();

        assert!(config.analysis.recursive);
        assert_eq!(config.analysis.max_steps, 500_000);
        assert!(config.rules.sources.is_empty());
    }

    #[test]
    fn empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn find_config_in_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "").unwrap();

        let found = find_config_file(dir.path()).unwrap();
        assert_eq!(found, path);
    }

    #[test]
    fn find_config_in_ancestor_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, path);
    }

    #[test]
    fn missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();

        // The tempdir's ancestors could in principle carry a sable.toml;
        // use a nested dir that definitely has none below the root.
        let nested = dir.path().join("empty");
        fs::create_dir(&nested).unwrap();
        let found = find_config_file(&nested);
        assert!(found.is_none() || !found.unwrap().starts_with(&nested));
    }

    #[test]
    fn load_config_read_error() {
        let result = load_config(Path::new("/nonexistent/sable.toml"));

        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn load_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "not [ valid toml").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn unknown_keys_produce_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            "[analysis]\nrecursive = true\nspeed = 11\n\n[output]\ncolor = true\n",
        )
        .unwrap();

        let (config, warnings) = load_config_with_warnings(&path).unwrap();

        assert!(config.analysis.recursive);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("analysis.speed")));
        assert!(warnings.iter().any(|w| w.contains("section 'output'")));
    }

    #[test]
    fn load_config_or_default_surfaces_unknown_key_warnings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            "[analysis]\nrecursive = true\nspeed = 11\n",
        )
        .unwrap();

        let (config, warnings) = load_config_or_default_with_warnings(dir.path());

        assert!(config.analysis.recursive);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("analysis.speed"));
    }

    #[test]
    fn load_config_or_default_warns_on_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "not [ valid toml").unwrap();

        let (config, warnings) = load_config_or_default_with_warnings(dir.path());

        assert_eq!(config, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ignoring config file"));
    }

    #[test]
    fn load_config_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("no-config-here");
        fs::create_dir(&nested).unwrap();

        // Whatever it finds or not, this never panics and yields a config.
        let _ = load_config_or_default(&nested);
    }
}
