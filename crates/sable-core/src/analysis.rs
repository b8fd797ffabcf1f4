//! Analysis session
//!
//! An `AnalysisSession` holds the pieces shared across files: the rule
//! set, the options, the module cache, and an optional node hook for
//! consumers that want the raw event stream.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{Interpreter, NodeEvent};
use crate::parser::{ParseError, ParsedFile};
use crate::report::{Report, SinkRef};
use crate::resolver::ModuleCache;
use crate::rules::RuleSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Follow relative imports into their files.
    pub recursive: bool,
    /// Log skipped statements and other recoverable trouble.
    pub debug: bool,
    /// Log every resolved node event.
    pub verbose: bool,
    /// Upper bound on evaluation steps per file.
    pub max_steps: u64,
    /// Bare package specifiers to follow through `node_modules`. Everything
    /// not listed stays an opaque external call.
    pub follow_packages: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            debug: false,
            verbose: false,
            max_steps: 500_000,
            follow_packages: Vec::new(),
        }
    }
}

/// Everything one analysis run produced for a file and the modules it
/// pulled in.
#[derive(Debug)]
pub struct AnalysisResult {
    /// Closed source-to-sink flows, in source order.
    pub reports: Vec<Report>,
    /// Every call that matched a sink pattern, tainted or not.
    pub reported_sinks: Vec<SinkRef>,
    pub parse_errors: Vec<ParseError>,
}

impl AnalysisResult {
    pub fn is_clean(&self) -> bool {
        self.reports.is_empty()
    }
}

pub struct AnalysisSession {
    options: AnalysisOptions,
    rules: RuleSet,
    modules: ModuleCache,
    hook: Option<Box<dyn FnMut(&NodeEvent)>>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::with_options(AnalysisOptions::default())
    }

    pub fn with_options(options: AnalysisOptions) -> Self {
        Self {
            options,
            rules: RuleSet::with_defaults(),
            modules: ModuleCache::new(),
            hook: None,
        }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut AnalysisOptions {
        &mut self.options
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// Installs an observer for every resolved node event; the engine
    /// calls it in evaluation order.
    pub fn set_node_hook(&mut self, hook: Box<dyn FnMut(&NodeEvent)>) {
        self.hook = Some(hook);
    }

    pub fn analyze_source(&mut self, filename: &str, source: &str) -> AnalysisResult {
        let parsed = ParsedFile::from_source(filename, source);
        let parse_errors = parsed.errors().to_vec();

        let Some(module) = parsed.module() else {
            tracing::warn!(file = filename, "file failed to parse");
            return AnalysisResult {
                reports: Vec::new(),
                reported_sinks: Vec::new(),
                parse_errors,
            };
        };

        let dir = Path::new(filename)
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let hook = self.hook.as_mut().map(|h| h.as_mut());
        let mut interpreter = Interpreter::new(
            &parsed,
            filename,
            dir,
            &self.rules,
            &self.options,
            &mut self.modules,
            hook,
        );
        interpreter.analyze_module(module);
        let analysis = interpreter.finish();

        AnalysisResult {
            reports: analysis.reports,
            reported_sinks: analysis.reported_sinks,
            parse_errors,
        }
    }

    pub fn analyze_file(&mut self, path: &Path) -> std::io::Result<AnalysisResult> {
        let source = std::fs::read_to_string(path)?;
        Ok(self.analyze_source(&path.display().to_string(), &source))
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn clean_file_produces_no_reports() {
        let mut session = AnalysisSession::new();

        let result = session.analyze_source("test.js", "var x = 1;\nconsole.log(x);");

        assert!(result.is_clean());
        assert!(result.reported_sinks.is_empty());
        assert!(result.parse_errors.is_empty());
    }

    #[test]
    fn unparseable_file_yields_errors_only() {
        let mut session = AnalysisSession::new();

        let result = session.analyze_source("test.js", "var = = =;");

        assert!(!result.parse_errors.is_empty());
        assert!(result.reports.is_empty());
    }

    #[test]
    fn analysis_is_deterministic() {
        let code = "var cmd = process.argv[2];\neval(cmd);\nsetTimeout(cmd, 10);";

        let first = AnalysisSession::new().analyze_source("test.js", code);
        let second = AnalysisSession::new().analyze_source("test.js", code);

        assert_eq!(first.reports.len(), second.reports.len());
        assert_eq!(first.reported_sinks.len(), second.reported_sinks.len());
        for (a, b) in first.reports.iter().zip(&second.reports) {
            assert_eq!(a.source.name, b.source.name);
            assert_eq!(
                a.sink.as_ref().map(|s| &s.name),
                b.sink.as_ref().map(|s| &s.name)
            );
        }
    }

    #[test]
    fn node_hook_observes_events_in_order() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);

        let mut session = AnalysisSession::new();
        session.set_node_hook(Box::new(move |event| {
            if event.kind == "source" {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        session.analyze_source("test.js", "eval(process.argv[2]);");

        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn node_hook_observes_imported_module_events() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.js");
        let main = dir.path().join("main.js");
        fs::write(&lib, "eval(process.argv[2]);").unwrap();
        fs::write(&main, "var lib = require('./lib');").unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut session = AnalysisSession::with_options(AnalysisOptions {
            recursive: true,
            ..Default::default()
        });
        session.set_node_hook(Box::new(move |event| {
            if event.file.ends_with("lib.js") {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        session.analyze_file(&main).unwrap();

        // The hook follows the walk into the imported file.
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn recursive_analysis_follows_relative_imports() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.js");
        let main = dir.path().join("main.js");
        fs::write(&lib, "module.exports.cmd = process.argv[2];").unwrap();
        fs::write(&main, "var lib = require('./lib');\neval(lib.cmd);").unwrap();

        let mut session = AnalysisSession::with_options(AnalysisOptions {
            recursive: true,
            ..Default::default()
        });
        let result = session.analyze_file(&main).unwrap();

        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.reports[0].source.name, "process.argv[2]");
    }

    #[test]
    fn whitelisted_package_is_followed() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules/audit-me");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("index.js"), "module.exports.cmd = process.argv[2];").unwrap();
        let main = dir.path().join("main.js");
        fs::write(&main, "var pkg = require('audit-me');\neval(pkg.cmd);").unwrap();

        let mut session = AnalysisSession::with_options(AnalysisOptions {
            follow_packages: vec!["audit-me".to_string()],
            ..Default::default()
        });
        let result = session.analyze_file(&main).unwrap();

        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.reports[0].source.name, "process.argv[2]");
    }

    #[test]
    fn unlisted_package_stays_opaque() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules/audit-me");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("index.js"), "module.exports.cmd = process.argv[2];").unwrap();
        let main = dir.path().join("main.js");
        fs::write(&main, "var pkg = require('audit-me');\neval(pkg.cmd);").unwrap();

        let mut session = AnalysisSession::new();
        let result = session.analyze_file(&main).unwrap();

        assert!(result.reports.is_empty());
        assert_eq!(result.reported_sinks.len(), 1);
    }

    #[test]
    fn import_cycle_does_not_hang() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "var b = require('./b');\nmodule.exports.a = 1;").unwrap();
        fs::write(&b, "var a = require('./a');\nmodule.exports.b = 2;").unwrap();

        let mut session = AnalysisSession::with_options(AnalysisOptions {
            recursive: true,
            ..Default::default()
        });
        let result = session.analyze_file(&a).unwrap();

        assert!(result.parse_errors.is_empty());
    }

    #[test]
    fn json_import_is_spliced_without_recursive_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        let main = dir.path().join("main.js");
        fs::write(&config, r#"{"cmd": "ls"}"#).unwrap();
        fs::write(&main, "var cfg = require('./config.json');\neval(cfg.cmd);").unwrap();

        let mut session = AnalysisSession::new();
        let result = session.analyze_file(&main).unwrap();

        // A JSON value is a literal shape, never tainted.
        assert!(result.reports.is_empty());
        assert_eq!(result.reported_sinks.len(), 1);
    }

    #[test]
    fn module_analyzed_once_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.js");
        let main = dir.path().join("main.js");
        fs::write(&lib, "eval(process.argv[2]);\nmodule.exports.x = 1;").unwrap();
        fs::write(
            &main,
            "var a = require('./lib');\nvar b = require('./lib');",
        )
        .unwrap();

        let mut session = AnalysisSession::with_options(AnalysisOptions {
            recursive: true,
            ..Default::default()
        });
        let result = session.analyze_file(&main).unwrap();

        // The imported file's flow is reported exactly once.
        assert_eq!(result.reports.len(), 1);
    }
}
