//! The symbolic interpreter
//!
//! One `Interpreter` analyzes one file. It owns the scope tree and the
//! report tracker, borrows the rule set and options from the session, and
//! shares the session's module cache so each imported file is analyzed
//! once. Expression evaluation lives in `eval`, statement walking in
//! `walker`.

pub mod eval;
pub mod scope;
pub mod value;
pub mod walker;

use std::path::{Path, PathBuf};

use swc_common::Span;
use swc_ecma_ast::Module;

use crate::analysis::AnalysisOptions;
use crate::parser::ParsedFile;
use crate::report::{
    ChainEntry, ChainKind, Position, Report, ReportTracker, SinkRef, SourceRef,
};
use crate::resolver::ModuleCache;
use crate::rules::RuleSet;

use scope::{ScopeId, ScopeTree};
use value::{
    FunctionValue, SourceTag, SymbolicValue, ValueKind, replace_path_root, split_member_path,
};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unsupported syntax node: {kind}")]
    UnsupportedNode { kind: &'static str },
    #[error("cannot resolve module '{specifier}'")]
    UnresolvedModule { specifier: String },
    #[error("rule handler '{name}' failed: {message}")]
    RuleHandler { name: String, message: String },
    #[error("analysis step budget exhausted after {steps} steps")]
    BudgetExhausted { steps: u64 },
}

/// A resolved node observation, delivered to the session's node hook.
#[derive(Debug, Clone)]
pub struct NodeEvent {
    pub kind: &'static str,
    pub name: String,
    pub file: String,
    pub position: Position,
}

/// Everything one file's walk produced.
#[derive(Debug)]
pub struct FileAnalysis {
    pub reports: Vec<Report>,
    /// Every call matching a sink pattern, tainted or not.
    pub reported_sinks: Vec<SinkRef>,
}

pub struct Interpreter<'a> {
    pub(crate) scopes: ScopeTree,
    pub(crate) tracker: ReportTracker,
    pub(crate) reported_sinks: Vec<SinkRef>,
    pub(crate) rules: &'a RuleSet,
    pub(crate) options: &'a AnalysisOptions,
    parsed: &'a ParsedFile,
    file: String,
    dir: PathBuf,
    modules: &'a mut ModuleCache,
    hook: Option<&'a mut (dyn FnMut(&NodeEvent) + 'static)>,
    steps: u64,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        parsed: &'a ParsedFile,
        file: impl Into<String>,
        dir: impl Into<PathBuf>,
        rules: &'a RuleSet,
        options: &'a AnalysisOptions,
        modules: &'a mut ModuleCache,
        hook: Option<&'a mut (dyn FnMut(&NodeEvent) + 'static)>,
    ) -> Self {
        Self {
            scopes: ScopeTree::new(),
            tracker: ReportTracker::new(),
            reported_sinks: Vec::new(),
            rules,
            options,
            parsed,
            file: file.into(),
            dir: dir.into(),
            modules,
            hook,
            steps: 0,
        }
    }

    /// Walks a whole module. A blown step budget aborts this file only;
    /// everything observed up to that point survives.
    pub fn analyze_module(&mut self, module: &Module) {
        self.bootstrap();
        if let Err(e) = self.walk_module(module) {
            tracing::warn!(file = %self.file, error = %e, "analysis aborted");
        }
    }

    pub fn finish(self) -> FileAnalysis {
        FileAnalysis {
            reports: self.tracker.into_reports(),
            reported_sinks: self.reported_sinks,
        }
    }

    /// CommonJS ambient bindings. `module.exports` and `exports` start as
    /// separate empty objects; `export_value` reconciles them afterwards.
    fn bootstrap(&mut self) {
        let root = self.scopes.root();
        let exports = SymbolicValue::object(Vec::new());
        let module = SymbolicValue::object(vec![("exports".to_string(), exports.clone())]);
        self.scopes.bind_local(root, "module", module);
        self.scopes.bind_local(root, "exports", exports);
        self.scopes
            .bind_local(root, "global", SymbolicValue::object(Vec::new()));
    }

    /// The value this module exposes to importers: a non-empty
    /// `module.exports` wins, then a non-empty `exports`, then whatever
    /// either holds.
    pub fn export_value(&self) -> SymbolicValue {
        fn is_empty_object(value: &SymbolicValue) -> bool {
            matches!(&value.kind, ValueKind::Object { props } if props.is_empty())
        }

        let root = self.scopes.root();
        let module_exports = self.resolve_path(root, "module.exports");
        let plain_exports = self.scopes.lookup(root, "exports").cloned();

        match (&module_exports, &plain_exports) {
            (Some(v), _) if !is_empty_object(v) => v.clone(),
            (_, Some(v)) if !is_empty_object(v) => v.clone(),
            _ => module_exports
                .or(plain_exports)
                .unwrap_or_else(SymbolicValue::undefined),
        }
    }

    pub(crate) fn position(&self, span: Span) -> Position {
        self.parsed.position_of(span)
    }

    pub(crate) fn file_label(&self) -> &str {
        &self.file
    }

    /// Per-node step accounting. The budget bounds pathological inputs;
    /// exhaustion unwinds to `analyze_module`.
    pub(crate) fn bump(&mut self) -> Result<(), EngineError> {
        self.steps += 1;
        if self.steps > self.options.max_steps {
            return Err(EngineError::BudgetExhausted { steps: self.steps });
        }
        Ok(())
    }

    /// Trace event: verbose log plus the optional session hook.
    pub(crate) fn emit(&mut self, kind: &'static str, name: &str, span: Span) {
        let position = self.position(span);
        if self.options.verbose {
            tracing::debug!(
                target: "sable::trace",
                kind,
                name,
                file = %self.file,
                line = position.line,
                "node"
            );
        }
        if let Some(hook) = self.hook.as_mut() {
            let event = NodeEvent {
                kind,
                name: name.to_string(),
                file: self.file.clone(),
                position,
            };
            hook(&event);
        }
    }

    /// Opens a report for a freshly matched source expression and returns
    /// its taint tag.
    pub(crate) fn match_source(&mut self, name: &str, span: Span) -> Option<SourceTag> {
        self.rules.sources.find_match(name)?;
        let position = self.position(span);
        let tag = SourceTag::new(name, &self.file, position);
        self.tracker
            .open_source(SourceRef::new(name, &self.file, position));
        self.emit("source", name, span);
        Some(tag)
    }

    /// On a tainted right-hand side: make sure the source is tracked and
    /// append the assignment to its chain.
    pub(crate) fn record_tainted_binding(
        &mut self,
        value: &SymbolicValue,
        name: &str,
        span: Span,
    ) {
        let Some(tag) = value.taint.clone() else {
            return;
        };
        let position = self.position(span);
        self.tracker
            .open_source(SourceRef::new(&tag.name, &tag.file, tag.position));
        self.tracker.record_step(
            &tag.name,
            ChainEntry::new(ChainKind::Assignment, name, &self.file, position),
        );
    }

    /// A tainted value reached a call: close the report on a sink, or
    /// record a pass-through chain step otherwise.
    pub(crate) fn report_flow(
        &mut self,
        tag: &SourceTag,
        callee: &str,
        is_sink: bool,
        span: Span,
    ) {
        let position = self.position(span);
        self.tracker
            .open_source(SourceRef::new(&tag.name, &tag.file, tag.position));
        if is_sink {
            if self
                .tracker
                .close(&tag.name, SinkRef::new(callee, &self.file, position))
                .is_some()
            {
                self.emit("report", callee, span);
            }
        } else {
            self.tracker.record_step(
                &tag.name,
                ChainEntry::new(ChainKind::Call, callee, &self.file, position),
            );
        }
    }

    /// Reads a canonical dotted/bracket path through the scope chain.
    /// Object roots walk their property shapes; path-shaped roots rewrite
    /// the leading segment and inherit the root's taint.
    pub(crate) fn resolve_path(&self, scope: ScopeId, name: &str) -> Option<SymbolicValue> {
        let parts = split_member_path(name);
        let root_value = self.scopes.lookup(scope, parts[0])?;
        if parts.len() == 1 {
            return Some(root_value.clone());
        }

        match &root_value.kind {
            ValueKind::Undefined => None,
            ValueKind::Object { .. } => {
                let mut current = root_value;
                for segment in &parts[1..] {
                    let ValueKind::Object { props } = &current.kind else {
                        break;
                    };
                    match props.iter().find(|(key, _)| key == segment) {
                        Some((_, value)) => current = value,
                        None => return None,
                    }
                }
                Some(current.clone())
            }
            ValueKind::MemberPath { path } => {
                let mut value = SymbolicValue::member(replace_path_root(name, path));
                value.taint = root_value.taint.clone();
                Some(value)
            }
            ValueKind::CallResult { raw, .. } => {
                let mut value = SymbolicValue::member(replace_path_root(name, raw));
                value.taint = root_value.taint.clone();
                Some(value)
            }
            ValueKind::Binary { .. } => Some(root_value.clone()),
            _ => {
                let mut value = SymbolicValue::member(name);
                value.taint = root_value.taint.clone();
                Some(value)
            }
        }
    }

    /// Writes through a canonical path, materializing intermediate object
    /// placeholders so a later read observes the write.
    pub(crate) fn assign_path(&mut self, scope: ScopeId, name: &str, value: SymbolicValue) {
        let parts = split_member_path(name);
        if parts.len() == 1 {
            self.scopes.assign(scope, name, value);
            return;
        }

        let root = parts[0];
        let target = self
            .scopes
            .defining_scope(scope, root)
            .unwrap_or_else(|| self.scopes.hoist_target(scope));
        let scope_ref = self.scopes.get_mut(target);

        let root_is_object = matches!(
            scope_ref.binding(root).map(|v| &v.kind),
            Some(ValueKind::Object { .. })
        );
        if !root_is_object {
            scope_ref.set_binding(root, SymbolicValue::object(Vec::new()));
        }
        let Some(mut current) = scope_ref.binding_mut(root) else {
            return;
        };

        for segment in &parts[1..parts.len() - 1] {
            let ValueKind::Object { props } = &mut current.kind else {
                return;
            };
            let index = match props.iter().position(|(key, _)| key == segment) {
                Some(index) => index,
                None => {
                    props.push((segment.to_string(), SymbolicValue::object(Vec::new())));
                    props.len() - 1
                }
            };
            if !matches!(props[index].1.kind, ValueKind::Object { .. }) {
                props[index].1 = SymbolicValue::object(Vec::new());
            }
            current = &mut props[index].1;
        }

        let last = parts[parts.len() - 1];
        if let ValueKind::Object { props } = &mut current.kind {
            match props.iter_mut().find(|(key, _)| key == last) {
                Some((_, slot)) => *slot = value,
                None => props.push((last.to_string(), value)),
            }
        }
    }

    /// Follows identifier indirection to a function value, for callback
    /// rules whose handler is referenced by name.
    pub(crate) fn resolve_function(
        &self,
        scope: ScopeId,
        value: &SymbolicValue,
    ) -> Option<FunctionValue> {
        if let Some(func) = value.as_function() {
            return Some(func.clone());
        }
        let name = value.lookup_name()?;
        let resolved = self.resolve_path(scope, name)?;
        resolved.as_function().cloned()
    }

    /// Walks a callback body with one parameter pre-tainted, opening a
    /// report for that parameter as the source.
    pub(crate) fn simulate_tainted_callback(
        &mut self,
        func: &FunctionValue,
        source: crate::rules::ArgSlot,
        span: Span,
    ) -> Result<(), EngineError> {
        let Some(index) = source.resolve(func.params.len()) else {
            return Ok(());
        };
        let position = self.position(span);
        let mut args: Vec<SymbolicValue> = func
            .params
            .iter()
            .map(|param| SymbolicValue::ident(param.clone()))
            .collect();
        let param = func.params[index].clone();
        self.tracker
            .open_source(SourceRef::new(&param, &self.file, position));
        self.emit("source", &param, span);
        args[index].taint = Some(SourceTag::new(param, &self.file, position));
        self.simulate_call(func, args, span)
    }

    /// Resolves a relative import and splices its export value in,
    /// analyzing the target once per session.
    pub(crate) fn follow_module(&mut self, path: &Path) -> SymbolicValue {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if let Some(state) = self.modules.lookup(&canonical) {
            // An in-progress entry means an import cycle.
            return match state {
                Some(exports) => exports.clone(),
                None => SymbolicValue::undefined(),
            };
        }

        let label = canonical.display().to_string();
        let source = match std::fs::read_to_string(&canonical) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(file = %label, error = %e, "cannot read module");
                return SymbolicValue::unresolved(label);
            }
        };
        self.modules.mark_in_progress(canonical.clone());

        if self.options.verbose {
            tracing::debug!(target: "sable::trace", file = %label, "entering module");
        }

        let parsed = ParsedFile::from_source(&label, &source);
        let exports = match parsed.module() {
            Some(module) => {
                let dir = canonical
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.dir.clone());
                let hook = self.hook.as_mut().map(|h| &mut **h);
                let mut nested = Interpreter::new(
                    &parsed,
                    &label,
                    dir,
                    self.rules,
                    self.options,
                    &mut *self.modules,
                    hook,
                );
                nested.analyze_module(module);
                let exports = nested.export_value();
                let analysis = nested.finish();
                self.tracker.absorb(analysis.reports);
                self.reported_sinks.extend(analysis.reported_sinks);
                exports
            }
            None => {
                tracing::warn!(file = %label, "imported module failed to parse");
                SymbolicValue::undefined()
            }
        };

        self.modules.complete(canonical, exports.clone());
        exports
    }

    pub(crate) fn import_dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ModuleCache;

    fn fixture<'a>(
        parsed: &'a ParsedFile,
        rules: &'a RuleSet,
        options: &'a AnalysisOptions,
        modules: &'a mut ModuleCache,
    ) -> Interpreter<'a> {
        Interpreter::new(parsed, "test.js", ".", rules, options, modules, None)
    }

    #[test]
    fn bootstrap_binds_commonjs_globals() {
        let parsed = ParsedFile::from_source("test.js", "");
        let rules = RuleSet::with_defaults();
        let options = AnalysisOptions::default();
        let mut modules = ModuleCache::new();
        let mut interp = fixture(&parsed, &rules, &options, &mut modules);

        interp.bootstrap();

        let root = interp.scopes.root();
        assert!(interp.scopes.lookup(root, "module").is_some());
        assert!(interp.scopes.lookup(root, "exports").is_some());
        assert!(interp.scopes.lookup(root, "global").is_some());
        assert!(interp.resolve_path(root, "module.exports").is_some());
    }

    #[test]
    fn assign_path_materializes_intermediate_objects() {
        let parsed = ParsedFile::from_source("test.js", "");
        let rules = RuleSet::with_defaults();
        let options = AnalysisOptions::default();
        let mut modules = ModuleCache::new();
        let mut interp = fixture(&parsed, &rules, &options, &mut modules);

        let root = interp.scopes.root();
        interp.assign_path(root, "a.b.c", SymbolicValue::literal("1"));

        let value = interp.resolve_path(root, "a.b.c").unwrap();
        assert_eq!(value.raw_name(), "1");
        assert!(interp.resolve_path(root, "a.b").is_some());
    }

    #[test]
    fn resolve_path_rewrites_member_roots() {
        let parsed = ParsedFile::from_source("test.js", "");
        let rules = RuleSet::with_defaults();
        let options = AnalysisOptions::default();
        let mut modules = ModuleCache::new();
        let mut interp = fixture(&parsed, &rules, &options, &mut modules);

        let root = interp.scopes.root();
        let tag = SourceTag::new("req.query", "test.js", Position::new(1, 0));
        interp.scopes.bind_local(
            root,
            "q",
            SymbolicValue::member("req.query").with_taint(tag),
        );

        let value = interp.resolve_path(root, "q.id").unwrap();
        assert_eq!(value.raw_name(), "req.query.id");
        assert_eq!(
            value.taint.as_ref().map(|t| t.name.as_str()),
            Some("req.query")
        );
    }

    #[test]
    fn resolve_path_rewrites_call_result_roots() {
        let parsed = ParsedFile::from_source("test.js", "");
        let rules = RuleSet::with_defaults();
        let options = AnalysisOptions::default();
        let mut modules = ModuleCache::new();
        let mut interp = fixture(&parsed, &rules, &options, &mut modules);

        let root = interp.scopes.root();
        interp.scopes.bind_local(
            root,
            "fs",
            SymbolicValue::new(ValueKind::CallResult {
                raw: "require('fs')".to_string(),
                callee: Box::new(SymbolicValue::unresolved("require")),
                args: vec![SymbolicValue::literal("'fs'")],
            }),
        );

        let value = interp.resolve_path(root, "fs.readFile").unwrap();
        assert_eq!(value.raw_name(), "require('fs').readFile");
    }

    #[test]
    fn resolve_path_missing_property_is_none() {
        let parsed = ParsedFile::from_source("test.js", "");
        let rules = RuleSet::with_defaults();
        let options = AnalysisOptions::default();
        let mut modules = ModuleCache::new();
        let mut interp = fixture(&parsed, &rules, &options, &mut modules);

        let root = interp.scopes.root();
        interp
            .scopes
            .bind_local(root, "a", SymbolicValue::object(Vec::new()));

        assert!(interp.resolve_path(root, "a.missing").is_none());
    }

    #[test]
    fn budget_exhaustion_surfaces_as_error() {
        let parsed = ParsedFile::from_source("test.js", "");
        let rules = RuleSet::with_defaults();
        let options = AnalysisOptions {
            max_steps: 2,
            ..Default::default()
        };
        let mut modules = ModuleCache::new();
        let mut interp = fixture(&parsed, &rules, &options, &mut modules);

        assert!(interp.bump().is_ok());
        assert!(interp.bump().is_ok());
        assert!(matches!(
            interp.bump(),
            Err(EngineError::BudgetExhausted { .. })
        ));
    }
}
