//! Relative module resolution
//!
//! Follows the Node lookup order for relative specifiers: the exact path,
//! then `.js` and `.json` suffixes, then a directory `index.js`. Bare
//! specifiers (package imports) are never resolved on disk; the engine
//! keeps them as opaque `require('name')` values so rule patterns can
//! match their canonical spelling.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::value::{SymbolicValue, ValueKind};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

pub fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

pub fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

pub fn resolve_on_disk(base: &Path, specifier: &str) -> Option<PathBuf> {
    let joined = base.join(specifier);
    if joined.is_file() {
        return Some(joined);
    }

    for ext in [".js", ".json"] {
        let mut candidate = joined.clone().into_os_string();
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let index = joined.join("index.js");
    if index.is_file() {
        return Some(index);
    }
    None
}

/// Resolves a bare specifier against `node_modules` directories, walking
/// up from `base` the way Node does. Only the plain file layout is
/// understood (`pkg.js`, `pkg/index.js`); `package.json` main fields are
/// not consulted.
pub fn resolve_package(base: &Path, specifier: &str) -> Option<PathBuf> {
    let mut current = base.to_path_buf();
    loop {
        let modules = current.join("node_modules");
        if modules.is_dir() {
            if let Some(found) = resolve_on_disk(&modules, specifier) {
                return Some(found);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Reads a JSON file into the symbolic value shapes the engine walks:
/// objects and arrays keep their structure, scalars become literals.
pub fn load_json(path: &Path) -> Result<SymbolicValue, ResolveError> {
    let text = fs::read_to_string(path).map_err(|source| ResolveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| ResolveError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(json_to_value(&parsed))
}

fn json_to_value(value: &serde_json::Value) -> SymbolicValue {
    match value {
        serde_json::Value::Null => SymbolicValue::literal("null"),
        serde_json::Value::Bool(b) => SymbolicValue::literal(b.to_string()),
        serde_json::Value::Number(n) => SymbolicValue::literal(n.to_string()),
        serde_json::Value::String(s) => SymbolicValue::literal(format!("'{s}'")),
        serde_json::Value::Array(items) => SymbolicValue::new(ValueKind::Array {
            elements: items.iter().map(json_to_value).collect(),
        }),
        serde_json::Value::Object(map) => SymbolicValue::object(
            map.iter()
                .map(|(key, value)| (key.clone(), json_to_value(value)))
                .collect(),
        ),
    }
}

#[derive(Debug)]
enum ModuleState {
    /// Currently being analyzed further up the import stack.
    InProgress,
    Complete(SymbolicValue),
}

/// Session-wide cache of analyzed modules, keyed by canonical path. The
/// in-progress state is how import cycles are detected.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: HashMap<PathBuf, ModuleState>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// `None`: never seen. `Some(None)`: import cycle. `Some(Some(v))`:
    /// analyzed, exports available.
    pub fn lookup(&self, path: &Path) -> Option<Option<&SymbolicValue>> {
        self.entries.get(path).map(|state| match state {
            ModuleState::InProgress => None,
            ModuleState::Complete(exports) => Some(exports),
        })
    }

    pub fn mark_in_progress(&mut self, path: PathBuf) {
        self.entries.insert(path, ModuleState::InProgress);
    }

    pub fn complete(&mut self, path: PathBuf, exports: SymbolicValue) {
        self.entries.insert(path, ModuleState::Complete(exports));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn relative_specifiers() {
        assert!(is_relative("./util"));
        assert!(is_relative("../lib/util.js"));
        assert!(!is_relative("fs"));
        assert!(!is_relative("express"));
        assert!(!is_relative(".hidden"));
    }

    #[test]
    fn resolves_exact_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("util.js"), "").unwrap();

        let resolved = resolve_on_disk(dir.path(), "./util.js").unwrap();
        assert_eq!(resolved, dir.path().join("util.js"));
    }

    #[test]
    fn resolves_with_js_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("util.js"), "").unwrap();

        let resolved = resolve_on_disk(dir.path(), "./util").unwrap();
        assert_eq!(resolved, dir.path().join("util.js"));
    }

    #[test]
    fn resolves_json_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{}").unwrap();

        let resolved = resolve_on_disk(dir.path(), "./config").unwrap();
        assert!(is_json(&resolved));
    }

    #[test]
    fn exact_js_file_wins_over_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.js"), "").unwrap();
        fs::write(dir.path().join("config.json"), "{}").unwrap();

        let resolved = resolve_on_disk(dir.path(), "./config").unwrap();
        assert_eq!(resolved, dir.path().join("config.js"));
    }

    #[test]
    fn resolves_directory_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/index.js"), "").unwrap();

        let resolved = resolve_on_disk(dir.path(), "./lib").unwrap();
        assert_eq!(resolved, dir.path().join("lib/index.js"));
    }

    #[test]
    fn missing_module_is_none() {
        let dir = tempfile::tempdir().unwrap();

        assert!(resolve_on_disk(dir.path(), "./nope").is_none());
    }

    #[test]
    fn dotted_specifier_keeps_its_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.prod.js"), "").unwrap();

        let resolved = resolve_on_disk(dir.path(), "./config.prod").unwrap();
        assert_eq!(resolved, dir.path().join("config.prod.js"));
    }

    #[test]
    fn package_resolves_through_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/left-pad")).unwrap();
        fs::write(dir.path().join("node_modules/left-pad/index.js"), "").unwrap();

        let resolved = resolve_package(dir.path(), "left-pad").unwrap();
        assert_eq!(
            resolved,
            dir.path().join("node_modules/left-pad/index.js")
        );
    }

    #[test]
    fn package_lookup_walks_up_to_ancestor_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src/app");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/pkg.js"), "").unwrap();

        let resolved = resolve_package(&nested, "pkg").unwrap();
        assert_eq!(resolved, dir.path().join("node_modules/pkg.js"));
    }

    #[test]
    fn missing_package_is_none() {
        let dir = tempfile::tempdir().unwrap();

        assert!(resolve_package(dir.path(), "no-such-pkg").is_none());
    }

    #[test]
    fn json_scalars_become_literals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"name": "api", "port": 8080, "debug": true}"#).unwrap();

        let value = load_json(&path).unwrap();
        let ValueKind::Object { props } = &value.kind else {
            panic!("expected object, got {:?}", value.kind);
        };
        assert_eq!(props.len(), 3);
        let name = props.iter().find(|(key, _)| key == "name").unwrap();
        assert_eq!(name.1.raw_name(), "'api'");
    }

    #[test]
    fn json_arrays_keep_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        fs::write(&path, r#"[1, "two", null]"#).unwrap();

        let value = load_json(&path).unwrap();
        assert!(matches!(&value.kind, ValueKind::Array { elements } if elements.len() == 3));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            load_json(&path),
            Err(ResolveError::Parse { .. })
        ));
    }

    #[test]
    fn cache_distinguishes_cycle_from_complete() {
        let mut cache = ModuleCache::new();
        let a = PathBuf::from("/a.js");
        let b = PathBuf::from("/b.js");

        assert!(cache.lookup(&a).is_none());

        cache.mark_in_progress(a.clone());
        assert!(matches!(cache.lookup(&a), Some(None)));

        cache.complete(b.clone(), SymbolicValue::literal("1"));
        assert!(matches!(cache.lookup(&b), Some(Some(_))));
        assert_eq!(cache.len(), 2);
    }
}
