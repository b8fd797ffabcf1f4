//! Symbolic values flowing through the interpreter
//!
//! Every expression evaluates to a `SymbolicValue`: a shape tag plus an
//! optional taint tag recording which source expression the value came
//! from. Shapes are deliberately coarse; only provenance matters.

use swc_ecma_ast::Stmt;

use crate::engine::scope::ScopeId;
use crate::report::Position;

/// Provenance of a tainted value: the canonical source expression and
/// where it was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTag {
    pub name: String,
    pub file: String,
    pub position: Position,
}

impl SourceTag {
    pub fn new(name: impl Into<String>, file: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            position,
        }
    }
}

/// A function literal captured at its definition site. The body is walked
/// again whenever a call site (or a callback rule) supplies arguments.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// Child scope created at definition; bindings persist across
    /// simulated calls.
    pub scope: ScopeId,
}

#[derive(Debug, Clone, Default)]
pub enum ValueKind {
    #[default]
    Undefined,
    /// String literals keep their quotes in `raw`.
    Literal {
        raw: String,
    },
    /// A bound name used without substituting its value.
    Identifier {
        name: String,
    },
    /// Canonical dotted/bracket path, e.g. `process.argv[2]`.
    MemberPath {
        path: String,
    },
    /// Ordered property shape from an object literal.
    Object {
        props: Vec<(String, SymbolicValue)>,
    },
    Array {
        elements: Vec<SymbolicValue>,
    },
    /// Result of a call that could not be evaluated away; `raw` is the
    /// canonical call string, e.g. `require('fs')`.
    CallResult {
        raw: String,
        callee: Box<SymbolicValue>,
        args: Vec<SymbolicValue>,
    },
    Function(FunctionValue),
    /// Binary, logical and conditional wrappers. No folding; taint from
    /// either side survives.
    Binary {
        op: String,
        left: Box<SymbolicValue>,
        right: Box<SymbolicValue>,
    },
    /// Free identifier with no binding anywhere on the scope chain.
    Unresolved {
        name: String,
    },
    /// Synthetic catch-clause parameter. Never tainted.
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolicValue {
    pub kind: ValueKind,
    pub taint: Option<SourceTag>,
}

impl SymbolicValue {
    pub fn new(kind: ValueKind) -> Self {
        Self { kind, taint: None }
    }

    pub fn undefined() -> Self {
        Self::new(ValueKind::Undefined)
    }

    pub fn literal(raw: impl Into<String>) -> Self {
        Self::new(ValueKind::Literal { raw: raw.into() })
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ValueKind::Identifier { name: name.into() })
    }

    pub fn member(path: impl Into<String>) -> Self {
        Self::new(ValueKind::MemberPath { path: path.into() })
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::new(ValueKind::Unresolved { name: name.into() })
    }

    pub fn object(props: Vec<(String, SymbolicValue)>) -> Self {
        Self::new(ValueKind::Object { props })
    }

    pub fn error() -> Self {
        Self::new(ValueKind::Error)
    }

    pub fn with_taint(mut self, tag: SourceTag) -> Self {
        self.taint = Some(tag);
        self
    }

    pub fn is_tainted(&self) -> bool {
        self.taint.is_some()
    }

    /// First-assigned tag wins; a value keeps a single source attribution.
    pub fn absorb_taint(&mut self, other: Option<&SourceTag>) {
        if self.taint.is_none() {
            self.taint = other.cloned();
        }
    }

    /// Canonical textual rendering used for rule matching and call strings.
    pub fn raw_name(&self) -> String {
        match &self.kind {
            ValueKind::Undefined => "undefined".to_string(),
            ValueKind::Literal { raw } => raw.clone(),
            ValueKind::Identifier { name } | ValueKind::Unresolved { name } => name.clone(),
            ValueKind::MemberPath { path } => path.clone(),
            ValueKind::Object { .. } => "Object".to_string(),
            ValueKind::Array { .. } => "Array".to_string(),
            ValueKind::CallResult { raw, .. } => raw.clone(),
            ValueKind::Function(func) => func
                .name
                .clone()
                .unwrap_or_else(|| "Function".to_string()),
            ValueKind::Binary { op, left, right } => {
                format!("({} {} {})", left.raw_name(), op, right.raw_name())
            }
            ValueKind::Error => "Error".to_string(),
        }
    }

    /// Rendering for call-signature memoization. Taint marks are included
    /// so a rule-seeded simulation is not shadowed by the eager untainted
    /// one.
    pub fn signature(&self) -> String {
        match &self.taint {
            Some(tag) => format!("{}!{}", self.raw_name(), tag.name),
            None => self.raw_name(),
        }
    }

    /// True for the name-shaped kinds that can be looked up in a scope.
    pub fn lookup_name(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Identifier { name } | ValueKind::Unresolved { name } => Some(name),
            ValueKind::MemberPath { path } => Some(path),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionValue> {
        match &self.kind {
            ValueKind::Function(func) => Some(func),
            _ => None,
        }
    }
}

/// Splits a canonical path on dots at paren/bracket depth zero, so
/// `require('a.b').c` yields two segments and `process.argv[2]` yields
/// `process` and `argv[2]`.
pub fn split_member_path(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in path.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    parts.push(&path[start..]);
    parts
}

/// Replaces the leading path segment, keeping everything after it.
pub fn replace_path_root(path: &str, new_root: &str) -> String {
    let root = split_member_path(path)[0];
    format!("{}{}", new_root, &path[root.len()..])
}
