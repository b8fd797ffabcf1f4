//! Lexical scope tree
//!
//! Arena-allocated tree of scopes. Lookup walks the parent chain; a miss is
//! a valid terminal meaning "free/global identifier". Assignment writes into
//! the scope that already owns the name, hoisting undeclared names to the
//! nearest function or global scope.

use std::collections::{HashMap, HashSet};

use id_arena::{Arena, Id};

use crate::engine::value::SymbolicValue;

pub type ScopeId = Id<Scope>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    Catch,
}

impl ScopeKind {
    /// Scopes that receive undeclared-assignment hoisting.
    fn is_hoist_target(self) -> bool {
        matches!(self, ScopeKind::Global | ScopeKind::Function)
    }
}

#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub depth: u32,
    bindings: HashMap<String, SymbolicValue>,
    /// Call signatures already simulated against functions defined here.
    /// Bounds eager re-simulation of recursive function literals.
    call_memo: HashSet<String>,
}

impl Scope {
    pub fn binding(&self, name: &str) -> Option<&SymbolicValue> {
        self.bindings.get(name)
    }

    pub fn binding_mut(&mut self, name: &str) -> Option<&mut SymbolicValue> {
        self.bindings.get_mut(name)
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn set_binding(&mut self, name: impl Into<String>, value: SymbolicValue) {
        self.bindings.insert(name.into(), value);
    }
}

#[derive(Debug)]
pub struct ScopeTree {
    arena: Arena<Scope>,
    root: ScopeId,
}

impl ScopeTree {
    /// Creates the tree with its global root scope.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc_with_id(|id| Scope {
            id,
            parent: None,
            kind: ScopeKind::Global,
            depth: 0,
            bindings: HashMap::new(),
            call_memo: HashSet::new(),
        });
        Self { arena, root }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn create_child(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let depth = self.arena[parent].depth + 1;
        self.arena.alloc_with_id(|id| Scope {
            id,
            parent: Some(parent),
            kind,
            depth,
            bindings: HashMap::new(),
            call_memo: HashSet::new(),
        })
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.arena[id]
    }

    /// Walks the parent chain for a binding. `None` means the name is free.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&SymbolicValue> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.arena[id];
            if let Some(value) = scope.binding(name) {
                return Some(value);
            }
            current = scope.parent;
        }
        None
    }

    /// The scope on the chain that already owns `name`, if any.
    pub fn defining_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.arena[id];
            if scope.has_binding(name) {
                return Some(id);
            }
            current = scope.parent;
        }
        None
    }

    /// Nearest enclosing function or global scope.
    pub fn hoist_target(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let s = &self.arena[current];
            if s.kind.is_hoist_target() {
                return current;
            }
            match s.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Declaration binding: writes into the given scope directly.
    pub fn bind_local(&mut self, scope: ScopeId, name: impl Into<String>, value: SymbolicValue) {
        self.arena[scope].set_binding(name, value);
    }

    /// Assignment binding: search-then-write. The defining scope wins;
    /// an undeclared name hoists to the nearest function/global scope.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: SymbolicValue) -> ScopeId {
        let target = self
            .defining_scope(scope, name)
            .unwrap_or_else(|| self.hoist_target(scope));
        self.arena[target].set_binding(name, value);
        target
    }

    /// Records a call signature in the scope owning the function. Returns
    /// false when the signature was already simulated.
    pub fn memoize_call(&mut self, scope: ScopeId, signature: String) -> bool {
        self.arena[scope].call_memo.insert(signature)
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_scope_is_global() {
        let tree = ScopeTree::new();
        assert_eq!(tree.get(tree.root()).kind, ScopeKind::Global);
        assert_eq!(tree.get(tree.root()).depth, 0);
    }

    #[test]
    fn child_scope_tracks_parent_and_depth() {
        let mut tree = ScopeTree::new();
        let func = tree.create_child(tree.root(), ScopeKind::Function);
        let block = tree.create_child(func, ScopeKind::Block);

        assert_eq!(tree.get(func).parent, Some(tree.root()));
        assert_eq!(tree.get(block).depth, 2);
    }

    #[test]
    fn lookup_finds_local_binding() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.bind_local(root, "x", SymbolicValue::literal("1"));

        assert!(tree.lookup(root, "x").is_some());
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.bind_local(root, "x", SymbolicValue::literal("1"));
        let inner = tree.create_child(root, ScopeKind::Function);

        assert!(tree.lookup(inner, "x").is_some());
    }

    #[test]
    fn lookup_miss_is_none() {
        let tree = ScopeTree::new();
        assert!(tree.lookup(tree.root(), "ghost").is_none());
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.bind_local(root, "x", SymbolicValue::literal("1"));
        let inner = tree.create_child(root, ScopeKind::Function);
        tree.bind_local(inner, "x", SymbolicValue::literal("2"));

        let value = tree.lookup(inner, "x").unwrap();
        assert_eq!(value.raw_name(), "2");
    }

    #[test]
    fn block_binding_invisible_to_parent() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let block = tree.create_child(root, ScopeKind::Block);
        tree.bind_local(block, "x", SymbolicValue::literal("1"));

        assert!(tree.lookup(root, "x").is_none());
    }

    #[test]
    fn assign_writes_into_defining_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.bind_local(root, "x", SymbolicValue::literal("1"));
        let inner = tree.create_child(root, ScopeKind::Function);

        let target = tree.assign(inner, "x", SymbolicValue::literal("2"));

        assert_eq!(target, root);
        assert_eq!(tree.lookup(root, "x").unwrap().raw_name(), "2");
    }

    #[test]
    fn assign_hoists_undeclared_past_blocks() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let func = tree.create_child(root, ScopeKind::Function);
        let block = tree.create_child(func, ScopeKind::Block);

        let target = tree.assign(block, "implicit", SymbolicValue::literal("1"));

        assert_eq!(target, func);
        assert!(tree.lookup(func, "implicit").is_some());
        assert!(tree.get(block).binding("implicit").is_none());
    }

    #[test]
    fn memoize_call_rejects_duplicates() {
        let mut tree = ScopeTree::new();
        let root = tree.root();

        assert!(tree.memoize_call(root, "f(x)".to_string()));
        assert!(!tree.memoize_call(root, "f(x)".to_string()));
        assert!(tree.memoize_call(root, "f(y)".to_string()));
    }
}
