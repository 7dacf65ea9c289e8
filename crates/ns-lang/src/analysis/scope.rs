use std::collections::HashMap;

use crate::builtins::ExportKind;
use crate::syntax::ast::{NodeId, Span};

pub type ScopeId = usize;
pub type DeclId = usize;

// ─── Declaration ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// Introduced by an assignment; `node` is the `Assign` that created it.
    /// `rebound` is set once a nested block of the same function assigns it
    /// again, after which its static type is unknown.
    Variable { is_final: bool, node: NodeId, rebound: bool },
    Parameter { index: usize },
    /// `node` is the `FnDef`.
    Function { node: NodeId, arity: usize },
    /// `node` is the `ForStmt`.
    LoopVar { node: NodeId },
    /// `node` is the comprehension expression.
    ComprehensionVar { node: NodeId },
    Builtin(ExportKind),
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub span: Span,
    pub scope: ScopeId,
}

impl Declaration {
    pub fn is_final(&self) -> bool {
        matches!(self.kind, DeclKind::Variable { is_final: true, .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, DeclKind::Function { .. } | DeclKind::Builtin(ExportKind::Function(_)))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.kind, DeclKind::Builtin(_))
    }
}

// ─── Scope ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Built-ins only; owned by the program node.
    Root,
    Block,
    /// Parameters of one `def`.
    Function,
    /// The loop variable of one `for`.
    For,
    /// The loop variable of one list comprehension.
    Comprehension,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub owner: NodeId,
    names: HashMap<String, DeclId>,
    order: Vec<DeclId>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>, owner: NodeId) -> Self {
        Self { kind, parent, owner, names: HashMap::new(), order: Vec::new() }
    }

    /// The declaration a new use of `name` in this scope would see.
    pub fn get(&self, name: &str) -> Option<DeclId> {
        self.names.get(name).copied()
    }

    /// Every declaration ever made here, in declaration order, including ones
    /// that a later declaration of the same name replaced.
    pub fn declarations(&self) -> &[DeclId] {
        &self.order
    }
}

// ─── ScopeTree ────────────────────────────────────────────────────────────────

/// Arena of scopes mirroring the lexical nesting of a program. Scope `0` is
/// the root.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    decls: Vec<Declaration>,
    owners: HashMap<NodeId, ScopeId>,
}

impl ScopeTree {
    pub const ROOT: ScopeId = 0;

    pub fn new(root_owner: NodeId) -> Self {
        let mut owners = HashMap::new();
        owners.insert(root_owner, Self::ROOT);
        Self { scopes: vec![Scope::new(ScopeKind::Root, None, root_owner)], decls: Vec::new(), owners }
    }

    pub fn push(&mut self, kind: ScopeKind, parent: ScopeId, owner: NodeId) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(kind, Some(parent), owner));
        self.owners.insert(owner, id);
        id
    }

    /// Insert or overwrite `name` in `scope`. Later lookups from this point of
    /// the walk see the new declaration.
    pub fn declare(&mut self, scope: ScopeId, name: &str, kind: DeclKind, span: Span) -> DeclId {
        let id = self.decls.len();
        self.decls.push(Declaration { name: name.to_string(), kind, span, scope });
        let s = &mut self.scopes[scope];
        s.names.insert(name.to_string(), id);
        s.order.push(id);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id]
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes.iter().enumerate()
    }

    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// The scope a node opened, if it opens one.
    pub fn scope_of(&self, owner: NodeId) -> Option<ScopeId> {
        self.owners.get(&owner).copied()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id].parent
    }

    /// Walk `scope` then its ancestors; the first declaration of `name` wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, DeclId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(decl) = self.scopes[id].get(name) {
                return Some((id, decl));
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// Like [`lookup`](Self::lookup), but an assignment inside a function
    /// never reaches past that function's parameter scope.
    pub fn lookup_assignable(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, DeclId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id];
            if let Some(decl) = s.get(name) {
                return Some((id, decl));
            }
            if s.kind == ScopeKind::Function {
                return None;
            }
            current = s.parent;
        }
        None
    }

    /// Innermost function scope enclosing `scope`, inclusive.
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scopes[id].kind == ScopeKind::Function {
                return Some(id);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// `ancestor` is `scope` or one of its parents.
    pub fn is_within(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == ancestor { return true; }
            current = self.scopes[id].parent;
        }
        false
    }

    pub(crate) fn mark_rebound(&mut self, decl: DeclId) {
        if let DeclKind::Variable { rebound, .. } = &mut self.decls[decl].kind {
            *rebound = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(node: NodeId) -> DeclKind {
        DeclKind::Variable { is_final: false, node, rebound: false }
    }

    #[test]
    fn lookup_walks_parents() {
        let mut t = ScopeTree::new(0);
        let block = t.push(ScopeKind::Block, ScopeTree::ROOT, 1);
        let inner = t.push(ScopeKind::Block, block, 2);
        let d = t.declare(block, "x", var(10), Span::default());
        assert_eq!(t.lookup(inner, "x"), Some((block, d)));
        assert_eq!(t.lookup(ScopeTree::ROOT, "x"), None);
    }

    #[test]
    fn redeclaration_replaces_for_later_lookups() {
        let mut t = ScopeTree::new(0);
        let first = t.declare(ScopeTree::ROOT, "x", var(1), Span::default());
        let second = t.declare(ScopeTree::ROOT, "x", var(2), Span::default());
        assert_ne!(first, second);
        assert_eq!(t.lookup(ScopeTree::ROOT, "x"), Some((ScopeTree::ROOT, second)));
        assert_eq!(t.scope(ScopeTree::ROOT).declarations(), &[first, second]);
    }

    #[test]
    fn inner_declaration_shadows() {
        let mut t = ScopeTree::new(0);
        let outer = t.declare(ScopeTree::ROOT, "x", var(1), Span::default());
        let block = t.push(ScopeKind::Block, ScopeTree::ROOT, 5);
        let inner = t.declare(block, "x", var(2), Span::default());
        assert_eq!(t.lookup(block, "x"), Some((block, inner)));
        assert_eq!(t.lookup(ScopeTree::ROOT, "x"), Some((ScopeTree::ROOT, outer)));
    }

    #[test]
    fn assignable_lookup_stops_at_function() {
        let mut t = ScopeTree::new(0);
        let top = t.push(ScopeKind::Block, ScopeTree::ROOT, 1);
        t.declare(top, "x", var(2), Span::default());
        let func = t.push(ScopeKind::Function, top, 3);
        let body = t.push(ScopeKind::Block, func, 4);
        assert!(t.lookup(body, "x").is_some());
        assert_eq!(t.lookup_assignable(body, "x"), None);

        let p = t.declare(func, "p", DeclKind::Parameter { index: 0 }, Span::default());
        assert_eq!(t.lookup_assignable(body, "p"), Some((func, p)));
    }

    #[test]
    fn owners_map_to_scopes() {
        let mut t = ScopeTree::new(7);
        let s = t.push(ScopeKind::For, ScopeTree::ROOT, 9);
        assert_eq!(t.scope_of(7), Some(ScopeTree::ROOT));
        assert_eq!(t.scope_of(9), Some(s));
        assert_eq!(t.scope_of(8), None);
        assert_eq!(t.parent(s), Some(ScopeTree::ROOT));
    }

    #[test]
    fn enclosing_function() {
        let mut t = ScopeTree::new(0);
        let func = t.push(ScopeKind::Function, ScopeTree::ROOT, 1);
        let body = t.push(ScopeKind::Block, func, 2);
        let nested = t.push(ScopeKind::For, body, 3);
        assert_eq!(t.enclosing_function(nested), Some(func));
        assert_eq!(t.enclosing_function(ScopeTree::ROOT), None);
        assert!(t.is_within(nested, func));
        assert!(!t.is_within(func, nested));
    }

    #[test]
    fn rebound_marks_variables_only() {
        let mut t = ScopeTree::new(0);
        let d = t.declare(ScopeTree::ROOT, "x", var(1), Span::default());
        t.mark_rebound(d);
        assert!(matches!(t.decl(d).kind, DeclKind::Variable { rebound: true, .. }));
    }
}
