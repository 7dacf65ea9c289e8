//! Pass 1: Scope Collector
//!
//! Walks the program once, in source order, and builds the scope tree:
//! - Pre-seeds the root scope with every built-in export
//! - Opens a scope for each block, function, `for` loop and comprehension
//! - Declares names as their declaring statement is reached
//! - Resolves every identifier eagerly against the scopes as they exist at
//!   that point; misses are re-checked after the walk to tell "never
//!   declared" from "declared later"

use std::collections::HashMap;

use crate::syntax::ast::*;
use crate::builtins::{ExportKind, Registry};
use crate::config::{Options, Redeclaration};
use crate::error::{Error, ErrorCode};
use super::Resolution;
use super::scope::{DeclKind, ScopeId, ScopeKind, ScopeTree};

/// An identifier that did not resolve when it was visited.
struct Deferred {
    name: String,
    scope: ScopeId,
    span: Span,
}

pub struct Collector<'a> {
    options: &'a Options,
    tree: ScopeTree,
    current: ScopeId,
    resolutions: HashMap<NodeId, Resolution>,
    deferred: Vec<Deferred>,
    pub errors: Vec<Error>,
}

impl<'a> Collector<'a> {
    pub fn new(program: &Program, registry: &Registry, options: &'a Options) -> Self {
        let mut tree = ScopeTree::new(program.id);
        for export in registry.exports() {
            tree.declare(ScopeTree::ROOT, export.name, DeclKind::Builtin(export.kind), Span::default());
        }
        Self {
            options,
            tree,
            current: ScopeTree::ROOT,
            resolutions: HashMap::new(),
            deferred: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn collect(mut self, program: &Program) -> (ScopeTree, HashMap<NodeId, Resolution>, Vec<Error>) {
        self.visit_block(&program.body);
        self.report_deferred();
        tracing::debug!(
            scopes = self.tree.len(),
            resolved = self.resolutions.len(),
            errors = self.errors.len(),
            "collected scopes",
        );
        (self.tree, self.resolutions, self.errors)
    }

    // ── Scopes ────────────────────────────────────────────────────────────────

    fn enter(&mut self, kind: ScopeKind, owner: NodeId) -> ScopeId {
        let saved = self.current;
        self.current = self.tree.push(kind, saved, owner);
        saved
    }

    fn leave(&mut self, saved: ScopeId) {
        self.current = saved;
    }

    fn declare(&mut self, ident: &Ident, kind: DeclKind) {
        let decl = self.tree.declare(self.current, &ident.name, kind, ident.span);
        self.resolutions.insert(ident.id, Resolution { scope: self.current, decl });
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn visit_block(&mut self, block: &Block) {
        let saved = self.enter(ScopeKind::Block, block.id);
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
        self.leave(saved);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => self.visit_expr(e),
            Stmt::Assign(a) => self.visit_assign(a),
            Stmt::FnDef(f) => self.visit_fn_def(f),
            Stmt::If(i) => {
                self.visit_expr(&i.condition);
                self.visit_block(&i.then_block);
                for branch in &i.branches {
                    if let Some(c) = &branch.condition { self.visit_expr(c); }
                    self.visit_block(&branch.block);
                }
            }
            Stmt::While(w) => {
                self.visit_expr(&w.condition);
                self.visit_block(&w.body);
            }
            Stmt::For(f) => {
                // the iterable cannot see the loop variable
                self.visit_expr(&f.iterable);
                let saved = self.enter(ScopeKind::For, f.id);
                self.declare(&f.var, DeclKind::LoopVar { node: f.id });
                self.visit_block(&f.body);
                self.leave(saved);
            }
            Stmt::Return(r) => {
                if let Some(v) = &r.value { self.visit_expr(v); }
            }
        }
    }

    fn visit_assign(&mut self, a: &Assign) {
        // the right-hand side only sees what was declared before this statement
        self.visit_expr(&a.value);

        let ident = match &a.target {
            Target::Name(ident) => ident,
            Target::Index { base, index, .. } => {
                self.visit_expr(base);
                self.visit_expr(index);
                return;
            }
        };

        let new_var = DeclKind::Variable { is_final: a.is_final, node: a.id, rebound: false };
        let Some((scope, decl)) = self.tree.lookup_assignable(self.current, &ident.name) else {
            self.declare(ident, new_var);
            return;
        };

        let existing = self.tree.decl(decl);
        if existing.is_builtin() {
            self.errors.push(Error::new(
                ErrorCode::S011,
                ident.span.line, ident.span.column,
                format!("cannot assign to built-in `{}`", ident.name),
            ));
        } else if existing.is_final() {
            self.errors.push(Error::new(
                ErrorCode::S005,
                ident.span.line, ident.span.column,
                format!("cannot assign to final variable `{}`", ident.name),
            ));
        } else if a.is_final || scope == self.current || existing.is_function() {
            // a fresh binding; uses from here on see its type
            self.declare(ident, new_var);
        } else if matches!(existing.kind, DeclKind::Variable { .. }) {
            // rebinding a variable of an enclosing block in the same function
            self.tree.mark_rebound(decl);
            self.resolutions.insert(ident.id, Resolution { scope, decl });
        } else {
            // parameters and loop variables keep their declaration
            self.resolutions.insert(ident.id, Resolution { scope, decl });
        }
    }

    fn visit_fn_def(&mut self, f: &FnDef) {
        let clash = self.tree.scope(self.current).get(&f.name.name)
            .filter(|&d| self.tree.decl(d).is_function())
            .or_else(|| {
                self.tree.lookup(self.current, &f.name.name)
                    .map(|(_, d)| d)
                    .filter(|&d| self.tree.decl(d).is_builtin())
            });

        match (clash, self.options.function_redeclaration) {
            (Some(d), Redeclaration::Error) => {
                let what = if self.tree.decl(d).is_builtin() { "a built-in" } else { "already declared in this scope" };
                self.errors.push(Error::new(
                    ErrorCode::S006,
                    f.name.span.line, f.name.span.column,
                    format!("function `{}` is {what}", f.name.name),
                ));
            }
            // declared before the body so the body can call itself
            _ => self.declare(&f.name, DeclKind::Function { node: f.id, arity: f.params.len() }),
        }

        let saved = self.enter(ScopeKind::Function, f.id);
        for (index, param) in f.params.iter().enumerate() {
            if self.tree.scope(self.current).get(&param.name).is_some() {
                self.errors.push(Error::new(
                    ErrorCode::S006,
                    param.span.line, param.span.column,
                    format!("parameter `{}` is declared twice", param.name),
                ));
            }
            self.declare(param, DeclKind::Parameter { index });
        }
        self.visit_block(&f.body);
        self.leave(saved);
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Bool(_) | ExprKind::Str(_) | ExprKind::None => {}
            ExprKind::Ident(name) => self.resolve(expr.id, name, expr.span),
            ExprKind::Binary { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(operand),
            ExprKind::Index { base, index } => {
                self.visit_expr(base);
                self.visit_expr(index);
            }
            ExprKind::Array(items) => items.iter().for_each(|i| self.visit_expr(i)),
            ExprKind::SizedArray(size) => self.visit_expr(size),
            ExprKind::Map(entries) => {
                for (k, v) in entries {
                    self.visit_expr(k);
                    self.visit_expr(v);
                }
            }
            ExprKind::Comprehension(c) => {
                self.visit_expr(&c.iterable);
                let saved = self.enter(ScopeKind::Comprehension, expr.id);
                self.declare(&c.var, DeclKind::ComprehensionVar { node: expr.id });
                if let Some(filter) = &c.filter { self.visit_expr(filter); }
                self.visit_expr(&c.element);
                self.leave(saved);
            }
            ExprKind::Call { callee, args } => {
                self.resolve(callee.id, &callee.name, callee.span);
                args.iter().for_each(|a| self.visit_expr(a));
            }
        }
    }

    fn resolve(&mut self, id: NodeId, name: &str, span: Span) {
        match self.tree.lookup(self.current, name) {
            Some((scope, decl)) => {
                self.resolutions.insert(id, Resolution { scope, decl });
            }
            None => self.deferred.push(Deferred { name: name.to_string(), scope: self.current, span }),
        }
    }

    /// Misses that resolve against the finished tree were used too early.
    fn report_deferred(&mut self) {
        for d in std::mem::take(&mut self.deferred) {
            let (code, message) = match self.tree.lookup(d.scope, &d.name) {
                Some(_) => (ErrorCode::S002, format!("`{}` is used before its declaration", d.name)),
                None    => (ErrorCode::S001, format!("could not resolve `{}`", d.name)),
            };
            self.errors.push(Error::new(code, d.span.line, d.span.column, message));
        }
    }
}
