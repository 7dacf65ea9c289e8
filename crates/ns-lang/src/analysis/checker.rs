//! Pass 2: Type Checker
//!
//! Registers one rule per expression (and per checked statement) with the
//! rule engine, then lets the engine settle them in dependency order.
//! Identifier types come from their declaration, so a use can be registered
//! before the assignment that types it.

use std::collections::HashMap;

use crate::syntax::ast::*;
use crate::builtins::ExportKind;
use crate::error::{Error, ErrorCode};
use crate::types::{Type, describe};
use super::Resolution;
use super::rules::{Attr, RuleEngine, Solution};
use super::scope::{DeclKind, ScopeTree};

pub struct TypeChecker<'a> {
    tree: &'a ScopeTree,
    resolutions: &'a HashMap<NodeId, Resolution>,
    engine: RuleEngine,
    errors: Vec<Error>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(tree: &'a ScopeTree, resolutions: &'a HashMap<NodeId, Resolution>) -> Self {
        Self { tree, resolutions, engine: RuleEngine::new(), errors: Vec::new() }
    }

    pub fn run(mut self, program: &Program) -> (Solution, Vec<Error>) {
        self.seed_declarations();
        self.visit_block(&program.body);

        let (solution, rule_errors) = self.engine.solve();
        self.errors.extend(rule_errors);
        (solution, self.errors)
    }

    /// Declarations whose type does not come from an expression.
    fn seed_declarations(&mut self) {
        for (id, decl) in self.tree.decls() {
            let ty = match &decl.kind {
                DeclKind::Builtin(ExportKind::Variable(ty)) => *ty,
                DeclKind::Variable { rebound: false, .. } => continue,
                _ => Type::Unknown,
            };
            self.engine.set(Attr::Decl(id), ty);
        }
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => self.visit_expr(e),
            Stmt::Assign(a) => self.visit_assign(a),
            Stmt::FnDef(f) => {
                self.engine.set(Attr::Node(f.id), Type::Unknown);
                self.visit_block(&f.body);
            }
            Stmt::If(i) => {
                self.visit_condition(&i.condition);
                self.visit_block(&i.then_block);
                for branch in &i.branches {
                    if let Some(c) = &branch.condition { self.visit_condition(c); }
                    self.visit_block(&branch.block);
                }
            }
            Stmt::While(w) => {
                self.visit_condition(&w.condition);
                self.visit_block(&w.body);
            }
            Stmt::For(f) => {
                self.visit_expr(&f.iterable);
                let span = f.iterable.span;
                self.engine.check(vec![Attr::Node(f.iterable.id)], span, move |t| {
                    expect(t[0], &[Type::Array], span, "`for` iterates over")
                });
                self.visit_block(&f.body);
            }
            Stmt::Return(r) => {
                if let Some(v) = &r.value { self.visit_expr(v); }
            }
        }
    }

    fn visit_condition(&mut self, cond: &Expr) {
        self.visit_expr(cond);
        let span = cond.span;
        self.engine.check(vec![Attr::Node(cond.id)], span, move |t| {
            expect(t[0], &[Type::Boolean], span, "a condition must be")
        });
    }

    fn visit_assign(&mut self, a: &Assign) {
        self.visit_expr(&a.value);
        let value = Attr::Node(a.value.id);
        self.engine.rule(vec![value], Some(Attr::Node(a.id)), a.span, |t| Ok(t[0]));

        match &a.target {
            Target::Name(ident) => {
                let Some(r) = self.resolutions.get(&ident.id) else { return };
                // only the assignment that introduced the variable types it
                if let DeclKind::Variable { node, rebound: false, .. } = self.tree.decl(r.decl).kind {
                    if node == a.id {
                        self.engine.rule(vec![value], Some(Attr::Decl(r.decl)), a.span, |t| Ok(t[0]));
                    }
                }
            }
            Target::Index { id, base, index, span } => {
                self.visit_expr(base);
                self.visit_expr(index);
                let span = *span;
                self.engine.rule(
                    vec![Attr::Node(base.id), Attr::Node(index.id)],
                    Some(Attr::Node(*id)),
                    span,
                    move |t| index_type(t[0], t[1], span),
                );
                let value_span = a.value.span;
                self.engine.check(vec![value, Attr::Node(*id)], value_span, move |t| {
                    if t[0].assignable_to(t[1]) {
                        Ok(())
                    } else {
                        Err(mismatch(value_span, format!("cannot store {} in an element of type {}", t[0], t[1])))
                    }
                });
            }
        }
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    fn visit_expr(&mut self, expr: &Expr) {
        let out = Some(Attr::Node(expr.id));
        let span = expr.span;

        match &expr.kind {
            ExprKind::Int(_)  => self.engine.set(Attr::Node(expr.id), Type::Integer),
            ExprKind::Bool(_) => self.engine.set(Attr::Node(expr.id), Type::Boolean),
            ExprKind::Str(_)  => self.engine.set(Attr::Node(expr.id), Type::String),
            ExprKind::None    => self.engine.set(Attr::Node(expr.id), Type::None),

            ExprKind::Ident(_) => match self.resolutions.get(&expr.id) {
                Some(r) => self.engine.rule(vec![Attr::Decl(r.decl)], out, span, |t| Ok(t[0])),
                // already reported by the collector
                None => self.engine.fail(Attr::Node(expr.id)),
            },

            ExprKind::Binary { op, left, right } => {
                self.visit_expr(left);
                self.visit_expr(right);
                let op = *op;
                self.engine.rule(vec![Attr::Node(left.id), Attr::Node(right.id)], out, span, move |t| {
                    binary_type(op, t[0], t[1], span)
                });
            }

            ExprKind::Unary { op, operand } => {
                self.visit_expr(operand);
                let op = *op;
                self.engine.rule(vec![Attr::Node(operand.id)], out, span, move |t| match op {
                    UnOp::Neg => expect(t[0], &[Type::Integer], span, "`-` negates")
                        .map(|()| Type::Integer),
                    UnOp::Not => expect(t[0], &[Type::Boolean], span, "`not` negates")
                        .map(|()| Type::Boolean),
                });
            }

            ExprKind::Index { base, index } => {
                self.visit_expr(base);
                self.visit_expr(index);
                self.engine.rule(vec![Attr::Node(base.id), Attr::Node(index.id)], out, span, move |t| {
                    index_type(t[0], t[1], span)
                });
            }

            // elements may differ in type
            ExprKind::Array(items) => {
                items.iter().for_each(|i| self.visit_expr(i));
                let deps = items.iter().map(|i| Attr::Node(i.id)).collect();
                self.engine.rule(deps, out, span, |_| Ok(Type::Array));
            }

            ExprKind::SizedArray(size) => {
                self.visit_expr(size);
                let size_span = size.span;
                self.engine.rule(vec![Attr::Node(size.id)], out, span, move |t| {
                    expect(t[0], &[Type::Integer], size_span, "an array size must be")
                        .map(|()| Type::Array)
                });
            }

            ExprKind::Map(entries) => {
                for (k, v) in entries {
                    self.visit_expr(k);
                    self.visit_expr(v);
                }
                let deps = entries.iter().map(|(k, _)| Attr::Node(k.id)).collect();
                let spans: Vec<Span> = entries.iter().map(|(k, _)| k.span).collect();
                self.engine.rule(deps, out, span, move |t| {
                    match t.iter().zip(&spans).find(|(ty, _)| !ty.is_key()) {
                        Some((ty, at)) => Err(mismatch(*at, format!(
                            "map keys must be strings, integers or booleans, found {ty}",
                        ))),
                        None => Ok(Type::Map),
                    }
                });
            }

            ExprKind::Comprehension(c) => {
                self.visit_expr(&c.iterable);
                if let Some(f) = &c.filter { self.visit_expr(f); }
                self.visit_expr(&c.element);

                let mut deps = vec![Attr::Node(c.iterable.id)];
                let iter_span = c.iterable.span;
                let filter_span = c.filter.as_ref().map(|f| {
                    deps.push(Attr::Node(f.id));
                    f.span
                });
                self.engine.rule(deps, out, span, move |t| {
                    expect(t[0], &[Type::Array], iter_span, "a list comprehension iterates over")?;
                    if let Some(at) = filter_span {
                        expect(t[1], &[Type::Boolean], at, "a comprehension filter must be")?;
                    }
                    Ok(Type::Array)
                });
            }

            ExprKind::Call { callee, args } => {
                args.iter().for_each(|a| self.visit_expr(a));
                self.visit_call(expr, callee, args);
            }
        }
    }

    fn visit_call(&mut self, expr: &Expr, callee: &Ident, args: &[Expr]) {
        let out = Attr::Node(expr.id);
        let Some(r) = self.resolutions.get(&callee.id) else {
            self.engine.fail(out);
            return;
        };
        let decl = self.tree.decl(r.decl);

        let (arity, signature) = match &decl.kind {
            DeclKind::Function { arity, .. } => (*arity, None),
            DeclKind::Builtin(ExportKind::Function(sig)) => (sig.arity(), Some(*sig)),
            _ => {
                self.errors.push(Error::new(
                    ErrorCode::S009,
                    callee.span.line, callee.span.column,
                    format!("`{}` is not a function", callee.name),
                ));
                self.engine.fail(out);
                return;
            }
        };

        if args.len() != arity {
            self.errors.push(Error::new(
                ErrorCode::S004,
                callee.span.line, callee.span.column,
                format!("`{}` expects {arity} argument(s), found {}", callee.name, args.len()),
            ));
            self.engine.fail(out);
            return;
        }

        // user functions are checked when they run
        let Some(sig) = signature else {
            self.engine.set(out, Type::Unknown);
            return;
        };

        let deps = args.iter().map(|a| Attr::Node(a.id)).collect();
        let spans: Vec<Span> = args.iter().map(|a| a.span).collect();
        let name = callee.name.clone();
        self.engine.rule(deps, Some(out), expr.span, move |t| {
            for ((ty, param), at) in t.iter().zip(sig.params).zip(&spans) {
                if !ty.accepts_any(param.accepts) {
                    return Err(mismatch(*at, format!(
                        "`{name}` expects {} for `{}`, found {ty}", describe(param.accepts), param.name,
                    )));
                }
            }
            Ok(sig.returns)
        });
    }
}

// ─── Typing rules ─────────────────────────────────────────────────────────────

fn mismatch(span: Span, message: impl Into<String>) -> Error {
    Error::new(ErrorCode::S003, span.line, span.column, message)
}

/// `ty` is one of `allowed` or unknown.
fn expect(ty: Type, allowed: &[Type], span: Span, what: &str) -> Result<(), Error> {
    if ty.accepts_any(allowed) {
        Ok(())
    } else {
        Err(mismatch(span, format!("{what} {}, found {ty}", describe(allowed))))
    }
}

fn binary_type(op: BinOp, l: Type, r: Type, span: Span) -> Result<Type, Error> {
    let either_unknown = l.is_unknown() || r.is_unknown();
    let fail = || Err(mismatch(span, format!("operator `{}` cannot combine {l} and {r}", op.symbol())));

    if op.is_equality() {
        return Ok(Type::Boolean);
    }
    if op.is_arithmetic() {
        return if either_unknown || (l == Type::Integer && r == Type::Integer) { Ok(Type::Integer) } else { fail() };
    }
    if op.is_ordering() {
        let comparable = l == r && matches!(l, Type::Integer | Type::String);
        return if either_unknown || comparable { Ok(Type::Boolean) } else { fail() };
    }
    // and / or
    if either_unknown || (l == Type::Boolean && r == Type::Boolean) { Ok(Type::Boolean) } else { fail() }
}

/// Element type of `base[index]`. Elements are never statically known.
fn index_type(base: Type, index: Type, span: Span) -> Result<Type, Error> {
    if index == Type::None {
        return Err(mismatch(span, "cannot index with None"));
    }
    match base {
        Type::Unknown | Type::Map => Ok(Type::Unknown),
        Type::Array if index.accepts_any(&[Type::Integer]) => Ok(Type::Unknown),
        Type::Array => Err(mismatch(span, format!("arrays are indexed only by integers, found {index}"))),
        other => Err(mismatch(span, format!("only arrays and maps can be indexed, found {other}"))),
    }
}
