//! Tree-walking interpreter over an analyzed program.
//! Name lookups follow the analyzer's resolutions; built-in calls are
//! dispatched through the library registry.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::syntax::ast::{self, BinOp, Block, Expr, ExprKind, FnDef, NodeId, Stmt, Target, UnOp};
use crate::analysis::{Analysis, DeclKind, ScopeTree};
use crate::builtins::{ExportKind, Registry, RuntimeState, reserve_array};
use crate::config::Options;
use crate::error::{RuntimeError, RuntimeErrorKind};
use super::storage::ScopeStorage;
use super::value::{FunctionRef, MapKey, Value};

/// Remaining native stack below which evaluation switches to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

pub struct Interpreter<'a, 'o> {
    program: &'a ast::Program,
    analysis: &'a Analysis,
    registry: &'a Registry,
    options: &'a Options,
    functions: HashMap<NodeId, &'a FnDef>,
    storage: Rc<ScopeStorage>,
    depth: usize,
    /// Set by `return`; blocks stop executing while it is present.
    return_value: Option<Value>,
    state: RuntimeState<'o>,
}

impl<'a, 'o> Interpreter<'a, 'o> {
    pub fn new(
        program: &'a ast::Program,
        analysis: &'a Analysis,
        registry: &'a Registry,
        options: &'a Options,
        state: RuntimeState<'o>,
    ) -> Self {
        let mut functions = HashMap::new();
        index_functions(&program.body, &mut functions);

        // built-in constants live in the root frame
        let root = ScopeStorage::root(ScopeTree::ROOT);
        let tree = &analysis.scopes;
        for &id in tree.scope(ScopeTree::ROOT).declarations() {
            let decl = tree.decl(id);
            if let DeclKind::Builtin(ExportKind::Variable(_)) = decl.kind {
                if let Some(v) = registry.get_constant(&decl.name, &state) {
                    root.set(&decl.name, v);
                }
            }
        }

        Self {
            program,
            analysis,
            registry,
            options,
            functions,
            storage: root,
            depth: 0,
            return_value: None,
            state,
        }
    }

    // ─── Entry point ──────────────────────────────────────────────────────────

    /// Run the program; its value is the value of the last top-level statement.
    pub fn run(&mut self) -> Result<Value, RuntimeError> {
        let program = self.program;
        let result = self.exec_block(&program.body)?;
        // top-level `return` ends the program with its value
        Ok(self.return_value.take().unwrap_or(result))
    }

    // ─── Frames ───────────────────────────────────────────────────────────────

    /// Run `f` with `frame` as the current storage; the previous storage is
    /// restored on every exit path, errors included.
    fn in_frame<T>(
        &mut self,
        frame: Rc<ScopeStorage>,
        f: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let saved = std::mem::replace(&mut self.storage, frame);
        let result = f(self);
        self.storage = saved;
        result
    }

    fn scope_of(&self, owner: NodeId) -> usize {
        self.analysis.scopes.scope_of(owner).unwrap_or(self.storage.scope)
    }

    fn frame_for(&self, scope: usize, name: &str, line: usize) -> Result<Rc<ScopeStorage>, RuntimeError> {
        self.storage.frame_for(scope)
            .ok_or_else(|| RuntimeError::new(line, RuntimeErrorKind::UnboundVariable(name.to_string())))
    }

    // ─── Statements ───────────────────────────────────────────────────────────

    fn exec_block(&mut self, block: &'a Block) -> Result<Value, RuntimeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.exec_block_inner(block))
    }

    fn exec_block_inner(&mut self, block: &'a Block) -> Result<Value, RuntimeError> {
        let frame = ScopeStorage::child(&self.storage, self.scope_of(block.id));
        self.in_frame(frame, |this| {
            let mut last = Value::None;
            for stmt in &block.stmts {
                last = this.exec_stmt(stmt)?;
                if this.return_value.is_some() { break; }
            }
            Ok(last)
        })
    }

    fn exec_stmt(&mut self, stmt: &'a Stmt) -> Result<Value, RuntimeError> {
        match stmt {
            Stmt::Expr(e) => self.eval_expr(e),

            Stmt::Assign(a) => {
                let value = self.eval_expr(&a.value)?;
                match &a.target {
                    Target::Name(ident) => {
                        let Some(r) = self.analysis.resolution(ident.id) else {
                            return Err(RuntimeError::new(a.span.line, RuntimeErrorKind::UnboundVariable(ident.name.clone())));
                        };
                        self.frame_for(r.scope, &ident.name, a.span.line)?.set(&ident.name, value.clone());
                        Ok(value)
                    }
                    Target::Index { base, index, span, .. } => {
                        let base = self.eval_expr(base)?;
                        let index = self.eval_expr(index)?;
                        store_index(&base, &index, value, span.line)?;
                        Ok(Value::None)
                    }
                }
            }

            Stmt::If(i) => {
                if self.eval_condition(&i.condition)? {
                    self.exec_block(&i.then_block)?;
                    return Ok(Value::None);
                }
                for branch in &i.branches {
                    let taken = match &branch.condition {
                        Some(c) => self.eval_condition(c)?,
                        None => true,
                    };
                    if taken {
                        self.exec_block(&branch.block)?;
                        break;
                    }
                }
                Ok(Value::None)
            }

            Stmt::While(w) => {
                while self.eval_condition(&w.condition)? {
                    self.exec_block(&w.body)?;
                    if self.return_value.is_some() { break; }
                }
                Ok(Value::None)
            }

            Stmt::For(f) => {
                let items = match self.eval_expr(&f.iterable)? {
                    // iterate a snapshot so the body may modify the array
                    Value::Array(items) => items.borrow().clone(),
                    other => return Err(RuntimeError::type_error(f.span.line, format!(
                        "`for` iterates over an array, got {}", other.type_name(),
                    ))),
                };
                let frame = ScopeStorage::child(&self.storage, self.scope_of(f.id));
                self.in_frame(frame, |this| {
                    for item in items {
                        this.storage.set(&f.var.name, item);
                        this.exec_block(&f.body)?;
                        if this.return_value.is_some() { break; }
                    }
                    Ok(())
                })?;
                Ok(Value::None)
            }

            // functions are looked up through their declaration when called
            Stmt::FnDef(_) => Ok(Value::None),

            Stmt::Return(r) => {
                let value = match &r.value {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::None,
                };
                self.return_value = Some(value);
                Ok(Value::None)
            }
        }
    }

    fn eval_condition(&mut self, cond: &'a Expr) -> Result<bool, RuntimeError> {
        match self.eval_expr(cond)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::type_error(cond.span.line, format!(
                "a condition must be a bool, got {}", other.type_name(),
            ))),
        }
    }

    // ─── Expression evaluator ─────────────────────────────────────────────────

    /// Evaluate `expr`, growing the native stack first when it runs low.
    pub fn eval_expr(&mut self, expr: &'a Expr) -> Result<Value, RuntimeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_expr_inner(expr))
    }

    fn eval_expr_inner(&mut self, expr: &'a Expr) -> Result<Value, RuntimeError> {
        let line = expr.span.line;
        match &expr.kind {
            ExprKind::Int(n)  => Ok(Value::Int(*n)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Str(s)  => Ok(Value::Str(s.clone())),
            ExprKind::None    => Ok(Value::None),

            ExprKind::Ident(name) => self.lookup(expr.id, name, line),

            ExprKind::Binary { op: op @ (BinOp::And | BinOp::Or), left, right } => {
                // short-circuit: the right side runs only when it decides the result
                let l = self.eval_bool(left, *op)?;
                if (*op == BinOp::And && !l) || (*op == BinOp::Or && l) {
                    return Ok(Value::Bool(l));
                }
                Ok(Value::Bool(self.eval_bool(right, *op)?))
            }

            ExprKind::Binary { op, left, right } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                eval_binop(*op, &l, &r, line)
            }

            ExprKind::Unary { op, operand } => {
                let v = self.eval_expr(operand)?;
                match (op, v) {
                    (UnOp::Neg, Value::Int(n))  => Ok(Value::Int(n.wrapping_neg())),
                    (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnOp::Neg, other) => Err(RuntimeError::type_error(line, format!("cannot negate {}", other.type_name()))),
                    (UnOp::Not, other) => Err(RuntimeError::type_error(line, format!("`not` needs a bool, got {}", other.type_name()))),
                }
            }

            ExprKind::Index { base, index } => {
                let base = self.eval_expr(base)?;
                let index = self.eval_expr(index)?;
                index_value(&base, &index, line)
            }

            ExprKind::Array(items) => {
                let vals: Result<Vec<_>, _> = items.iter().map(|e| self.eval_expr(e)).collect();
                Ok(Value::array(vals?))
            }

            ExprKind::SizedArray(size) => match self.eval_expr(size)? {
                Value::Int(n) if n >= 0 => {
                    let mut items = reserve_array(n, line)?;
                    items.resize(n as usize, Value::None);
                    Ok(Value::array(items))
                }
                Value::Int(n) => Err(RuntimeError::type_error(line, format!("array size cannot be negative, got {n}"))),
                other => Err(RuntimeError::type_error(line, format!("an array size must be an int, got {}", other.type_name()))),
            },

            ExprKind::Map(entries) => {
                let mut map = BTreeMap::new();
                for (k, v) in entries {
                    let key = self.eval_expr(k)?;
                    let key = map_key(&key, k.span.line)?;
                    map.insert(key, self.eval_expr(v)?);
                }
                Ok(Value::map(map))
            }

            ExprKind::Comprehension(c) => {
                let items = match self.eval_expr(&c.iterable)? {
                    Value::Array(items) => items.borrow().clone(),
                    other => return Err(RuntimeError::type_error(line, format!(
                        "a list comprehension iterates over an array, got {}", other.type_name(),
                    ))),
                };
                let frame = ScopeStorage::child(&self.storage, self.scope_of(expr.id));
                let out = self.in_frame(frame, |this| {
                    let mut out = Vec::new();
                    for item in items {
                        this.storage.set(&c.var.name, item);
                        let keep = match &c.filter {
                            Some(f) => this.eval_condition(f)?,
                            None => true,
                        };
                        if keep {
                            out.push(this.eval_expr(&c.element)?);
                        }
                    }
                    Ok(out)
                })?;
                Ok(Value::array(out))
            }

            ExprKind::Call { callee, args } => {
                let arg_vals: Vec<Value> = args.iter()
                    .map(|a| self.eval_expr(a))
                    .collect::<Result<_, _>>()?;
                self.eval_call(&callee.name, callee.id, arg_vals, line)
            }
        }
    }

    fn eval_bool(&mut self, expr: &'a Expr, op: BinOp) -> Result<bool, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::type_error(expr.span.line, format!(
                "operator `{}` needs bools, got {}", op.symbol(), other.type_name(),
            ))),
        }
    }

    fn lookup(&self, node: NodeId, name: &str, line: usize) -> Result<Value, RuntimeError> {
        let unbound = || RuntimeError::new(line, RuntimeErrorKind::UnboundVariable(name.to_string()));
        let r = self.analysis.resolution(node).ok_or_else(unbound)?;
        match self.analysis.scopes.decl(r.decl).kind {
            DeclKind::Function { .. } => Ok(Value::Function(FunctionRef { name: name.to_string(), decl: r.decl })),
            DeclKind::Builtin(ExportKind::Function(_)) => Ok(Value::Builtin(name.to_string())),
            _ => self.frame_for(r.scope, name, line)?.get(name).ok_or_else(unbound),
        }
    }

    // ─── Call dispatch ────────────────────────────────────────────────────────

    fn eval_call(
        &mut self,
        name: &str,
        callee: NodeId,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        let Some(r) = self.analysis.resolution(callee) else {
            return Err(RuntimeError::new(line, RuntimeErrorKind::UnboundVariable(name.to_string())));
        };

        match self.analysis.scopes.decl(r.decl).kind {
            DeclKind::Function { node, .. } => self.call_user(node, args, line),
            DeclKind::Builtin(ExportKind::Function(_)) => {
                self.registry.call_any(name, &args, &mut self.state, line)?
                    .ok_or_else(|| RuntimeError::type_error(line, format!("no library provides `{name}`")))
            }
            _ => Err(RuntimeError::type_error(line, format!("`{name}` is not a function"))),
        }
    }

    /// Calls run in a frame chained to the frame of the scope that declared
    /// the function, not to the caller's.
    fn call_user(&mut self, node: NodeId, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
        let Some(&f) = self.functions.get(&node) else {
            return Err(RuntimeError::type_error(line, "call to a function with no definition"));
        };
        if args.len() != f.params.len() {
            return Err(RuntimeError::type_error(line, format!(
                "`{}` expects {} argument(s), got {}", f.name.name, f.params.len(), args.len(),
            )));
        }
        if self.depth >= self.options.max_call_depth {
            return Err(RuntimeError::new(line, RuntimeErrorKind::RecursionLimit(self.options.max_call_depth)));
        }

        let fn_scope = self.scope_of(f.id);
        let declaring = self.analysis.scopes.parent(fn_scope).unwrap_or(ScopeTree::ROOT);
        let frame = ScopeStorage::child(&self.frame_for(declaring, &f.name.name, line)?, fn_scope);
        for (param, value) in f.params.iter().zip(args) {
            frame.set(&param.name, value);
        }

        tracing::debug!(function = %f.name.name, depth = self.depth, "call");
        self.depth += 1;
        let result = self.in_frame(frame, |this| this.exec_block(&f.body));
        self.depth -= 1;
        result?;

        Ok(self.return_value.take().unwrap_or(Value::None))
    }
}

// ─── Function index ───────────────────────────────────────────────────────────

fn index_functions<'a>(block: &'a Block, out: &mut HashMap<NodeId, &'a FnDef>) {
    for stmt in &block.stmts {
        match stmt {
            Stmt::FnDef(f) => {
                out.insert(f.id, f);
                index_functions(&f.body, out);
            }
            Stmt::If(i) => {
                index_functions(&i.then_block, out);
                for b in &i.branches { index_functions(&b.block, out); }
            }
            Stmt::While(w) => index_functions(&w.body, out),
            Stmt::For(f) => index_functions(&f.body, out),
            Stmt::Expr(_) | Stmt::Assign(_) | Stmt::Return(_) => {}
        }
    }
}

// ─── Operators ────────────────────────────────────────────────────────────────

fn eval_binop(op: BinOp, l: &Value, r: &Value, line: usize) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Eq    => return Ok(Value::Bool(l == r)),
        BinOp::NotEq => return Ok(Value::Bool(l != r)),
        _ => {}
    }

    if op.is_ordering() {
        let ord = match (l, r) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => return Err(operand_error(op, l, r, line)),
        };
        return Ok(Value::Bool(match op {
            BinOp::Lt   => ord.is_lt(),
            BinOp::LtEq => ord.is_le(),
            BinOp::Gt   => ord.is_gt(),
            _           => ord.is_ge(),
        }));
    }

    let (Value::Int(a), Value::Int(b)) = (l, r) else {
        return Err(operand_error(op, l, r, line));
    };
    let (a, b) = (*a, *b);
    let v = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 { return Err(RuntimeError::new(line, RuntimeErrorKind::DivideByZero)); }
            a.wrapping_div(b)
        }
        BinOp::Mod => {
            if b == 0 { return Err(RuntimeError::new(line, RuntimeErrorKind::ModuloByZero)); }
            a.wrapping_rem(b)
        }
        _ => return Err(operand_error(op, l, r, line)),
    };
    Ok(Value::Int(v))
}

fn operand_error(op: BinOp, l: &Value, r: &Value, line: usize) -> RuntimeError {
    RuntimeError::type_error(line, format!(
        "operator `{}` cannot combine {} and {}", op.symbol(), l.type_name(), r.type_name(),
    ))
}

// ─── Indexing ─────────────────────────────────────────────────────────────────

fn map_key(v: &Value, line: usize) -> Result<MapKey, RuntimeError> {
    MapKey::from_value(v).ok_or_else(|| RuntimeError::new(line, RuntimeErrorKind::InvalidKey(format!(
        "{} cannot be a map key", v.type_name(),
    ))))
}

fn array_slot(index: &Value, len: usize, line: usize) -> Result<usize, RuntimeError> {
    let Value::Int(i) = index else {
        return Err(RuntimeError::type_error(line, format!(
            "arrays are indexed only by integers, got {}", index.type_name(),
        )));
    };
    if *i < 0 || *i as usize >= len {
        return Err(RuntimeError::new(line, RuntimeErrorKind::IndexOutOfRange { index: *i, len }));
    }
    Ok(*i as usize)
}

fn index_value(base: &Value, index: &Value, line: usize) -> Result<Value, RuntimeError> {
    match base {
        Value::Array(items) => {
            let items = items.borrow();
            let i = array_slot(index, items.len(), line)?;
            Ok(items[i].clone())
        }
        Value::Map(entries) => {
            let key = map_key(index, line)?;
            entries.borrow().get(&key).cloned().ok_or_else(|| {
                RuntimeError::new(line, RuntimeErrorKind::InvalidKey(format!("{key} is not in the map")))
            })
        }
        Value::None => Err(RuntimeError::new(line, RuntimeErrorKind::NullReference("cannot index None".into()))),
        other => Err(RuntimeError::type_error(line, format!(
            "only arrays and maps can be indexed, got {}", other.type_name(),
        ))),
    }
}

fn store_index(base: &Value, index: &Value, value: Value, line: usize) -> Result<(), RuntimeError> {
    match base {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let i = array_slot(index, items.len(), line)?;
            items[i] = value;
            Ok(())
        }
        Value::Map(entries) => {
            let key = map_key(index, line)?;
            entries.borrow_mut().insert(key, value);
            Ok(())
        }
        Value::None => Err(RuntimeError::new(line, RuntimeErrorKind::NullReference("cannot assign into None".into()))),
        other => Err(RuntimeError::type_error(line, format!(
            "only arrays and maps can be assigned into, got {}", other.type_name(),
        ))),
    }
}
