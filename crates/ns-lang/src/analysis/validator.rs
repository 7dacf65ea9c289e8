//! Pass 3: Structural Validator
//!
//! Checks that don't involve names or types:
//! - `return` only inside a function body
//! - no `elsif` or `else` clause after an `else`

use crate::syntax::ast::*;
use crate::error::{Error, ErrorCode};

pub struct Validator {
    fn_depth: usize,
    pub errors: Vec<Error>,
}

impl Validator {
    pub fn new() -> Self {
        Self { fn_depth: 0, errors: Vec::new() }
    }

    pub fn validate(mut self, program: &Program) -> Vec<Error> {
        self.visit_block(&program.body);
        self.errors
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Return(r) if self.fn_depth == 0 => {
                self.errors.push(Error::new(
                    ErrorCode::S007, r.span.line, r.span.column,
                    "cannot return outside function",
                ));
            }
            Stmt::FnDef(f) => {
                self.fn_depth += 1;
                self.visit_block(&f.body);
                self.fn_depth -= 1;
            }
            Stmt::If(i) => {
                self.check_clause_order(i);
                self.visit_block(&i.then_block);
                for branch in &i.branches {
                    self.visit_block(&branch.block);
                }
            }
            Stmt::While(w) => self.visit_block(&w.body),
            Stmt::For(f) => self.visit_block(&f.body),
            Stmt::Expr(_) | Stmt::Assign(_) | Stmt::Return(_) => {}
        }
    }

    fn check_clause_order(&mut self, stmt: &IfStmt) {
        let mut seen_else = false;
        for branch in &stmt.branches {
            if seen_else {
                let clause = if branch.condition.is_some() { "elsif" } else { "else" };
                self.errors.push(Error::new(
                    ErrorCode::S008, branch.span.line, branch.span.column,
                    format!("`{clause}` cannot follow `else`"),
                ));
            }
            seen_else |= branch.condition.is_none();
        }
    }
}

impl Default for Validator {
    fn default() -> Self { Self::new() }
}
