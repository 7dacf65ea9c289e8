pub mod scope;
pub mod collector;
pub mod rules;
pub mod checker;
pub mod validator;


use std::collections::HashMap;

use crate::syntax::ast::{self, NodeId};
use crate::builtins::Registry;
use crate::config::Options;
use crate::error::Error;
use crate::types::Type;
use collector::Collector;
use checker::TypeChecker;
use validator::Validator;
pub use scope::{DeclId, DeclKind, Declaration, Scope, ScopeId, ScopeKind, ScopeTree};

// ─── Result ───────────────────────────────────────────────────────────────────

/// Where an identifier (or a declaring name) points: the scope that holds
/// the declaration and the declaration itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub scope: ScopeId,
    pub decl: DeclId,
}

/// Attributes computed for a program that analyzed cleanly.
pub struct Analysis {
    pub scopes: ScopeTree,
    pub resolutions: HashMap<NodeId, Resolution>,
    pub types: HashMap<NodeId, Type>,
    pub decl_types: HashMap<DeclId, Type>,
    pub warnings: Vec<Error>,
}

impl Analysis {
    pub fn resolution(&self, node: NodeId) -> Option<Resolution> {
        self.resolutions.get(&node).copied()
    }

    pub fn decl_type(&self, decl: DeclId) -> Option<Type> {
        self.decl_types.get(&decl).copied()
    }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Full analyzer pipeline:
/// 1. Collector: build the scope tree and resolve every identifier
/// 2. TypeChecker: register typing rules and settle them
/// 3. Validator: structural checks
///
/// Every pass runs even when an earlier one reported errors, so all
/// diagnostics come back together.
#[tracing::instrument(skip_all)]
pub fn analyze(
    program: &ast::Program,
    registry: &Registry,
    options: &Options,
) -> Result<Analysis, Vec<Error>> {
    let mut all_errors: Vec<Error> = Vec::new();

    // ── Pass 1: scopes and resolution ─────────────────────────────────────────
    let (scopes, resolutions, collect_errors) = Collector::new(program, registry, options).collect(program);
    all_errors.extend(collect_errors);

    // ── Pass 2: type rules ────────────────────────────────────────────────────
    let (solution, type_errors) = TypeChecker::new(&scopes, &resolutions).run(program);
    all_errors.extend(type_errors);

    // ── Pass 3: structure ─────────────────────────────────────────────────────
    let validate_errors = Validator::new().validate(program);
    all_errors.extend(validate_errors);

    // ─────────────────────────────────────────────────────────────────────────
    let (mut errors, warnings): (Vec<_>, Vec<_>) = all_errors
        .into_iter()
        .partition(|e| e.code.is_error());

    if errors.is_empty() {
        tracing::debug!(scopes = scopes.len(), "analysis succeeded");
        Ok(Analysis {
            types: solution.node_types(),
            decl_types: solution.decl_types(),
            scopes,
            resolutions,
            warnings,
        })
    } else {
        errors.sort_by_key(|e| (e.line, e.column));
        tracing::debug!(errors = errors.len(), "analysis failed");
        Err(errors)
    }
}
