//! Dependency-driven attribute evaluation.
//!
//! Each rule names the attributes it reads and, optionally, the one it
//! writes. Rules fire once all their inputs are settled, in dependency
//! order. A rule whose input failed fails its own output silently, so one
//! mistake is reported once. Rules still waiting when nothing else can fire
//! are reported as unresolvable.

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, ErrorCode};
use crate::syntax::ast::{NodeId, Span};
use crate::types::Type;
use super::scope::DeclId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attr {
    /// Type of an AST node.
    Node(NodeId),
    /// Type of a declaration.
    Decl(DeclId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Ready(Type),
    Failed,
}

type Compute = Box<dyn FnOnce(&[Type]) -> Result<Type, Error>>;

struct Rule {
    deps: Vec<Attr>,
    output: Option<Attr>,
    span: Span,
    compute: Option<Compute>,
    pending: usize,
}

#[derive(Default)]
pub struct RuleEngine {
    slots: HashMap<Attr, Slot>,
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle an attribute whose value needs no inputs.
    pub fn set(&mut self, attr: Attr, ty: Type) {
        self.slots.entry(attr).or_insert(Slot::Ready(ty));
    }

    /// Settle an attribute as failed; dependents fail without a new diagnostic.
    pub fn fail(&mut self, attr: Attr) {
        self.slots.entry(attr).or_insert(Slot::Failed);
    }

    /// Register `output = compute(deps)`. `span` locates the diagnostic if the
    /// rule can never fire.
    pub fn rule(
        &mut self,
        deps: Vec<Attr>,
        output: Option<Attr>,
        span: Span,
        compute: impl FnOnce(&[Type]) -> Result<Type, Error> + 'static,
    ) {
        self.rules.push(Rule { deps, output, span, compute: Some(Box::new(compute)), pending: 0 });
    }

    /// A rule that only checks its inputs.
    pub fn check(
        &mut self,
        deps: Vec<Attr>,
        span: Span,
        check: impl FnOnce(&[Type]) -> Result<(), Error> + 'static,
    ) {
        self.rule(deps, None, span, move |tys| check(tys).map(|()| Type::Unknown));
    }

    /// Fire every rule that can fire and return the settled types together
    /// with the diagnostics raised along the way.
    pub fn solve(mut self) -> (Solution, Vec<Error>) {
        let mut errors = Vec::new();
        let mut waiters: HashMap<Attr, Vec<usize>> = HashMap::new();
        let mut queue = VecDeque::new();

        for (i, rule) in self.rules.iter_mut().enumerate() {
            for dep in &rule.deps {
                if !self.slots.contains_key(dep) {
                    rule.pending += 1;
                    waiters.entry(*dep).or_default().push(i);
                }
            }
            if rule.pending == 0 {
                queue.push_back(i);
            }
        }

        let mut fired = 0usize;
        while let Some(i) = queue.pop_front() {
            fired += 1;
            let slot = self.fire(i, &mut errors);
            let Some(output) = self.rules[i].output else { continue };
            if self.slots.contains_key(&output) {
                continue;
            }
            self.slots.insert(output, slot);
            for w in waiters.remove(&output).unwrap_or_default() {
                let rule = &mut self.rules[w];
                rule.pending -= 1;
                if rule.pending == 0 {
                    queue.push_back(w);
                }
            }
        }

        let stuck: Vec<_> = self.rules.iter().filter(|r| r.compute.is_some()).collect();
        for rule in &stuck {
            errors.push(Error::new(
                ErrorCode::S010,
                rule.span.line, rule.span.column,
                "cannot determine this type: it depends on itself or on a value that is never computed",
            ));
        }

        tracing::debug!(rules = self.rules.len(), fired, stuck = stuck.len(), "rule engine settled");
        (Solution { slots: self.slots }, errors)
    }

    fn fire(&mut self, i: usize, errors: &mut Vec<Error>) -> Slot {
        let rule = &mut self.rules[i];
        let Some(compute) = rule.compute.take() else { return Slot::Failed };

        let mut inputs = Vec::with_capacity(rule.deps.len());
        for dep in &rule.deps {
            match self.slots.get(dep) {
                Some(Slot::Ready(ty)) => inputs.push(*ty),
                _ => return Slot::Failed,
            }
        }

        match compute(&inputs) {
            Ok(ty) => Slot::Ready(ty),
            Err(e) => {
                tracing::trace!(code = %e.code, "rule raised a diagnostic");
                errors.push(e);
                Slot::Failed
            }
        }
    }
}

/// Settled attribute values. Failed attributes read as absent.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    slots: HashMap<Attr, Slot>,
}

impl Solution {
    pub fn get(&self, attr: Attr) -> Option<Type> {
        match self.slots.get(&attr) {
            Some(Slot::Ready(ty)) => Some(*ty),
            _ => None,
        }
    }

    pub fn node_types(&self) -> HashMap<NodeId, Type> {
        self.slots.iter().filter_map(|(attr, slot)| match (attr, slot) {
            (Attr::Node(id), Slot::Ready(ty)) => Some((*id, *ty)),
            _ => None,
        }).collect()
    }

    pub fn decl_types(&self) -> HashMap<DeclId, Type> {
        self.slots.iter().filter_map(|(attr, slot)| match (attr, slot) {
            (Attr::Decl(id), Slot::Ready(ty)) => Some((*id, *ty)),
            _ => None,
        }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mismatch() -> Error {
        Error::new(ErrorCode::S003, 1, 1, "mismatch")
    }

    #[test]
    fn fires_in_dependency_order() {
        let mut e = RuleEngine::new();
        // registered before its input exists
        e.rule(vec![Attr::Node(2)], Some(Attr::Node(3)), Span::default(), |t| Ok(t[0]));
        e.rule(vec![Attr::Node(1)], Some(Attr::Node(2)), Span::default(), |t| Ok(t[0]));
        e.set(Attr::Node(1), Type::Integer);

        let (sol, errors) = e.solve();
        assert!(errors.is_empty());
        assert_eq!(sol.get(Attr::Node(3)), Some(Type::Integer));
    }

    #[test]
    fn combines_several_inputs() {
        let mut e = RuleEngine::new();
        e.set(Attr::Decl(0), Type::String);
        e.set(Attr::Node(1), Type::String);
        e.rule(vec![Attr::Decl(0), Attr::Node(1)], Some(Attr::Node(2)), Span::default(), |t| {
            if t[0] == t[1] { Ok(Type::Boolean) } else { Err(mismatch()) }
        });
        let (sol, errors) = e.solve();
        assert!(errors.is_empty());
        assert_eq!(sol.get(Attr::Node(2)), Some(Type::Boolean));
    }

    #[test]
    fn failure_propagates_silently() {
        let mut e = RuleEngine::new();
        e.set(Attr::Node(1), Type::String);
        e.rule(vec![Attr::Node(1)], Some(Attr::Node(2)), Span::default(), |_| Err(mismatch()));
        e.rule(vec![Attr::Node(2)], Some(Attr::Node(3)), Span::default(), |t| Ok(t[0]));

        let (sol, errors) = e.solve();
        assert_eq!(errors.len(), 1);
        assert_eq!(sol.get(Attr::Node(2)), None);
        assert_eq!(sol.get(Attr::Node(3)), None);
    }

    #[test]
    fn failed_input_does_not_report() {
        let mut e = RuleEngine::new();
        e.fail(Attr::Node(1));
        e.check(vec![Attr::Node(1)], Span::default(), |_| Err(mismatch()));
        let (_, errors) = e.solve();
        assert!(errors.is_empty());
    }

    #[test]
    fn cycle_is_reported() {
        let mut e = RuleEngine::new();
        e.rule(vec![Attr::Node(2)], Some(Attr::Node(1)), Span::new(3, 4), |t| Ok(t[0]));
        e.rule(vec![Attr::Node(1)], Some(Attr::Node(2)), Span::new(5, 6), |t| Ok(t[0]));

        let (sol, errors) = e.solve();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == ErrorCode::S010));
        assert_eq!((errors[0].line, errors[0].column), (3, 4));
        assert_eq!(sol.get(Attr::Node(1)), None);
    }

    #[test]
    fn missing_input_is_reported() {
        let mut e = RuleEngine::new();
        e.check(vec![Attr::Decl(9)], Span::new(1, 2), |_| Ok(()));
        let (_, errors) = e.solve();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::S010);
    }

    #[test]
    fn first_value_wins() {
        let mut e = RuleEngine::new();
        e.set(Attr::Node(1), Type::Integer);
        e.set(Attr::Node(1), Type::String);
        let (sol, _) = e.solve();
        assert_eq!(sol.get(Attr::Node(1)), Some(Type::Integer));
    }

    #[test]
    fn collects_types_by_kind() {
        let mut e = RuleEngine::new();
        e.set(Attr::Node(1), Type::Map);
        e.set(Attr::Decl(1), Type::File);
        let (sol, _) = e.solve();
        assert_eq!(sol.node_types().get(&1), Some(&Type::Map));
        assert_eq!(sol.decl_types().get(&1), Some(&Type::File));
    }
}
