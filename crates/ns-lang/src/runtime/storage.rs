use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::analysis::ScopeId;
use super::value::Value;

/// Runtime counterpart of one analyzer scope: the values of the names it
/// declares, for one activation. Frames chain to the frame of the lexically
/// enclosing scope, so a lookup walks the same path the analyzer did.
#[derive(Debug)]
pub struct ScopeStorage {
    pub scope: ScopeId,
    parent: Option<Rc<ScopeStorage>>,
    bindings: RefCell<HashMap<String, Value>>,
}

impl ScopeStorage {
    pub fn root(scope: ScopeId) -> Rc<Self> {
        Rc::new(Self { scope, parent: None, bindings: RefCell::new(HashMap::new()) })
    }

    pub fn child(parent: &Rc<Self>, scope: ScopeId) -> Rc<Self> {
        Rc::new(Self { scope, parent: Some(parent.clone()), bindings: RefCell::new(HashMap::new()) })
    }

    /// The nearest frame on this chain that belongs to `scope`.
    pub fn frame_for(self: &Rc<Self>, scope: ScopeId) -> Option<Rc<Self>> {
        let mut current = Some(self);
        while let Some(frame) = current {
            if frame.scope == scope {
                return Some(frame.clone());
            }
            current = frame.parent.as_ref();
        }
        None
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_for_walks_the_chain() {
        let root = ScopeStorage::root(0);
        let block = ScopeStorage::child(&root, 1);
        let inner = ScopeStorage::child(&block, 4);
        assert_eq!(inner.frame_for(1).map(|f| f.scope), Some(1));
        assert!(Rc::ptr_eq(&inner.frame_for(0).unwrap(), &root));
        assert!(inner.frame_for(7).is_none());
    }

    #[test]
    fn nearest_frame_wins() {
        // two activations of the same scope, as in recursion
        let root = ScopeStorage::root(0);
        let outer = ScopeStorage::child(&root, 2);
        let inner = ScopeStorage::child(&outer, 2);
        outer.set("n", Value::Int(1));
        inner.set("n", Value::Int(2));
        assert_eq!(inner.frame_for(2).unwrap().get("n"), Some(Value::Int(2)));
        assert_eq!(outer.frame_for(2).unwrap().get("n"), Some(Value::Int(1)));
    }

    #[test]
    fn set_overwrites() {
        let root = ScopeStorage::root(0);
        root.set("x", Value::Int(1));
        root.set("x", Value::str("s"));
        assert_eq!(root.get("x"), Some(Value::str("s")));
        assert_eq!(root.get("y"), None);
    }
}
