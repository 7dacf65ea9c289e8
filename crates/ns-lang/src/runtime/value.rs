use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::rc::Rc;

use crate::analysis::scope::DeclId;
use crate::types::Type;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<BTreeMap<MapKey, Value>>>;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    None,
    /// Shared and mutable in place: `b = a` aliases the same storage.
    Array(ArrayRef),
    Map(MapRef),
    /// A user function named as a value; only its name is observable.
    Function(FunctionRef),
    /// A built-in function named as a value.
    Builtin(String),
    File(Rc<FileValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRef {
    pub name: String,
    pub decl: DeclId,
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: BTreeMap<MapKey, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Function(_) | Value::Builtin(_) => "function",
            other => other.static_type().name(),
        }
    }

    pub fn static_type(&self) -> Type {
        match self {
            Value::Int(_)      => Type::Integer,
            Value::Bool(_)     => Type::Boolean,
            Value::Str(_)      => Type::String,
            Value::None        => Type::None,
            Value::Array(_)    => Type::Array,
            Value::Map(_)      => Type::Map,
            Value::File(_)     => Type::File,
            Value::Function(_) | Value::Builtin(_) => Type::Unknown,
        }
    }

    /// Copy of the elements, for tests and callers outside the interpreter.
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        match self { Value::Array(items) => Some(items.borrow().clone()), _ => None }
    }

    /// `open` holds the containers currently being written; meeting one of
    /// them again means the value contains itself.
    fn render(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<usize>, nested: bool) -> fmt::Result {
        match self {
            Value::Int(n)   => write!(f, "{n}"),
            Value::Bool(b)  => f.write_str(if *b { "True" } else { "False" }),
            Value::Str(s) if nested => write!(f, "\"{s}\""),
            Value::Str(s)   => f.write_str(s),
            Value::None     => f.write_str("None"),
            Value::Array(items) => {
                let id = Rc::as_ptr(items) as usize;
                if open.contains(&id) {
                    return f.write_str("[...]");
                }
                open.push(id);
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    item.render(f, open, true)?;
                }
                open.pop();
                f.write_str("]")
            }
            Value::Map(entries) => {
                let id = Rc::as_ptr(entries) as usize;
                if open.contains(&id) {
                    return f.write_str("{...}");
                }
                open.push(id);
                f.write_str("{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{key}: ")?;
                    value.render(f, open, true)?;
                }
                open.pop();
                f.write_str("}")
            }
            Value::Function(func) => f.write_str(&func.name),
            Value::Builtin(name)  => f.write_str(name),
            Value::File(file)     => write!(f, "<file {}>", file.path),
        }
    }

    /// Structural comparison. `open` holds the container pairs under
    /// comparison; a pair met again compares equal, so cycles terminate.
    fn equals(&self, other: &Self, open: &mut Vec<(usize, usize)>) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b))   => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b))   => a == b,
            (Value::None, Value::None)       => true,
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) { return true; }
                let pair = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
                if open.contains(&pair) { return true; }
                open.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let eq = a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y, open));
                open.pop();
                eq
            }
            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) { return true; }
                let pair = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
                if open.contains(&pair) { return true; }
                open.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let eq = a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| ka == kb && va.equals(vb, open));
                open.pop();
                eq
            }
            (Value::Function(a), Value::Function(b)) => a.decl == b.decl,
            (Value::Builtin(a), Value::Builtin(b))   => a == b,
            (Value::File(a), Value::File(b))         => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, &mut Vec::new(), false)
    }
}

/// Structural equality. Values of different types are unequal, never an error.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

// ─── Map keys ─────────────────────────────────────────────────────────────────

/// Keys are partitioned by type: every integer sorts before every string,
/// every string before every boolean.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl MapKey {
    pub fn from_value(v: &Value) -> Option<MapKey> {
        match v {
            Value::Int(n)  => Some(MapKey::Int(*n)),
            Value::Str(s)  => Some(MapKey::Str(s.clone())),
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Int(n)  => Value::Int(*n),
            MapKey::Str(s)  => Value::Str(s.clone()),
            MapKey::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_value().render(f, &mut Vec::new(), true)
    }
}

// ─── Files ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct FileValue {
    pub path: String,
    pub handle: RefCell<FileHandle>,
}

#[derive(Debug)]
pub enum FileHandle {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
    Closed,
}

impl FileHandle {
    pub fn mode_name(&self) -> &'static str {
        match self {
            FileHandle::Reader(_) => "reading",
            FileHandle::Writer(_) => "writing",
            FileHandle::Closed    => "closed",
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(MapKey, Value)>) -> Value {
        Value::map(entries.into_iter().collect())
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Bool(false).to_string(), "False");
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::str("hi").to_string(), "hi");
    }

    #[test]
    fn nested_strings_are_quoted() {
        let v = Value::array(vec![Value::Int(1), Value::str("a"), Value::None]);
        assert_eq!(v.to_string(), r#"[1, "a", None]"#);
    }

    #[test]
    fn map_renders_in_partition_order() {
        let v = map(vec![
            (MapKey::Bool(true), Value::None),
            (MapKey::Str("yo".into()), Value::array(vec![Value::Int(1), Value::None, Value::Bool(false)])),
            (MapKey::Int(1), Value::Int(3)),
        ]);
        assert_eq!(v.to_string(), r#"{1: 3, "yo": [1, None, False], True: None}"#);
    }

    #[test]
    fn equality_is_structural() {
        let a = Value::array(vec![Value::Int(1), Value::str("x")]);
        let b = Value::array(vec![Value::Int(1), Value::str("x")]);
        assert_eq!(a, b);
        assert_ne!(a, Value::array(vec![Value::Int(1)]));
    }

    #[test]
    fn different_types_are_unequal() {
        assert_ne!(Value::array(vec![Value::Int(1)]), Value::str("1"));
        assert_ne!(Value::Int(0), Value::Bool(false));
        assert_ne!(Value::None, Value::str("None"));
    }

    #[test]
    fn arrays_alias() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::Array(items) = &b { items.borrow_mut().push(Value::Int(2)); }
        assert_eq!(a.to_vec().unwrap().len(), 2);
    }

    #[test]
    fn self_containing_values_render() {
        let a = Value::array(vec![Value::Int(1)]);
        if let Value::Array(items) = &a { items.borrow_mut().push(a.clone()); }
        assert_eq!(a.to_string(), "[1, [...]]");

        let m = map(vec![(MapKey::Int(0), Value::None)]);
        if let Value::Map(entries) = &m { entries.borrow_mut().insert(MapKey::Str("me".into()), m.clone()); }
        assert_eq!(m.to_string(), r#"{0: None, "me": {...}}"#);
    }

    #[test]
    fn self_containing_values_compare() {
        let cyclic = || {
            let a = Value::array(vec![Value::Int(1)]);
            if let Value::Array(items) = &a { items.borrow_mut()[0] = a.clone(); }
            a
        };
        let (a, b) = (cyclic(), cyclic());
        assert_eq!(a, a.clone());
        assert_eq!(a, b);
        assert_ne!(a, Value::array(vec![Value::Int(1)]));
    }

    #[test]
    fn map_key_conversion() {
        assert_eq!(MapKey::from_value(&Value::Int(4)), Some(MapKey::Int(4)));
        assert_eq!(MapKey::from_value(&Value::None), None);
        assert_eq!(MapKey::from_value(&Value::array(vec![])), None);
        assert_eq!(MapKey::Str("k".into()).to_value(), Value::str("k"));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::array(vec![]).type_name(), "array");
        assert_eq!(Value::None.type_name(), "None");
    }
}
