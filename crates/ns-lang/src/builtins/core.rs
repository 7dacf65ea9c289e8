//! Always-available built-ins: the constants, collections helpers and printing.

use std::cmp::Ordering;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::value::Value;
use crate::types::Type;
use super::{
    Export, ExportKind, Library, LibraryInfo, Param, RuntimeState, Signature,
    as_array, as_int, as_str, check_argc, collection_len, reserve_array,
};

// ─── Signatures ───────────────────────────────────────────────────────────────

const ANY: &[Type] = &[];
const COLLECTION: &[Type] = &[Type::Array, Type::Map];

const RANGE: &[Param]   = &[Param { name: "n", accepts: &[Type::Integer] }];
const INDEXER: &[Param] = &[Param { name: "collection", accepts: COLLECTION }];
const SORT: &[Param]    = &[Param { name: "array", accepts: &[Type::Array] }];
const LEN: &[Param]     = &[Param { name: "collection", accepts: COLLECTION }];
const INT: &[Param]     = &[Param { name: "text", accepts: &[Type::String] }];
const PRINT: &[Param]   = &[Param { name: "value", accepts: ANY }];

fn f(name: &'static str, params: &'static [Param], returns: Type) -> Export {
    Export { name, kind: ExportKind::Function(Signature { params, returns }) }
}

fn v(name: &'static str, ty: Type) -> Export {
    Export { name, kind: ExportKind::Variable(ty) }
}

pub fn core_exports() -> Vec<Export> {
    vec![
        // Constants
        v("True",  Type::Boolean),
        v("False", Type::Boolean),
        v("None",  Type::None),
        v("args",  Type::Array),

        f("range",   RANGE,   Type::Array),
        f("indexer", INDEXER, Type::Array),
        f("sort",    SORT,    Type::Array),
        f("len",     LEN,     Type::Integer),
        f("int",     INT,     Type::Integer),
        f("print",   PRINT,   Type::None),
        f("println", PRINT,   Type::None),
    ]
}

// ─── CoreLibrary: runtime provider ───────────────────────────────────────────

pub struct CoreLibrary;

impl LibraryInfo for CoreLibrary {
    fn name(&self) -> &'static str { "core" }
    fn exports(&self) -> Vec<Export> { core_exports() }
}

impl Library for CoreLibrary {
    fn call(
        &self,
        name: &str,
        args: &[Value],
        state: &mut RuntimeState<'_>,
        line: usize,
    ) -> Result<Option<Value>, RuntimeError> {
        let v = match name {
            "range" => {
                check_argc(name, args, 1, line)?;
                let n = as_int(name, &args[0], line)?.max(0);
                let mut items = reserve_array(n, line)?;
                items.extend((0..n).map(Value::Int));
                Value::array(items)
            }
            "indexer" => {
                check_argc(name, args, 1, line)?;
                match &args[0] {
                    Value::Map(entries) => Value::array(entries.borrow().keys().map(|k| k.to_value()).collect()),
                    other => {
                        let len = collection_len(name, other, line)?;
                        Value::array((0..len as i64).map(Value::Int).collect())
                    }
                }
            }
            "sort" => {
                check_argc(name, args, 1, line)?;
                let items = as_array(name, &args[0], line)?;
                let mut sorted = items.borrow().clone();
                sort_values(&mut sorted, line)?;
                Value::array(sorted)
            }
            "len" => {
                check_argc(name, args, 1, line)?;
                Value::Int(collection_len(name, &args[0], line)? as i64)
            }
            "int" => {
                check_argc(name, args, 1, line)?;
                let text = as_str(name, &args[0], line)?;
                let n = text.parse::<i64>().map_err(|_| {
                    RuntimeError::new(line, RuntimeErrorKind::InvalidInteger(text.to_string()))
                })?;
                Value::Int(n)
            }
            "print" | "println" => {
                check_argc(name, args, 1, line)?;
                let newline = if name == "println" { "\n" } else { "" };
                write!(state.out, "{}{newline}", args[0])
                    .map_err(|e| RuntimeError::io(line, e.to_string()))?;
                Value::None
            }
            _ => return Ok(None),
        };
        Ok(Some(v))
    }

    fn get_constant(&self, name: &str, state: &RuntimeState<'_>) -> Option<Value> {
        match name {
            "True"  => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            "None"  => Some(Value::None),
            "args"  => Some(Value::array(state.args.iter().cloned().map(Value::Str).collect())),
            _ => None,
        }
    }
}

/// Sorts in place when every element is an int, every element a string, or
/// every element a bool.
fn sort_values(items: &mut [Value], line: usize) -> Result<(), RuntimeError> {
    let Some(first) = items.first() else { return Ok(()) };
    let kind = first.type_name();

    if !matches!(first, Value::Int(_) | Value::Str(_) | Value::Bool(_)) {
        return Err(RuntimeError::type_error(line, format!("cannot sort values of type {kind}")));
    }
    if let Some(other) = items.iter().find(|v| v.type_name() != kind) {
        return Err(RuntimeError::type_error(line, format!(
            "cannot sort an array mixing {kind} and {}", other.type_name(),
        )));
    }

    items.sort_by(|a, b| match (a, b) {
        (Value::Int(x), Value::Int(y))   => x.cmp(y),
        (Value::Str(x), Value::Str(y))   => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let mut out = Vec::new();
        let mut state = RuntimeState::new(&mut out, Vec::new());
        CoreLibrary.call(name, args, &mut state, 1).map(|v| v.expect("core function"))
    }

    fn ints(xs: &[i64]) -> Value {
        Value::array(xs.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn range_counts_from_zero() {
        assert_eq!(call("range", &[Value::Int(3)]).unwrap(), ints(&[0, 1, 2]));
        assert_eq!(call("range", &[Value::Int(-2)]).unwrap(), ints(&[]));
    }

    #[test]
    fn range_rejects_strings() {
        let err = call("range", &[Value::str("3")]).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::TypeError(_)));
    }

    #[test]
    fn sort_copies() {
        let original = ints(&[3, 1, 2]);
        assert_eq!(call("sort", &[original.clone()]).unwrap(), ints(&[1, 2, 3]));
        assert_eq!(original, ints(&[3, 1, 2]));
    }

    #[test]
    fn sort_strings_and_bools() {
        let words = Value::array(vec![Value::str("b"), Value::str("a")]);
        assert_eq!(call("sort", &[words]).unwrap().to_string(), r#"["a", "b"]"#);
        let flags = Value::array(vec![Value::Bool(true), Value::Bool(false)]);
        assert_eq!(call("sort", &[flags]).unwrap().to_string(), "[False, True]");
    }

    #[test]
    fn sort_mixed_is_type_error() {
        let mixed = Value::array(vec![Value::Int(1), Value::str("a")]);
        let err = call("sort", &[mixed]).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::TypeError(_)));
    }

    #[test]
    fn int_parses() {
        assert_eq!(call("int", &[Value::str("-42")]).unwrap(), Value::Int(-42));
        let err = call("int", &[Value::str("4x")]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::InvalidInteger("4x".into()));
    }

    #[test]
    fn len_of_collections() {
        assert_eq!(call("len", &[ints(&[1, 2])]).unwrap(), Value::Int(2));
        assert!(call("len", &[Value::Int(2)]).is_err());
    }

    #[test]
    fn println_writes() {
        let mut out = Vec::new();
        {
            let mut state = RuntimeState::new(&mut out, Vec::new());
            CoreLibrary.call("println", &[Value::str("hi")], &mut state, 1).unwrap();
            CoreLibrary.call("print", &[ints(&[1])], &mut state, 1).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "hi\n[1]");
    }

    #[test]
    fn unknown_name_is_not_handled() {
        let mut out = Vec::new();
        let mut state = RuntimeState::new(&mut out, Vec::new());
        assert!(CoreLibrary.call("open", &[], &mut state, 1).unwrap().is_none());
    }

    #[test]
    fn args_constant() {
        let mut out = Vec::new();
        let state = RuntimeState::new(&mut out, vec!["a".into()]);
        let args = CoreLibrary.get_constant("args", &state).unwrap();
        assert_eq!(args.to_string(), r#"["a"]"#);
    }
}
