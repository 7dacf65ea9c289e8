use std::io::Write;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::value::{ArrayRef, FileValue, Value};
use crate::types::{Type, describe};

pub mod core;
pub mod io;

// ─── Runtime state ────────────────────────────────────────────────────────────

/// Interpreter-level state passed to every library call.
pub struct RuntimeState<'a> {
    /// Where `print` and `println` write.
    pub out: &'a mut dyn Write,
    /// Program arguments, bound to the root-scope `args` variable.
    pub args: Vec<String>,
}

impl<'a> RuntimeState<'a> {
    pub fn new(out: &'a mut dyn Write, args: Vec<String>) -> Self {
        Self { out, args }
    }
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// One positional parameter of a built-in. An empty `accepts` list takes any value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    pub name: &'static str,
    pub accepts: &'static [Type],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signature {
    pub params: &'static [Param],
    pub returns: Type,
}

impl Signature {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportKind {
    Function(Signature),
    Variable(Type),
}

#[derive(Debug, Clone, Copy)]
pub struct Export {
    pub name: &'static str,
    pub kind: ExportKind,
}

// ─── Compile-time interface ───────────────────────────────────────────────────

/// What the analyzer needs: names and signatures only.
pub trait LibraryInfo: Send + Sync {
    fn name(&self) -> &'static str;
    fn exports(&self) -> Vec<Export>;

    fn get_export(&self, name: &str) -> Option<Export> {
        self.exports().into_iter().find(|e| e.name == name)
    }
}

// ─── Runtime interface ────────────────────────────────────────────────────────

/// What the interpreter needs: call dispatch and constant lookup.
pub trait Library: LibraryInfo {
    /// `Ok(None)` means the name is not one of this library's functions.
    fn call(
        &self,
        name: &str,
        args: &[Value],
        state: &mut RuntimeState<'_>,
        line: usize,
    ) -> Result<Option<Value>, RuntimeError>;

    fn get_constant(&self, name: &str, state: &RuntimeState<'_>) -> Option<Value>;
}

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct Registry {
    libraries: Vec<Box<dyn Library>>,
}

impl Registry {
    pub fn new() -> Self { Self { libraries: Vec::new() } }

    pub fn register(&mut self, lib: Box<dyn Library>) { self.libraries.push(lib); }

    pub fn get(&self, name: &str) -> Option<&dyn Library> {
        self.libraries.iter().find(|l| l.name() == name).map(|l| l.as_ref())
    }

    /// Every export of every library, in registration order. These become the
    /// root-scope declarations.
    pub fn exports(&self) -> Vec<Export> {
        self.libraries.iter().flat_map(|l| l.exports()).collect()
    }

    pub fn get_export(&self, name: &str) -> Option<Export> {
        self.libraries.iter().find_map(|l| l.get_export(name))
    }

    pub fn call_any(
        &self,
        name: &str,
        args: &[Value],
        state: &mut RuntimeState<'_>,
        line: usize,
    ) -> Result<Option<Value>, RuntimeError> {
        for lib in &self.libraries {
            if let Some(v) = lib.call(name, args, state, line)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    pub fn get_constant(&self, name: &str, state: &RuntimeState<'_>) -> Option<Value> {
        self.libraries.iter().find_map(|l| l.get_constant(name, state))
    }

    pub fn standard() -> Self {
        let mut r = Self::new();
        r.register(Box::new(core::CoreLibrary));
        r.register(Box::new(io::IoLibrary));
        r
    }
}

impl Default for Registry {
    fn default() -> Self { Self::standard() }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

pub(crate) fn check_argc(name: &str, args: &[Value], n: usize, line: usize) -> Result<(), RuntimeError> {
    if args.len() != n {
        Err(RuntimeError::type_error(line, format!("`{name}` expects {n} argument(s), got {}", args.len())))
    } else {
        Ok(())
    }
}

fn mismatch(name: &str, expected: &[Type], got: &Value, line: usize) -> RuntimeError {
    RuntimeError::type_error(line, format!(
        "`{name}` expects {}, got {}", describe(expected), got.type_name(),
    ))
}

pub(crate) fn as_int(name: &str, v: &Value, line: usize) -> Result<i64, RuntimeError> {
    match v {
        Value::Int(n) => Ok(*n),
        _ => Err(mismatch(name, &[Type::Integer], v, line)),
    }
}

pub(crate) fn as_str<'v>(name: &str, v: &'v Value, line: usize) -> Result<&'v str, RuntimeError> {
    match v {
        Value::Str(s) => Ok(s),
        _ => Err(mismatch(name, &[Type::String], v, line)),
    }
}

pub(crate) fn as_array(name: &str, v: &Value, line: usize) -> Result<ArrayRef, RuntimeError> {
    match v {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(mismatch(name, &[Type::Array], v, line)),
    }
}

pub(crate) fn as_file<'v>(name: &str, v: &'v Value, line: usize) -> Result<&'v FileValue, RuntimeError> {
    match v {
        Value::File(f) => Ok(f.as_ref()),
        _ => Err(mismatch(name, &[Type::File], v, line)),
    }
}

/// An empty vector with room for `len` elements. Sizes the allocator
/// refuses become a runtime error instead of an abort.
pub(crate) fn reserve_array(len: i64, line: usize) -> Result<Vec<Value>, RuntimeError> {
    let too_large = || RuntimeError::new(line, RuntimeErrorKind::AllocationFailed(len));
    let n = usize::try_from(len).map_err(|_| too_large())?;
    let mut items = Vec::new();
    items.try_reserve_exact(n).map_err(|_| too_large())?;
    Ok(items)
}

/// Length of an array or map, the two sized collections.
pub(crate) fn collection_len(name: &str, v: &Value, line: usize) -> Result<usize, RuntimeError> {
    match v {
        Value::Array(items) => Ok(items.borrow().len()),
        Value::Map(entries) => Ok(entries.borrow().len()),
        _ => Err(mismatch(name, &[Type::Array, Type::Map], v, line)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_exports_are_unique() {
        let exports = Registry::standard().exports();
        let mut names: Vec<_> = exports.iter().map(|e| e.name).collect();
        let len = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), len);
    }

    #[test]
    fn standard_exports_cover_the_builtins() {
        let r = Registry::standard();
        for name in ["True", "False", "None", "args", "print", "println", "sort", "range",
                     "indexer", "len", "int", "open", "close", "read", "write"] {
            assert!(r.get_export(name).is_some(), "missing `{name}`");
        }
    }

    #[test]
    fn libraries_by_name() {
        let r = Registry::standard();
        assert!(r.get("core").is_some());
        assert!(r.get("io").is_some());
        assert!(r.get("math").is_none());
    }

    #[test]
    fn io_signatures_are_typed() {
        let Some(Export { kind: ExportKind::Function(sig), .. }) = Registry::standard().get_export("open") else {
            panic!("open should be a function");
        };
        assert_eq!(sig.arity(), 2);
        assert_eq!(sig.returns, Type::File);
        assert_eq!(sig.params[1].accepts, &[Type::String]);
    }
}
