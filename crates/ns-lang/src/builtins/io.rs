//! Line-oriented file access: `open`, `close`, `read`, `write`.
//! Handles stay open until the program closes them.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::runtime::value::{FileHandle, FileValue, Value};
use crate::types::Type;
use super::{Export, ExportKind, Library, LibraryInfo, Param, RuntimeState, Signature, as_file, as_str, check_argc};

const OPEN: &[Param] = &[
    Param { name: "path", accepts: &[Type::String] },
    Param { name: "mode", accepts: &[Type::String] },
];
const CLOSE: &[Param] = &[Param { name: "file", accepts: &[Type::File] }];
const READ: &[Param]  = &[Param { name: "file", accepts: &[Type::File] }];
const WRITE: &[Param] = &[
    Param { name: "file", accepts: &[Type::File] },
    Param { name: "value", accepts: &[] },
];

fn f(name: &'static str, params: &'static [Param], returns: Type) -> Export {
    Export { name, kind: ExportKind::Function(Signature { params, returns }) }
}

pub fn io_exports() -> Vec<Export> {
    vec![
        f("open",  OPEN,  Type::File),
        f("close", CLOSE, Type::None),
        f("read",  READ,  Type::String),
        f("write", WRITE, Type::None),
    ]
}

pub struct IoLibrary;

impl LibraryInfo for IoLibrary {
    fn name(&self) -> &'static str { "io" }
    fn exports(&self) -> Vec<Export> { io_exports() }
}

impl Library for IoLibrary {
    fn call(
        &self,
        name: &str,
        args: &[Value],
        _state: &mut RuntimeState<'_>,
        line: usize,
    ) -> Result<Option<Value>, RuntimeError> {
        let v = match name {
            "open" => {
                check_argc(name, args, 2, line)?;
                let path = as_str(name, &args[0], line)?;
                let mode = as_str(name, &args[1], line)?;
                open(path, mode, line)?
            }
            "close" => {
                check_argc(name, args, 1, line)?;
                close(as_file(name, &args[0], line)?, line)?;
                Value::None
            }
            "read" => {
                check_argc(name, args, 1, line)?;
                read_line(as_file(name, &args[0], line)?, line)?
            }
            "write" => {
                check_argc(name, args, 2, line)?;
                write_line(as_file(name, &args[0], line)?, &args[1], line)?;
                Value::None
            }
            _ => return Ok(None),
        };
        Ok(Some(v))
    }

    fn get_constant(&self, _name: &str, _state: &RuntimeState<'_>) -> Option<Value> {
        None
    }
}

// ─── Operations ───────────────────────────────────────────────────────────────

fn open(path: &str, mode: &str, line: usize) -> Result<Value, RuntimeError> {
    let handle = match mode {
        "r" | "read" => {
            let file = File::open(path)
                .map_err(|e| RuntimeError::io(line, format!("cannot open `{path}` for reading: {e}")))?;
            FileHandle::Reader(BufReader::new(file))
        }
        "w" | "write" => {
            let file = File::create(path)
                .map_err(|e| RuntimeError::io(line, format!("cannot open `{path}` for writing: {e}")))?;
            FileHandle::Writer(BufWriter::new(file))
        }
        other => {
            return Err(RuntimeError::io(line, format!(
                "unknown file mode `{other}` (expected \"r\", \"read\", \"w\" or \"write\")",
            )));
        }
    };
    tracing::debug!(path, mode = handle.mode_name(), "opened file");
    Ok(Value::File(Rc::new(FileValue { path: path.to_string(), handle: RefCell::new(handle) })))
}

/// Closing twice is an error; the second call has nothing to release.
fn close(file: &FileValue, line: usize) -> Result<(), RuntimeError> {
    let previous = std::mem::replace(&mut *file.handle.borrow_mut(), FileHandle::Closed);
    match previous {
        FileHandle::Writer(mut w) => w.flush()
            .map_err(|e| RuntimeError::io(line, format!("cannot flush `{}`: {e}", file.path)))?,
        FileHandle::Reader(_) => {}
        FileHandle::Closed => {
            return Err(RuntimeError::io(line, format!("`{}` is already closed", file.path)));
        }
    }
    tracing::debug!(path = %file.path, "closed file");
    Ok(())
}

/// Next line without its terminator, or `None` once the file is exhausted.
fn read_line(file: &FileValue, line: usize) -> Result<Value, RuntimeError> {
    let mut handle = file.handle.borrow_mut();
    let mode = handle.mode_name();
    let FileHandle::Reader(reader) = &mut *handle else {
        return Err(RuntimeError::io(line, format!(
            "cannot read from `{}`: file is {mode}", file.path,
        )));
    };

    let mut buf = String::new();
    let n = reader.read_line(&mut buf)
        .map_err(|e| RuntimeError::io(line, format!("cannot read `{}`: {e}", file.path)))?;
    if n == 0 {
        return Ok(Value::None);
    }
    if buf.ends_with('\n') { buf.pop(); }
    if buf.ends_with('\r') { buf.pop(); }
    Ok(Value::Str(buf))
}

fn write_line(file: &FileValue, value: &Value, line: usize) -> Result<(), RuntimeError> {
    let mut handle = file.handle.borrow_mut();
    let mode = handle.mode_name();
    let FileHandle::Writer(writer) = &mut *handle else {
        return Err(RuntimeError::io(line, format!(
            "cannot write to `{}`: file is {mode}", file.path,
        )));
    };
    writeln!(writer, "{value}")
        .map_err(|e| RuntimeError::io(line, format!("cannot write `{}`: {e}", file.path)))
}
