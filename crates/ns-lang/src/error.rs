use thiserror::Error;

/// Error codes prefixed by phase: L = lexer, P = parser, S = semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal
    L003, // invalid escape sequence
    L004, // integer literal out of range

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // invalid assignment target

    // Semantic
    S001, // identifier never declared
    S002, // identifier used before its declaration
    S003, // type mismatch
    S004, // wrong argument count
    S005, // assignment to final variable
    S006, // function name already declared
    S007, // return outside function
    S008, // elsif/else after else
    S009, // not callable
    S010, // type depends on itself or on a value never computed
    S011, // assignment to built-in function
}

/// The diagnostic families a caller can branch on without matching codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    UnresolvedIdentifier,
    UsedBeforeDeclaration,
    TypeMismatch,
    ArityMismatch,
    Structural,
}

impl ErrorCode {
    /// All current codes are hard errors (not warnings).
    pub fn is_error(&self) -> bool { true }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::L001 | Self::L002 | Self::L003 | Self::L004 => ErrorKind::Lexical,
            Self::P001 | Self::P002 | Self::P003 => ErrorKind::Syntax,
            Self::S001 => ErrorKind::UnresolvedIdentifier,
            Self::S002 => ErrorKind::UsedBeforeDeclaration,
            Self::S003 | Self::S009 | Self::S010 => ErrorKind::TypeMismatch,
            Self::S004 => ErrorKind::ArityMismatch,
            Self::S005 | Self::S006 | Self::S007 | Self::S008 | Self::S011 => ErrorKind::Structural,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::L004 => "L004",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
            Self::S001 => "S001",
            Self::S002 => "S002",
            Self::S003 => "S003",
            Self::S004 => "S004",
            Self::S005 => "S005",
            Self::S006 => "S006",
            Self::S007 => "S007",
            Self::S008 => "S008",
            Self::S009 => "S009",
            Self::S010 => "S010",
            Self::S011 => "S011",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compile-time diagnostic. Every phase collects these instead of stopping
/// at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {line}:{column}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("type error: {0}")]
    TypeError(String),
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("i/o error: {0}")]
    Io(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("null reference: {0}")]
    NullReference(String),
    #[error("cannot parse {0:?} as an integer")]
    InvalidInteger(String),
    #[error("variable `{0}` has no value in this activation")]
    UnboundVariable(String),
    #[error("call depth exceeded {0}")]
    RecursionLimit(usize),
    #[error("cannot allocate an array of {0} elements")]
    AllocationFailed(i64),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[runtime] line {line}: {kind}")]
pub struct RuntimeError {
    pub line: usize,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(line: usize, kind: RuntimeErrorKind) -> Self {
        Self { line, kind }
    }

    pub fn type_error(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, RuntimeErrorKind::TypeError(message.into()))
    }

    pub fn io(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, RuntimeErrorKind::Io(message.into()))
    }
}

/// Outcome of [`crate::run_program`]: analysis never starts evaluation when
/// it reports anything, so the two cases are disjoint.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    #[error("analysis failed with {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Error>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
