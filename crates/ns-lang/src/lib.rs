pub mod syntax;
pub mod types;
pub mod analysis;
pub mod builtins;
pub mod runtime;
pub mod error;
pub mod config;

pub use error::{Error, ErrorCode, ErrorKind, Failure, RuntimeError, RuntimeErrorKind};
pub use config::{Options, Redeclaration};
pub use syntax::token::{Token, TokenKind};
pub use runtime::value::Value;
pub use types::Type;
pub use analysis::Analysis;
pub use builtins::{Registry, RuntimeState};

use std::io::Write;

use crate::syntax::ast::Program as AstProgram;
use runtime::interpreter::Interpreter;

// ─── Public API types ─────────────────────────────────────────────────────────

/// A program that lexed, parsed and analyzed without diagnostics.
/// Produced by [`compile`]; it can be run any number of times.
pub struct Program {
    ast: AstProgram,
    analysis: Analysis,
    options: Options,
    registry: Registry,
}

impl Program {
    /// Analyze an AST built outside the parser.
    pub fn from_ast(ast: AstProgram, options: &Options) -> Result<Self, Vec<Error>> {
        let registry = Registry::standard();
        let analysis = analysis::analyze(&ast, &registry, options)?;
        Ok(Self { ast, analysis, options: options.clone(), registry })
    }

    pub fn ast(&self) -> &AstProgram {
        &self.ast
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Run with `print`/`println` going to stdout.
    pub fn run(&self, args: Vec<String>) -> Result<Value, RuntimeError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let result = self.run_with_output(args, &mut out);
        out.flush().map_err(|e| RuntimeError::io(0, e.to_string()))?;
        result
    }

    pub fn run_with_output(&self, args: Vec<String>, out: &mut dyn Write) -> Result<Value, RuntimeError> {
        let state = RuntimeState::new(out, args);
        Interpreter::new(&self.ast, &self.analysis, &self.registry, &self.options, state).run()
    }
}

// ─── Public API ───────────────────────────────────────────────────────────────

/// Lex, parse and analyze source text with default options.
pub fn compile(source: &str) -> Result<Program, Vec<Error>> {
    compile_with(source, &Options::default())
}

pub fn compile_with(source: &str, options: &Options) -> Result<Program, Vec<Error>> {
    let tokens = syntax::lexer::Lexer::new(source).tokenize()?;
    let ast = syntax::parser::Parser::new(tokens).parse()?;
    Program::from_ast(ast, options)
}

/// Compile and run in one step, printing to stdout. Evaluation never starts
/// when analysis reports anything.
pub fn run_program(source: &str, args: Vec<String>) -> Result<Value, Failure> {
    let program = compile(source).map_err(Failure::Diagnostics)?;
    Ok(program.run(args)?)
}
