//! # slate-core
//!
//! The engine for the Slate language: a small statically typed imperative
//! language compiled to bytecode and executed on a stack-based virtual
//! machine.
//!
//! ## Overview
//!
//! This crate provides the complete Slate pipeline:
//! - Lexer and recursive descent parser
//! - Scope-aware semantic analyzer (type checking, symbol registration)
//! - Single-pass bytecode compiler with backpatched jumps
//! - Stack-based virtual machine with explicit call frames
//!
//! ## Quick Start
//!
//! ```rust
//! use slate_core::Engine;
//!
//! let mut engine = Engine::new();
//! let outcome = engine.eval("int x = 1 + 2;").unwrap();
//! assert_eq!(outcome.globals["x"].to_string(), "3");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyzer;
pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

// Re-exports for convenience
pub use analyzer::Analyzer;
pub use compiler::{Bytecode, Compiler};
pub use parser::Parser;
pub use runtime::value::Value;
pub use vm::Vm;

use rustc_hash::FxHashMap;

/// The result of evaluating a Slate program to completion.
#[derive(Debug, Clone, Default)]
pub struct EvalOutcome {
    /// Final bindings of the global frame.
    pub globals: FxHashMap<String, Value>,
    /// Values surfaced by expression statements, in execution order.
    pub output: Vec<Value>,
    /// Non-fatal diagnostics reported by the semantic analyzer.
    pub diagnostics: Vec<String>,
}

/// The main Slate engine.
///
/// Runs the full pipeline (parse, analyze, compile, execute) over a
/// source string. The engine keeps no state between `eval` calls; every
/// invocation starts from a fresh analyzer and a fresh virtual machine.
pub struct Engine {
    _private: (),
}

impl Engine {
    /// Creates a new engine instance.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Evaluates Slate source code and returns the final observable state.
    ///
    /// Fatal errors from any stage (syntax, fatal semantic, runtime) abort
    /// the pipeline. Non-fatal semantic diagnostics are collected into the
    /// outcome and do not prevent compilation or execution.
    pub fn eval(&mut self, source: &str) -> Result<EvalOutcome, Error> {
        let mut parser = Parser::new(source);
        let program = parser.parse_program()?;

        let mut analyzer = Analyzer::new();
        analyzer.analyze(&program)?;
        let diagnostics = analyzer.into_diagnostics();

        let mut compiler = Compiler::new();
        let bytecode = compiler.compile(&program)?;

        let mut vm = Vm::new();
        vm.run(&bytecode)?;

        Ok(EvalOutcome {
            globals: vm.globals().clone(),
            output: vm.output().to_vec(),
            diagnostics,
        })
    }

    /// Evaluates Slate source code from a file.
    pub fn eval_file(&mut self, path: &std::path::Path) -> Result<EvalOutcome, Error> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::Io(e.to_string()))?;
        self.eval(&source)
    }

    /// Compiles Slate source code to bytecode without executing it.
    ///
    /// The program is analyzed first, so fatal semantic errors surface
    /// before any instruction is emitted. Non-fatal diagnostics are
    /// returned alongside the bytecode, as in [`Engine::eval`].
    pub fn compile(&mut self, source: &str) -> Result<(Bytecode, Vec<String>), Error> {
        let mut parser = Parser::new(source);
        let program = parser.parse_program()?;

        let mut analyzer = Analyzer::new();
        analyzer.analyze(&program)?;
        let diagnostics = analyzer.into_diagnostics();

        let mut compiler = Compiler::new();
        let bytecode = compiler.compile(&program)?;
        Ok((bytecode, diagnostics))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during Slate compilation or execution.
#[derive(Debug, Clone)]
pub enum Error {
    /// Syntax error during lexing or parsing
    SyntaxError(String),
    /// A name declared twice in the same scope
    Redeclaration(String),
    /// A name used before any declaration
    UndefinedVariable(String),
    /// Incompatible types at a declaration or assignment
    TypeMismatch(String),
    /// Fatal error at execution time
    RuntimeError(String),
    /// Internal engine invariant violated
    InternalError(String),
    /// I/O error
    Io(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SyntaxError(msg) => write!(f, "SyntaxError: {}", msg),
            Error::Redeclaration(msg) => write!(f, "RedeclarationError: {}", msg),
            Error::UndefinedVariable(msg) => write!(f, "UndefinedVariableError: {}", msg),
            Error::TypeMismatch(msg) => write!(f, "TypeMismatchError: {}", msg),
            Error::RuntimeError(msg) => write!(f, "RuntimeError: {}", msg),
            Error::InternalError(msg) => write!(f, "InternalError: {}", msg),
            Error::Io(msg) => write!(f, "IOError: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_simple_declaration() {
        let mut engine = Engine::new();
        let outcome = engine.eval("int x = 42;").unwrap();
        assert_eq!(outcome.globals["x"], Value::Int(42));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_eval_expression_statement_output() {
        let mut engine = Engine::new();
        let outcome = engine.eval("1 + 2;").unwrap();
        assert_eq!(outcome.output, vec![Value::Int(3)]);
    }

    #[test]
    fn test_eval_is_stateless_between_calls() {
        let mut engine = Engine::new();
        engine.eval("int x = 1;").unwrap();
        // x must not leak into the next program
        let err = engine.eval("x = 2;").unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable(_)));
    }

    #[test]
    fn test_fatal_semantic_error_aborts_pipeline() {
        let mut engine = Engine::new();
        let err = engine.eval("int x = \"hello\";").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn test_error_display() {
        let err = Error::SyntaxError("unexpected token".into());
        assert_eq!(err.to_string(), "SyntaxError: unexpected token");
    }
}
