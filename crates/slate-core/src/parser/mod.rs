//! Syntax analysis for Slate.
//!
//! A recursive descent parser with one token of lookahead, producing the
//! AST consumed by the analyzer and the bytecode compiler.

mod parser;

pub use parser::Parser;
