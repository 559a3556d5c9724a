//! Bytecode compilation for Slate.
//!
//! A single forward pass over the AST emits a flat instruction stream;
//! forward jump targets are backpatched once their destinations are known.

mod bytecode;
mod codegen;

pub use bytecode::{Bytecode, Instruction, OpCode, Operand};
pub use codegen::Compiler;
