//! The Slate virtual machine.
//!
//! A stack-based interpreter over the flat instruction stream produced by
//! the compiler, with explicit frames for block scopes and function calls.

mod interpreter;

pub use interpreter::Vm;
