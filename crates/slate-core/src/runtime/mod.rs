//! Runtime support: the values the virtual machine operates on.

pub mod value;

pub use value::Value;
