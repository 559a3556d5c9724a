//! The scoped symbol table used by the semantic analyzer.

use rustc_hash::FxHashMap;

use crate::Error;

/// Static type tags tracked by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// String
    Str,
    /// A callable function
    Function,
    /// No value (function return types only)
    Void,
    /// Not yet resolved
    Unknown,
    /// Sentinel for an expression that already failed; suppresses
    /// cascading diagnostics
    Error,
}

impl TypeTag {
    /// Returns true for `Int` and `Float`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::Float)
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Str => "string",
            TypeTag::Function => "function",
            TypeTag::Void => "void",
            TypeTag::Unknown => "unknown",
            TypeTag::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// What kind of binding a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A declared variable
    Variable,
    /// A function parameter
    Parameter,
    /// A declared function
    Function,
}

/// A function's declared signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Parameter types in declaration order
    pub params: Vec<TypeTag>,
    /// Declared return type
    pub return_type: TypeTag,
}

/// A single entry in the symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// The symbol's static type
    pub ty: TypeTag,
    /// The kind of binding
    pub kind: SymbolKind,
    /// The signature, for function symbols
    pub signature: Option<Signature>,
}

impl Symbol {
    /// Creates a variable symbol.
    pub fn variable(ty: TypeTag) -> Self {
        Self {
            ty,
            kind: SymbolKind::Variable,
            signature: None,
        }
    }

    /// Creates a parameter symbol.
    pub fn parameter(ty: TypeTag) -> Self {
        Self {
            ty,
            kind: SymbolKind::Parameter,
            signature: None,
        }
    }

    /// Creates a function symbol with its signature.
    pub fn function(params: Vec<TypeTag>, return_type: TypeTag) -> Self {
        Self {
            ty: TypeTag::Function,
            kind: SymbolKind::Function,
            signature: Some(Signature {
                params,
                return_type,
            }),
        }
    }
}

/// A stack of lexical scopes mapping names to symbols.
///
/// The table is never empty; index 0 is the global scope.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<FxHashMap<String, Symbol>>,
}

impl SymbolTable {
    /// Creates a table with only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    /// Pushes a new innermost scope.
    pub fn enter_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Pops the innermost scope.
    pub fn exit_scope(&mut self) -> Result<(), Error> {
        if self.scopes.len() == 1 {
            return Err(Error::InternalError(
                "attempted to exit the global scope".into(),
            ));
        }
        self.scopes.pop();
        Ok(())
    }

    /// Inserts a symbol into the innermost scope, overwriting any
    /// existing entry. Callers pre-check with `check_current_scope`.
    pub fn add_symbol(&mut self, name: &str, symbol: Symbol) {
        self.scopes
            .last_mut()
            .expect("symbol table always has a global scope")
            .insert(name.to_string(), symbol);
    }

    /// Returns true if the name is bound in the innermost scope.
    pub fn check_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .expect("symbol table always has a global scope")
            .contains_key(name)
    }

    /// Resolves a name, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Resolves a name for mutation, innermost scope first.
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    /// Current scope nesting depth (the global scope is depth 0).
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_finds_innermost_binding() {
        let mut table = SymbolTable::new();
        table.add_symbol("x", Symbol::variable(TypeTag::Int));
        table.enter_scope();
        table.add_symbol("x", Symbol::variable(TypeTag::Str));

        assert_eq!(table.lookup("x").unwrap().ty, TypeTag::Str);
        table.exit_scope().unwrap();
        assert_eq!(table.lookup("x").unwrap().ty, TypeTag::Int);
    }

    #[test]
    fn test_lookup_reaches_outer_scope() {
        let mut table = SymbolTable::new();
        table.add_symbol("x", Symbol::variable(TypeTag::Bool));
        table.enter_scope();

        assert_eq!(table.lookup("x").unwrap().ty, TypeTag::Bool);
    }

    #[test]
    fn test_check_current_scope_ignores_outer() {
        let mut table = SymbolTable::new();
        table.add_symbol("x", Symbol::variable(TypeTag::Int));
        table.enter_scope();

        assert!(!table.check_current_scope("x"));
        assert!(table.lookup("x").is_some());
    }

    #[test]
    fn test_exit_scope_discards_bindings() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.add_symbol("y", Symbol::variable(TypeTag::Float));
        table.exit_scope().unwrap();

        assert!(table.lookup("y").is_none());
    }

    #[test]
    fn test_exit_global_scope_is_an_error() {
        let mut table = SymbolTable::new();
        assert!(matches!(
            table.exit_scope(),
            Err(Error::InternalError(_))
        ));
    }

    #[test]
    fn test_function_symbol_carries_signature() {
        let symbol = Symbol::function(vec![TypeTag::Int, TypeTag::Int], TypeTag::Int);
        let signature = symbol.signature.as_ref().unwrap();
        assert_eq!(signature.params.len(), 2);
        assert_eq!(signature.return_type, TypeTag::Int);
    }
}
