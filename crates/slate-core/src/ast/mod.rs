//! Abstract Syntax Tree (AST) definitions for Slate.
//!
//! The tree is a closed set of variants; the analyzer and the bytecode
//! compiler dispatch over it with exhaustive matches and never mutate it.

use std::fmt;

/// A complete Slate program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The top-level statements
    pub statements: Vec<Statement>,
}

/// A Slate statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration `type name = expr;`
    VarDecl(VarDecl),
    /// Function declaration `type name(params) { ... }`
    FunctionDecl(FunctionDecl),
    /// Assignment `name = expr;`
    Assign(Assign),
    /// If statement
    If(IfStatement),
    /// While loop
    While(WhileStatement),
    /// For loop
    For(ForStatement),
    /// Return statement
    Return(ReturnStatement),
    /// Block statement `{ ... }`
    Block(Block),
    /// Expression statement `expr;`
    Expression(ExprStatement),
}

/// A source-level type annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `string`
    Str,
    /// `void` (function return types only)
    Void,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeName::Int => "int",
            TypeName::Float => "float",
            TypeName::Bool => "bool",
            TypeName::Str => "string",
            TypeName::Void => "void",
        };
        write!(f, "{}", name)
    }
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// The declared type
    pub ty: TypeName,
    /// The variable name
    pub name: String,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// The declared return type
    pub return_type: TypeName,
    /// The function name
    pub name: String,
    /// The parameters, in declaration order
    pub params: Vec<Param>,
    /// The function body
    pub body: Block,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The parameter type
    pub ty: TypeName,
    /// The parameter name
    pub name: String,
}

/// An assignment to an existing binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    /// The target name
    pub name: String,
    /// The assigned value
    pub value: Expression,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub condition: Expression,
    /// The then branch
    pub then_block: Block,
    /// The optional else branch
    pub else_block: Option<Block>,
}

/// A while loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The condition
    pub condition: Expression,
    /// The loop body
    pub body: Block,
}

/// A for loop.
///
/// The init and update clauses live in the loop's enclosing scope; only
/// the body opens a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// The initializer (assignment or variable declaration)
    pub init: Box<Statement>,
    /// The loop condition
    pub condition: Expression,
    /// The update clause, run after each iteration's body
    pub update: Box<Statement>,
    /// The loop body
    pub body: Block,
}

/// A return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// The returned value, if any
    pub value: Option<Expression>,
}

/// A block of statements delimiting a lexical scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The statements in the block
    pub statements: Vec<Statement>,
}

/// An expression statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprStatement {
    /// The expression
    pub expression: Expression,
}

/// A Slate expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(Identifier),
    /// Binary expression
    Binary(BinaryExpression),
    /// Unary expression
    Unary(UnaryExpression),
    /// Function call
    Call(CallExpression),
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// String literal
    Str(String),
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    // Comparison
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `<=`
    LessThanEqual,
    /// `>=`
    GreaterThanEqual,
    // Logical
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
}

impl BinaryOperator {
    /// Returns true for `+ - * / %`.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
        )
    }

    /// Returns true for `== != < > <= >=`.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::GreaterThan
                | BinaryOperator::LessThanEqual
                | BinaryOperator::GreaterThanEqual
        )
    }

    /// Returns true for `&& ||`.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessThanEqual => "<=",
            BinaryOperator::GreaterThanEqual => ">=",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LogicalOr => "||",
        };
        write!(f, "{}", token)
    }
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `-`
    Minus,
    /// `!`
    Not,
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The function being called
    pub callee: Identifier,
    /// The arguments, in source order
    pub arguments: Vec<Expression>,
}
