//! Bytecode instruction definitions.

use std::fmt;

use crate::Value;
use crate::ast::BinaryOperator;

/// The instruction set of the Slate virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Push a constant onto the stack
    LoadConst,
    /// Push a variable's value onto the stack
    LoadVar,
    /// Pop a value and update an existing binding
    StoreVar,
    /// Pop a value and create a fresh binding in the current frame
    DefineVar,
    /// Pop two values, push their sum
    Add,
    /// Pop two values, push their difference
    Sub,
    /// Pop two values, push their product
    Mul,
    /// Pop two values, push their quotient
    Div,
    /// Pop two values, push their remainder
    Mod,
    /// Pop two values, push the comparison result (operator in operand)
    Compare,
    /// Pop a number, push its negation
    Negate,
    /// Pop a boolean, push its logical inverse
    Not,
    /// Jump unconditionally to the operand address
    Jump,
    /// Pop a value; jump to the operand address if it is falsy
    JumpIfFalse,
    /// Push a new block frame
    EnterScope,
    /// Pop the innermost block frame
    ExitScope,
    /// Pop an entry address and call the function at it
    Call,
    /// Pop a return value, unwind to the caller
    Return,
    /// Pop a value and append it to the output channel
    Print,
    /// Stop execution
    Halt,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::LoadConst => "LOAD_CONST",
            OpCode::LoadVar => "LOAD_VAR",
            OpCode::StoreVar => "STORE_VAR",
            OpCode::DefineVar => "DEFINE_VAR",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Compare => "COMPARE",
            OpCode::Negate => "NEGATE",
            OpCode::Not => "NOT",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::EnterScope => "ENTER_SCOPE",
            OpCode::ExitScope => "EXIT_SCOPE",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::Print => "PRINT",
            OpCode::Halt => "HALT",
        };
        write!(f, "{}", name)
    }
}

/// An instruction's operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A constant value
    Const(Value),
    /// A variable name
    Name(String),
    /// A comparison or logical operator
    Compare(BinaryOperator),
    /// An instruction address
    Addr(usize),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(value) => write!(f, "{}", value),
            Operand::Name(name) => write!(f, "{}", name),
            Operand::Compare(op) => write!(f, "{}", op),
            Operand::Addr(addr) => write!(f, "{}", addr),
        }
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The opcode
    pub opcode: OpCode,
    /// The optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Creates an instruction without an operand.
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Creates an instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "{},{}", self.opcode, operand),
            None => write!(f, "{}", self.opcode),
        }
    }
}

/// A compiled Slate program: a flat, zero-indexed instruction stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
}

impl Bytecode {
    /// Creates an empty bytecode buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Replaces the operand of an already emitted instruction.
    ///
    /// Only the operand changes; the opcode and position stay fixed.
    pub fn patch_operand(&mut self, index: usize, operand: Operand) {
        self.instructions[index].operand = Some(operand);
    }

    /// The index the next emitted instruction will receive.
    pub fn next_index(&self) -> usize {
        self.instructions.len()
    }

    /// Renders the whole listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        let mut listing = String::new();
        for instruction in &self.instructions {
            listing.push_str(&instruction.to_string());
            listing.push('\n');
        }
        listing
    }
}
