//! AST to bytecode translation.
//!
//! A single forward pass: every construct is emitted in source order, and
//! any jump whose target lies ahead is emitted without an operand and
//! backpatched the moment the target index is known.

use crate::Error;
use crate::Value;
use crate::ast::*;

use super::bytecode::{Bytecode, Instruction, OpCode, Operand};

/// The Slate bytecode compiler.
pub struct Compiler {
    code: Bytecode,
}

impl Compiler {
    /// Creates a new compiler with an empty instruction buffer.
    pub fn new() -> Self {
        Self {
            code: Bytecode::new(),
        }
    }

    /// Compiles a program, ending the stream with `HALT`.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode, Error> {
        for statement in &program.statements {
            self.gen_statement(statement)?;
        }
        self.emit(OpCode::Halt);
        Ok(std::mem::take(&mut self.code))
    }

    fn emit(&mut self, opcode: OpCode) -> usize {
        self.code.emit(Instruction::new(opcode))
    }

    fn emit_with(&mut self, opcode: OpCode, operand: Operand) -> usize {
        self.code.emit(Instruction::with_operand(opcode, operand))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn gen_statement(&mut self, statement: &Statement) -> Result<(), Error> {
        match statement {
            Statement::VarDecl(decl) => self.gen_var_decl(decl),
            Statement::FunctionDecl(decl) => self.gen_function_decl(decl),
            Statement::Assign(assign) => self.gen_assign(assign),
            Statement::If(if_stmt) => self.gen_if(if_stmt),
            Statement::While(while_stmt) => self.gen_while(while_stmt),
            Statement::For(for_stmt) => self.gen_for(for_stmt),
            Statement::Return(ret) => self.gen_return(ret),
            Statement::Block(block) => self.gen_block(block),
            Statement::Expression(stmt) => {
                self.gen_expression(&stmt.expression)?;
                self.emit(OpCode::Print);
                Ok(())
            }
        }
    }

    fn gen_var_decl(&mut self, decl: &VarDecl) -> Result<(), Error> {
        match &decl.init {
            Some(init) => self.gen_expression(init)?,
            None => {
                // An uninitialized variable gets its type's zero value.
                let zero = match decl.ty {
                    TypeName::Int => Value::Int(0),
                    TypeName::Float => Value::Float(0.0),
                    TypeName::Bool => Value::Bool(false),
                    TypeName::Str => Value::Str(String::new()),
                    TypeName::Void => {
                        return Err(Error::InternalError(format!(
                            "variable '{}' has type 'void'",
                            decl.name
                        )));
                    }
                };
                self.emit_with(OpCode::LoadConst, Operand::Const(zero));
            }
        }
        self.emit_with(OpCode::DefineVar, Operand::Name(decl.name.clone()));
        Ok(())
    }

    fn gen_function_decl(&mut self, decl: &FunctionDecl) -> Result<(), Error> {
        // Bind the entry address to the function's name, then jump over
        // the body so declaration does not execute it. Both targets are
        // ahead of us, so both instructions start without an operand.
        let entry_const = self.emit(OpCode::LoadConst);
        self.emit_with(OpCode::DefineVar, Operand::Name(decl.name.clone()));
        let jump_over = self.emit(OpCode::Jump);

        let body_start = self.code.next_index();
        self.code
            .patch_operand(entry_const, Operand::Const(Value::Int(body_start as i64)));

        // Callers push arguments in declaration order, so the topmost
        // stack value is the last parameter: bind in reverse.
        for param in decl.params.iter().rev() {
            self.emit_with(OpCode::DefineVar, Operand::Name(param.name.clone()));
        }

        // Parameters and body locals share the call frame, so the body's
        // statements are emitted directly rather than as a block.
        for statement in &decl.body.statements {
            self.gen_statement(statement)?;
        }

        // Safety net for bodies that fall off the end without a return.
        self.emit_with(OpCode::LoadConst, Operand::Const(Value::Int(0)));
        self.emit(OpCode::Return);

        let after_body = self.code.next_index();
        self.code.patch_operand(jump_over, Operand::Addr(after_body));
        Ok(())
    }

    fn gen_assign(&mut self, assign: &Assign) -> Result<(), Error> {
        self.gen_expression(&assign.value)?;
        self.emit_with(OpCode::StoreVar, Operand::Name(assign.name.clone()));
        Ok(())
    }

    fn gen_if(&mut self, if_stmt: &IfStatement) -> Result<(), Error> {
        self.gen_expression(&if_stmt.condition)?;
        let skip_then = self.emit(OpCode::JumpIfFalse);

        self.gen_block(&if_stmt.then_block)?;

        match &if_stmt.else_block {
            Some(else_block) => {
                let skip_else = self.emit(OpCode::Jump);
                let else_start = self.code.next_index();
                self.code.patch_operand(skip_then, Operand::Addr(else_start));

                self.gen_block(else_block)?;

                let after = self.code.next_index();
                self.code.patch_operand(skip_else, Operand::Addr(after));
            }
            None => {
                let after = self.code.next_index();
                self.code.patch_operand(skip_then, Operand::Addr(after));
            }
        }
        Ok(())
    }

    fn gen_while(&mut self, while_stmt: &WhileStatement) -> Result<(), Error> {
        let loop_start = self.code.next_index();
        self.gen_expression(&while_stmt.condition)?;
        let exit_jump = self.emit(OpCode::JumpIfFalse);

        self.gen_block(&while_stmt.body)?;
        self.emit_with(OpCode::Jump, Operand::Addr(loop_start));

        let after = self.code.next_index();
        self.code.patch_operand(exit_jump, Operand::Addr(after));
        Ok(())
    }

    fn gen_for(&mut self, for_stmt: &ForStatement) -> Result<(), Error> {
        self.gen_statement(&for_stmt.init)?;

        let loop_start = self.code.next_index();
        self.gen_expression(&for_stmt.condition)?;
        let exit_jump = self.emit(OpCode::JumpIfFalse);

        self.gen_block(&for_stmt.body)?;
        // The update clause runs after each iteration's body.
        self.gen_statement(&for_stmt.update)?;
        self.emit_with(OpCode::Jump, Operand::Addr(loop_start));

        let after = self.code.next_index();
        self.code.patch_operand(exit_jump, Operand::Addr(after));
        Ok(())
    }

    fn gen_return(&mut self, ret: &ReturnStatement) -> Result<(), Error> {
        match &ret.value {
            Some(value) => self.gen_expression(value)?,
            None => {
                self.emit_with(OpCode::LoadConst, Operand::Const(Value::Int(0)));
            }
        }
        self.emit(OpCode::Return);
        Ok(())
    }

    fn gen_block(&mut self, block: &Block) -> Result<(), Error> {
        self.emit(OpCode::EnterScope);
        for statement in &block.statements {
            self.gen_statement(statement)?;
        }
        self.emit(OpCode::ExitScope);
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn gen_expression(&mut self, expression: &Expression) -> Result<(), Error> {
        match expression {
            Expression::Literal(literal) => {
                let value = match literal {
                    Literal::Int(v) => Value::Int(*v),
                    Literal::Float(v) => Value::Float(*v),
                    Literal::Bool(v) => Value::Bool(*v),
                    Literal::Str(v) => Value::Str(v.clone()),
                };
                self.emit_with(OpCode::LoadConst, Operand::Const(value));
                Ok(())
            }
            Expression::Identifier(id) => {
                self.emit_with(OpCode::LoadVar, Operand::Name(id.name.clone()));
                Ok(())
            }
            Expression::Binary(bin) => self.gen_binary(bin),
            Expression::Unary(unary) => self.gen_unary(unary),
            Expression::Call(call) => self.gen_call(call),
        }
    }

    fn gen_binary(&mut self, bin: &BinaryExpression) -> Result<(), Error> {
        self.gen_expression(&bin.left)?;
        self.gen_expression(&bin.right)?;

        match bin.operator {
            BinaryOperator::Add => self.emit(OpCode::Add),
            BinaryOperator::Subtract => self.emit(OpCode::Sub),
            BinaryOperator::Multiply => self.emit(OpCode::Mul),
            BinaryOperator::Divide => self.emit(OpCode::Div),
            BinaryOperator::Modulo => self.emit(OpCode::Mod),
            // Comparison and logical operators share one opcode and carry
            // the operator as an operand.
            op => self.emit_with(OpCode::Compare, Operand::Compare(op)),
        };
        Ok(())
    }

    fn gen_unary(&mut self, unary: &UnaryExpression) -> Result<(), Error> {
        self.gen_expression(&unary.argument)?;
        match unary.operator {
            UnaryOperator::Minus => self.emit(OpCode::Negate),
            UnaryOperator::Not => self.emit(OpCode::Not),
        };
        Ok(())
    }

    fn gen_call(&mut self, call: &CallExpression) -> Result<(), Error> {
        for argument in &call.arguments {
            self.gen_expression(argument)?;
        }
        self.emit_with(OpCode::LoadVar, Operand::Name(call.callee.name.clone()));
        self.emit(OpCode::Call);
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
