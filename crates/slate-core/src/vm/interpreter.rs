//! The fetch-decode-execute loop.

use rustc_hash::FxHashMap;

use crate::Error;
use crate::Value;
use crate::ast::BinaryOperator;
use crate::compiler::{Bytecode, Instruction, OpCode, Operand};

/// Bookkeeping for one active function call.
///
/// `frame_depth` is the frame count recorded before the callee's frame
/// was pushed, so a return can unwind block frames the body entered but
/// never exited.
#[derive(Debug, Clone, Copy)]
struct CallInfo {
    return_addr: usize,
    frame_depth: usize,
}

/// The Slate virtual machine.
pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<FxHashMap<String, Value>>,
    calls: Vec<CallInfo>,
    output: Vec<Value>,
}

impl Vm {
    /// Creates a new virtual machine with an empty global frame.
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            frames: vec![FxHashMap::default()],
            calls: Vec::new(),
            output: Vec::new(),
        }
    }

    /// The global frame's bindings.
    pub fn globals(&self) -> &FxHashMap<String, Value> {
        &self.frames[0]
    }

    /// The values surfaced by `PRINT`, in execution order.
    pub fn output(&self) -> &[Value] {
        &self.output
    }

    /// Executes the bytecode from instruction 0 to `HALT` (or the end of
    /// the stream).
    ///
    /// All machine state is reset first, so re-running the same bytecode
    /// yields identical results.
    pub fn run(&mut self, bytecode: &Bytecode) -> Result<(), Error> {
        self.stack.clear();
        self.frames.clear();
        self.frames.push(FxHashMap::default());
        self.calls.clear();
        self.output.clear();

        let mut pc = 0;
        while pc < bytecode.instructions.len() {
            let instruction = &bytecode.instructions[pc];

            match instruction.opcode {
                OpCode::LoadConst => {
                    let value = expect_const(instruction)?;
                    self.stack.push(value.clone());
                }
                OpCode::LoadVar => {
                    let name = expect_name(instruction)?;
                    let value = self
                        .lookup(name)
                        .ok_or_else(|| {
                            Error::RuntimeError(format!("undefined variable '{}'", name))
                        })?
                        .clone();
                    self.stack.push(value);
                }
                OpCode::StoreVar => {
                    let value = self.pop()?;
                    let name = expect_name(instruction)?;
                    let slot = self.lookup_mut(name).ok_or_else(|| {
                        Error::RuntimeError(format!("undefined variable '{}'", name))
                    })?;
                    *slot = value;
                }
                OpCode::DefineVar => {
                    let value = self.pop()?;
                    let name = expect_name(instruction)?;
                    self.frames
                        .last_mut()
                        .expect("frame stack is never empty")
                        .insert(name.to_string(), value);
                }
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    let result = arithmetic(instruction.opcode, &left, &right)?;
                    self.stack.push(result);
                }
                OpCode::Compare => {
                    let Some(Operand::Compare(op)) = &instruction.operand else {
                        return Err(Error::InternalError(
                            "COMPARE without an operator operand".into(),
                        ));
                    };
                    let right = self.pop()?;
                    let left = self.pop()?;
                    let result = compare(*op, &left, &right)?;
                    self.stack.push(Value::Bool(result));
                }
                OpCode::Negate => {
                    let value = self.pop()?;
                    let negated = match value {
                        Value::Int(v) => Value::Int(v.checked_neg().ok_or_else(|| {
                            Error::RuntimeError("integer overflow in negation".into())
                        })?),
                        Value::Float(v) => Value::Float(-v),
                        other => {
                            return Err(Error::RuntimeError(format!(
                                "cannot negate a '{}'",
                                other.type_of()
                            )));
                        }
                    };
                    self.stack.push(negated);
                }
                OpCode::Not => {
                    let value = self.pop()?;
                    self.stack.push(Value::Bool(!value.is_truthy()));
                }
                OpCode::Jump => {
                    pc = expect_addr(instruction)?;
                    continue;
                }
                OpCode::JumpIfFalse => {
                    let target = expect_addr(instruction)?;
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        pc = target;
                        continue;
                    }
                }
                OpCode::EnterScope => {
                    self.frames.push(FxHashMap::default());
                }
                OpCode::ExitScope => {
                    if self.frames.len() == 1 {
                        return Err(Error::InternalError(
                            "attempted to exit the global frame".into(),
                        ));
                    }
                    self.frames.pop();
                }
                OpCode::Call => {
                    let callee = self.pop()?;
                    let Value::Int(entry) = callee else {
                        return Err(Error::RuntimeError(format!(
                            "call target is not a function (got '{}')",
                            callee.type_of()
                        )));
                    };
                    if entry < 0 {
                        return Err(Error::InternalError(format!(
                            "negative entry address {}",
                            entry
                        )));
                    }
                    self.calls.push(CallInfo {
                        return_addr: pc,
                        frame_depth: self.frames.len(),
                    });
                    self.frames.push(FxHashMap::default());
                    pc = entry as usize;
                    continue;
                }
                OpCode::Return => {
                    let value = self.pop()?;
                    let Some(info) = self.calls.pop() else {
                        // Top-level return stops the program.
                        break;
                    };
                    self.frames.truncate(info.frame_depth);
                    self.stack.push(value);
                    pc = info.return_addr + 1;
                    continue;
                }
                OpCode::Print => {
                    let value = self.pop()?;
                    self.output.push(value);
                }
                OpCode::Halt => break,
            }

            pc += 1;
        }

        Ok(())
    }

    fn pop(&mut self) -> Result<Value, Error> {
        self.stack
            .pop()
            .ok_or_else(|| Error::RuntimeError("stack underflow".into()))
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn expect_const(instruction: &Instruction) -> Result<&Value, Error> {
    match &instruction.operand {
        Some(Operand::Const(value)) => Ok(value),
        _ => Err(Error::InternalError(format!(
            "{} without a constant operand",
            instruction.opcode
        ))),
    }
}

fn expect_name(instruction: &Instruction) -> Result<&str, Error> {
    match &instruction.operand {
        Some(Operand::Name(name)) => Ok(name),
        _ => Err(Error::InternalError(format!(
            "{} without a name operand",
            instruction.opcode
        ))),
    }
}

fn expect_addr(instruction: &Instruction) -> Result<usize, Error> {
    match &instruction.operand {
        Some(Operand::Addr(addr)) => Ok(*addr),
        _ => Err(Error::InternalError(format!(
            "{} without an address operand",
            instruction.opcode
        ))),
    }
}

/// Integer pairs stay integral (checked, truncating division); any float
/// operand promotes both sides to f64.
fn arithmetic(opcode: OpCode, left: &Value, right: &Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match opcode {
                OpCode::Add => a.checked_add(*b),
                OpCode::Sub => a.checked_sub(*b),
                OpCode::Mul => a.checked_mul(*b),
                OpCode::Div => {
                    if *b == 0 {
                        return Err(Error::RuntimeError("division by zero".into()));
                    }
                    a.checked_div(*b)
                }
                OpCode::Mod => {
                    if *b == 0 {
                        return Err(Error::RuntimeError("modulo by zero".into()));
                    }
                    a.checked_rem(*b)
                }
                _ => unreachable!("arithmetic called with non-arithmetic opcode"),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| Error::RuntimeError("integer overflow".into()))
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
                return Err(Error::RuntimeError(format!(
                    "arithmetic needs numbers, got '{}' and '{}'",
                    left.type_of(),
                    right.type_of()
                )));
            };
            let result = match opcode {
                OpCode::Add => a + b,
                OpCode::Sub => a - b,
                OpCode::Mul => a * b,
                OpCode::Div => a / b,
                OpCode::Mod => a % b,
                _ => unreachable!("arithmetic called with non-arithmetic opcode"),
            };
            Ok(Value::Float(result))
        }
    }
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Result<bool, Error> {
    use std::cmp::Ordering;

    let ordering = || {
        left.partial_order(right).ok_or_else(|| {
            Error::RuntimeError(format!(
                "cannot order '{}' and '{}'",
                left.type_of(),
                right.type_of()
            ))
        })
    };

    match op {
        BinaryOperator::Equal => Ok(left == right),
        BinaryOperator::NotEqual => Ok(left != right),
        BinaryOperator::LessThan => Ok(ordering()? == Ordering::Less),
        BinaryOperator::GreaterThan => Ok(ordering()? == Ordering::Greater),
        BinaryOperator::LessThanEqual => Ok(ordering()? != Ordering::Greater),
        BinaryOperator::GreaterThanEqual => Ok(ordering()? != Ordering::Less),
        BinaryOperator::LogicalAnd => Ok(left.is_truthy() && right.is_truthy()),
        BinaryOperator::LogicalOr => Ok(left.is_truthy() || right.is_truthy()),
        other => Err(Error::InternalError(format!(
            "'{}' is not a comparison operator",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Compiler, Parser};

    fn run(source: &str) -> Vm {
        let program = Parser::new(source).parse_program().expect("should parse");
        let bytecode = Compiler::new().compile(&program).expect("should compile");
        let mut vm = Vm::new();
        vm.run(&bytecode).expect("should run");
        vm
    }

    fn run_err(source: &str) -> Error {
        let program = Parser::new(source).parse_program().expect("should parse");
        let bytecode = Compiler::new().compile(&program).expect("should compile");
        let mut vm = Vm::new();
        vm.run(&bytecode).expect_err("should fail at runtime")
    }

    #[test]
    fn test_define_and_load() {
        let vm = run("int x = 42; x;");
        assert_eq!(vm.globals()["x"], Value::Int(42));
        assert_eq!(vm.output(), &[Value::Int(42)]);
    }

    #[test]
    fn test_arithmetic_precedence() {
        let vm = run("int a = 10 + 5 * 2; int b = (10 + 5) * 2;");
        assert_eq!(vm.globals()["a"], Value::Int(20));
        assert_eq!(vm.globals()["b"], Value::Int(30));
    }

    #[test]
    fn test_integer_division_truncates() {
        let vm = run("int q = 7 / 2; int r = 7 % 3;");
        assert_eq!(vm.globals()["q"], Value::Int(3));
        assert_eq!(vm.globals()["r"], Value::Int(1));
    }

    #[test]
    fn test_float_promotion() {
        let vm = run("float area = 3.14 * 2 * 2;");
        assert_eq!(vm.globals()["area"], Value::Float(12.56));
    }

    #[test]
    fn test_division_by_zero_is_fatal() {
        let err = run_err("int x = 1 / 0;");
        assert!(matches!(err, Error::RuntimeError(_)));
    }

    #[test]
    fn test_modulo_by_zero_is_fatal() {
        let err = run_err("int x = 1 % 0;");
        assert!(matches!(err, Error::RuntimeError(_)));
    }

    #[test]
    fn test_integer_overflow_is_fatal() {
        let err = run_err("int x = 9223372036854775807 + 1;");
        assert!(matches!(err, Error::RuntimeError(_)));
    }

    #[test]
    fn test_unary_operators() {
        let vm = run("int x = -5; bool b = !false; int y = -(-5);");
        assert_eq!(vm.globals()["x"], Value::Int(-5));
        assert_eq!(vm.globals()["b"], Value::Bool(true));
        assert_eq!(vm.globals()["y"], Value::Int(5));
    }

    #[test]
    fn test_if_else_branches() {
        let vm = run("int x = 10; int y = 0; if (x > 5) { y = 1; } else { y = 2; }");
        assert_eq!(vm.globals()["y"], Value::Int(1));

        let vm = run("int x = 3; int y = 0; if (x > 5) { y = 1; } else { y = 2; }");
        assert_eq!(vm.globals()["y"], Value::Int(2));
    }

    #[test]
    fn test_while_factorial() {
        let vm = run(
            "int n = 5; int result = 1; while (n > 0) { result = result * n; n = n - 1; }",
        );
        assert_eq!(vm.globals()["result"], Value::Int(120));
    }

    #[test]
    fn test_for_loop_sum_and_final_counter() {
        let vm = run("int sum = 0; for (int i = 0; i < 5; i = i + 1) { sum = sum + i; }");
        assert_eq!(vm.globals()["sum"], Value::Int(10));
    }

    #[test]
    fn test_block_shadowing_restores_outer() {
        let vm = run("int x = 10; { int x = 99; x = 100; } x;");
        assert_eq!(vm.globals()["x"], Value::Int(10));
        assert_eq!(vm.output(), &[Value::Int(10)]);
    }

    #[test]
    fn test_inner_assignment_reaches_outer_binding() {
        let vm = run("int x = 1; { x = 2; }");
        assert_eq!(vm.globals()["x"], Value::Int(2));
    }

    #[test]
    fn test_function_call_and_return() {
        let vm = run("int add(int a, int b) { return a + b; } int r = add(10, 20);");
        assert_eq!(vm.globals()["r"], Value::Int(30));
    }

    #[test]
    fn test_recursion_fibonacci() {
        let vm = run(
            "int fib(int n) { if (n <= 1) { return n; } return fib(n - 1) + fib(n - 2); } \
             int r = fib(6);",
        );
        assert_eq!(vm.globals()["r"], Value::Int(8));
    }

    #[test]
    fn test_early_return_unwinds_block_frames() {
        // The return fires inside two nested blocks; the frames they
        // pushed must not survive the call.
        let vm = run(
            "int pick(int n) { { if (n > 0) { return 1; } } return 2; } \
             int a = pick(5); int b = pick(0);",
        );
        assert_eq!(vm.globals()["a"], Value::Int(1));
        assert_eq!(vm.globals()["b"], Value::Int(2));
    }

    #[test]
    fn test_function_locals_stay_out_of_globals() {
        let vm = run("int f() { int local = 7; return local; } int r = f();");
        assert_eq!(vm.globals()["r"], Value::Int(7));
        assert!(!vm.globals().contains_key("local"));
    }

    #[test]
    fn test_string_comparison_and_concat_free_equality() {
        let vm = run("string s = \"abc\"; bool eq = s == \"abc\"; bool lt = \"a\" < \"b\";");
        assert_eq!(vm.globals()["eq"], Value::Bool(true));
        assert_eq!(vm.globals()["lt"], Value::Bool(true));
    }

    #[test]
    fn test_boolean_ordering() {
        // false < true, matching the comparison the analyzer accepts
        let vm = run("bool a = true < false; bool b = false < true; bool c = true >= true;");
        assert_eq!(vm.globals()["a"], Value::Bool(false));
        assert_eq!(vm.globals()["b"], Value::Bool(true));
        assert_eq!(vm.globals()["c"], Value::Bool(true));
    }

    #[test]
    fn test_mixed_numeric_equality() {
        let vm = run("bool b = 2 == 2.0;");
        assert_eq!(vm.globals()["b"], Value::Bool(true));
    }

    #[test]
    fn test_logical_operators() {
        let vm = run("bool a = true && false; bool b = true || false;");
        assert_eq!(vm.globals()["a"], Value::Bool(false));
        assert_eq!(vm.globals()["b"], Value::Bool(true));
    }

    #[test]
    fn test_stack_is_empty_after_halt() {
        let vm = run("int x = 1; x = x + 1; { int y = 2; } 3;");
        assert!(vm.stack.is_empty());
    }

    #[test]
    fn test_rerun_resets_state() {
        let program = Parser::new("int x = 1; x = x + 1;")
            .parse_program()
            .unwrap();
        let bytecode = Compiler::new().compile(&program).unwrap();

        let mut vm = Vm::new();
        vm.run(&bytecode).unwrap();
        let first = vm.globals()["x"].clone();
        vm.run(&bytecode).unwrap();

        assert_eq!(vm.globals()["x"], first);
    }

    #[test]
    fn test_deep_recursion_does_not_overflow_host_stack() {
        let vm = run(
            "int count(int n) { if (n == 0) { return 0; } return count(n - 1); } \
             int r = count(10000);",
        );
        assert_eq!(vm.globals()["r"], Value::Int(0));
    }
}
