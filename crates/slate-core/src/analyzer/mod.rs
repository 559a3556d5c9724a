//! Semantic analysis for Slate.
//!
//! A scope-aware pass over the AST that registers declarations in a
//! symbol table and type-checks every expression before any bytecode is
//! generated. Violations split two ways: structural errors (undefined
//! names, redeclarations, declaration/assignment type mismatches) are
//! fatal and abort the pipeline, while expression-level mismatches are
//! recorded as diagnostics and poison the offending expression with an
//! `Error` tag so one mistake does not cascade into a wall of reports.

mod symbols;

pub use symbols::{Signature, Symbol, SymbolKind, SymbolTable, TypeTag};

use crate::Error;
use crate::ast::*;

/// The Slate semantic analyzer.
///
/// One analyzer instance handles one program; create a fresh one per run.
pub struct Analyzer {
    symbols: SymbolTable,
    diagnostics: Vec<String>,
}

impl Analyzer {
    /// Creates a new analyzer with an empty global scope.
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Analyzes a program.
    ///
    /// Returns `Err` on the first fatal violation. Non-fatal findings are
    /// collected and retrievable via [`Analyzer::into_diagnostics`].
    pub fn analyze(&mut self, program: &Program) -> Result<(), Error> {
        for statement in &program.statements {
            self.visit_statement(statement)?;
        }
        Ok(())
    }

    /// Consumes the analyzer, returning the collected diagnostics.
    pub fn into_diagnostics(self) -> Vec<String> {
        self.diagnostics
    }

    /// Read access to the collected diagnostics.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    fn report(&mut self, message: String) {
        self.diagnostics.push(message);
    }

    /// Runs `f` inside a fresh scope, popping it even when `f` fails.
    fn with_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.symbols.enter_scope();
        let result = f(self);
        self.symbols.exit_scope()?;
        result
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn visit_statement(&mut self, statement: &Statement) -> Result<(), Error> {
        match statement {
            Statement::VarDecl(decl) => self.visit_var_decl(decl),
            Statement::FunctionDecl(decl) => self.visit_function_decl(decl),
            Statement::Assign(assign) => self.visit_assign(assign).map(|_| ()),
            Statement::If(if_stmt) => self.visit_if(if_stmt),
            Statement::While(while_stmt) => self.visit_while(while_stmt),
            Statement::For(for_stmt) => self.visit_for(for_stmt),
            Statement::Return(ret) => self.visit_return(ret),
            Statement::Block(block) => self.visit_block(block),
            Statement::Expression(stmt) => self.visit_expression(&stmt.expression).map(|_| ()),
        }
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) -> Result<(), Error> {
        let declared = type_tag(decl.ty);

        if let Some(init) = &decl.init {
            let expr_ty = self.visit_expression(init)?;
            if expr_ty != declared && expr_ty != TypeTag::Error {
                return Err(Error::TypeMismatch(format!(
                    "variable '{}' is declared '{}' but initialized with '{}'",
                    decl.name, declared, expr_ty
                )));
            }
        }

        if self.symbols.check_current_scope(&decl.name) {
            return Err(Error::Redeclaration(format!(
                "'{}' is already declared in this scope",
                decl.name
            )));
        }
        self.symbols.add_symbol(&decl.name, Symbol::variable(declared));
        Ok(())
    }

    fn visit_function_decl(&mut self, decl: &FunctionDecl) -> Result<(), Error> {
        // Register the signature in the enclosing scope before the body so
        // the function can call itself.
        if self.symbols.check_current_scope(&decl.name) {
            self.report(format!("function '{}' is already declared", decl.name));
        } else {
            let params = decl.params.iter().map(|p| type_tag(p.ty)).collect();
            let symbol = Symbol::function(params, type_tag(decl.return_type));
            self.symbols.add_symbol(&decl.name, symbol);
        }

        // Parameters and body locals share one scope, so a local that
        // redeclares a parameter is caught as a redeclaration.
        self.with_scope(|analyzer| {
            for param in &decl.params {
                if analyzer.symbols.check_current_scope(&param.name) {
                    return Err(Error::Redeclaration(format!(
                        "parameter '{}' is already declared in function '{}'",
                        param.name, decl.name
                    )));
                }
                analyzer
                    .symbols
                    .add_symbol(&param.name, Symbol::parameter(type_tag(param.ty)));
            }
            for statement in &decl.body.statements {
                analyzer.visit_statement(statement)?;
            }
            Ok(())
        })
    }

    fn visit_assign(&mut self, assign: &Assign) -> Result<TypeTag, Error> {
        let value_ty = self.visit_expression(&assign.value)?;

        let Some(symbol) = self.symbols.lookup_mut(&assign.name) else {
            return Err(Error::UndefinedVariable(format!(
                "'{}' is not declared",
                assign.name
            )));
        };

        if symbol.ty == TypeTag::Unknown {
            symbol.ty = value_ty;
        } else if symbol.ty != value_ty && value_ty != TypeTag::Error {
            return Err(Error::TypeMismatch(format!(
                "cannot assign '{}' to '{}' (declared '{}')",
                value_ty, assign.name, symbol.ty
            )));
        }

        Ok(symbol.ty)
    }

    fn visit_if(&mut self, if_stmt: &IfStatement) -> Result<(), Error> {
        self.check_condition("if", &if_stmt.condition)?;
        self.visit_block(&if_stmt.then_block)?;
        if let Some(else_block) = &if_stmt.else_block {
            self.visit_block(else_block)?;
        }
        Ok(())
    }

    fn visit_while(&mut self, while_stmt: &WhileStatement) -> Result<(), Error> {
        self.check_condition("while", &while_stmt.condition)?;
        self.visit_block(&while_stmt.body)
    }

    fn visit_for(&mut self, for_stmt: &ForStatement) -> Result<(), Error> {
        // Init and update live in the enclosing scope; only the body block
        // opens a new one.
        self.visit_statement(&for_stmt.init)?;
        self.check_condition("for", &for_stmt.condition)?;
        self.visit_statement(&for_stmt.update)?;
        self.visit_block(&for_stmt.body)
    }

    fn check_condition(&mut self, construct: &str, condition: &Expression) -> Result<(), Error> {
        let condition_ty = self.visit_expression(condition)?;
        if condition_ty != TypeTag::Bool && condition_ty != TypeTag::Error {
            self.report(format!(
                "{} condition must be 'bool', found '{}'",
                construct, condition_ty
            ));
        }
        Ok(())
    }

    fn visit_return(&mut self, ret: &ReturnStatement) -> Result<(), Error> {
        if let Some(value) = &ret.value {
            self.visit_expression(value)?;
        }
        Ok(())
    }

    fn visit_block(&mut self, block: &Block) -> Result<(), Error> {
        self.with_scope(|analyzer| {
            for statement in &block.statements {
                analyzer.visit_statement(statement)?;
            }
            Ok(())
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn visit_expression(&mut self, expression: &Expression) -> Result<TypeTag, Error> {
        match expression {
            Expression::Literal(literal) => Ok(literal_tag(literal)),
            Expression::Identifier(id) => self.visit_identifier(id),
            Expression::Binary(bin) => self.visit_binary(bin),
            Expression::Unary(unary) => self.visit_unary(unary),
            Expression::Call(call) => self.visit_call(call),
        }
    }

    fn visit_identifier(&mut self, id: &Identifier) -> Result<TypeTag, Error> {
        match self.symbols.lookup(&id.name) {
            Some(symbol) => Ok(symbol.ty),
            None => Err(Error::UndefinedVariable(format!(
                "'{}' is not declared",
                id.name
            ))),
        }
    }

    fn visit_binary(&mut self, bin: &BinaryExpression) -> Result<TypeTag, Error> {
        let left = self.visit_expression(&bin.left)?;
        let right = self.visit_expression(&bin.right)?;

        if left == TypeTag::Error || right == TypeTag::Error {
            return Ok(TypeTag::Error);
        }

        let op = bin.operator;
        if op.is_arithmetic() {
            if left.is_numeric() && right.is_numeric() {
                if left == TypeTag::Float || right == TypeTag::Float {
                    Ok(TypeTag::Float)
                } else {
                    Ok(TypeTag::Int)
                }
            } else {
                self.report(format!(
                    "operator '{}' needs numeric operands, found '{}' and '{}'",
                    op, left, right
                ));
                Ok(TypeTag::Error)
            }
        } else if op.is_comparison() {
            if left == right || (left.is_numeric() && right.is_numeric()) {
                Ok(TypeTag::Bool)
            } else {
                self.report(format!(
                    "cannot compare '{}' with '{}'",
                    left, right
                ));
                Ok(TypeTag::Error)
            }
        } else {
            // Logical && / ||
            if left == TypeTag::Bool && right == TypeTag::Bool {
                Ok(TypeTag::Bool)
            } else {
                self.report(format!(
                    "operator '{}' needs 'bool' operands, found '{}' and '{}'",
                    op, left, right
                ));
                Ok(TypeTag::Error)
            }
        }
    }

    fn visit_unary(&mut self, unary: &UnaryExpression) -> Result<TypeTag, Error> {
        let operand = self.visit_expression(&unary.argument)?;
        if operand == TypeTag::Error {
            return Ok(TypeTag::Error);
        }

        match unary.operator {
            UnaryOperator::Not => {
                if operand == TypeTag::Bool {
                    Ok(TypeTag::Bool)
                } else {
                    self.report(format!(
                        "operator '!' needs a 'bool' operand, found '{}'",
                        operand
                    ));
                    Ok(TypeTag::Error)
                }
            }
            UnaryOperator::Minus => {
                if operand.is_numeric() {
                    Ok(operand)
                } else {
                    self.report(format!(
                        "operator '-' needs a numeric operand, found '{}'",
                        operand
                    ));
                    Ok(TypeTag::Error)
                }
            }
        }
    }

    fn visit_call(&mut self, call: &CallExpression) -> Result<TypeTag, Error> {
        let name = &call.callee.name;

        let Some(symbol) = self.symbols.lookup(name) else {
            self.report(format!("call to undeclared function '{}'", name));
            return Ok(TypeTag::Error);
        };
        if symbol.kind != SymbolKind::Function {
            self.report(format!("'{}' is not a function", name));
            return Ok(TypeTag::Error);
        }

        let signature = symbol
            .signature
            .clone()
            .ok_or_else(|| Error::InternalError(format!("function '{}' has no signature", name)))?;

        if call.arguments.len() != signature.params.len() {
            self.report(format!(
                "function '{}' expects {} argument(s), {} given",
                name,
                signature.params.len(),
                call.arguments.len()
            ));
            return Ok(TypeTag::Error);
        }

        for (index, (argument, expected)) in call
            .arguments
            .iter()
            .zip(signature.params.iter())
            .enumerate()
        {
            let argument_ty = self.visit_expression(argument)?;
            if argument_ty != *expected && argument_ty != TypeTag::Error {
                self.report(format!(
                    "argument {} of '{}' must be '{}', found '{}'",
                    index + 1,
                    name,
                    expected,
                    argument_ty
                ));
            }
        }

        Ok(signature.return_type)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn type_tag(ty: TypeName) -> TypeTag {
    match ty {
        TypeName::Int => TypeTag::Int,
        TypeName::Float => TypeTag::Float,
        TypeName::Bool => TypeTag::Bool,
        TypeName::Str => TypeTag::Str,
        TypeName::Void => TypeTag::Void,
    }
}

fn literal_tag(literal: &Literal) -> TypeTag {
    match literal {
        Literal::Int(_) => TypeTag::Int,
        Literal::Float(_) => TypeTag::Float,
        Literal::Bool(_) => TypeTag::Bool,
        Literal::Str(_) => TypeTag::Str,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;

    fn analyze(source: &str) -> Result<Vec<String>, Error> {
        let program = Parser::new(source).parse_program()?;
        let mut analyzer = Analyzer::new();
        analyzer.analyze(&program)?;
        Ok(analyzer.into_diagnostics())
    }

    fn analyze_ok(source: &str) -> Vec<String> {
        analyze(source).expect("analysis should succeed")
    }

    #[test]
    fn test_valid_program_has_no_diagnostics() {
        let diagnostics = analyze_ok("int x = 10; float y = 2.5; x = x + 1;");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_declaration_type_mismatch_is_fatal() {
        let err = analyze("string s = 34;").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn test_redeclaration_in_same_scope_is_fatal() {
        let err = analyze("int x = 1; int x = 2;").unwrap_err();
        assert!(matches!(err, Error::Redeclaration(_)));
    }

    #[test]
    fn test_shadowing_in_inner_scope_is_allowed() {
        let diagnostics = analyze_ok("int x = 1; { string x = \"inner\"; }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_assignment_to_undeclared_is_fatal() {
        let err = analyze("x = 5;").unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable(_)));
    }

    #[test]
    fn test_assignment_type_mismatch_is_fatal() {
        let err = analyze("int x = 50; x = true;").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn test_block_locals_do_not_escape() {
        let err = analyze("{ int x = 1; } x = 2;").unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable(_)));
    }

    #[test]
    fn test_function_redeclaration_is_a_diagnostic() {
        let diagnostics = analyze_ok("void f() { } void f() { }");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("already declared"));
    }

    #[test]
    fn test_recursive_function_resolves_itself() {
        let diagnostics = analyze_ok(
            "int fib(int n) { if (n <= 1) { return n; } return fib(n - 1) + fib(n - 2); }",
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_parameter_redeclared_by_local_is_fatal() {
        let err = analyze("int f(int a) { int a = 1; return a; }").unwrap_err();
        assert!(matches!(err, Error::Redeclaration(_)));
    }

    #[test]
    fn test_call_arity_mismatch_is_a_diagnostic() {
        let diagnostics = analyze_ok("int add(int a, int b) { return a + b; } add(1);");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("expects 2"));
    }

    #[test]
    fn test_call_argument_type_is_a_diagnostic() {
        let diagnostics = analyze_ok("int twice(int a) { return a * 2; } twice(true);");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_call_to_undeclared_function_is_a_diagnostic() {
        let diagnostics = analyze_ok("int x = 1; x = x + 0; missing();");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("undeclared function"));
    }

    #[test]
    fn test_calling_a_variable_is_a_diagnostic() {
        let diagnostics = analyze_ok("int x = 1; x();");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("not a function"));
    }

    #[test]
    fn test_non_bool_condition_is_a_diagnostic() {
        let diagnostics = analyze_ok("int x = 1; if (x + 1) { x = 2; }");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("must be 'bool'"));
    }

    #[test]
    fn test_arithmetic_promotes_to_float() {
        // float result assigned to float variable type-checks cleanly
        let diagnostics = analyze_ok("float area = 3.14 * 2 * 2;");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_string_arithmetic_is_a_diagnostic_not_fatal() {
        // the poisoned expression suppresses the declaration check
        let diagnostics = analyze_ok("int x = \"a\" + 1;");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_error_tag_suppresses_cascades() {
        // one bad operand yields exactly one diagnostic, not three
        let diagnostics = analyze_ok("bool b = (\"a\" + 1) < 2 && true;");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_logical_operator_needs_bools() {
        let diagnostics = analyze_ok("bool b = 1 && 2;");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_unary_not_needs_bool() {
        let diagnostics = analyze_ok("bool b = !5;");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_for_clauses_use_enclosing_scope() {
        let diagnostics =
            analyze_ok("int i = 0; int sum = 0; for (i = 0; i < 5; i = i + 1) { sum = sum + i; }");
        assert!(diagnostics.is_empty());
    }
}
