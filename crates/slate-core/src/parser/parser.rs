//! The main parser implementation.

use crate::Error;
use crate::ast::*;
use crate::lexer::{Scanner, Token, TokenKind};

/// A recursive descent parser for Slate.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self { scanner, current }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program { statements })
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::IntType
            | TokenKind::FloatType
            | TokenKind::BoolType
            | TokenKind::StringType
            | TokenKind::VoidType => self.parse_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            _ => self.parse_assignment_or_expression(),
        }
    }

    /// Parses a variable or function declaration (both start with a type).
    fn parse_declaration(&mut self) -> Result<Statement, Error> {
        let ty = self.expect_type()?;
        let name = self.expect_identifier()?;

        if self.check(&TokenKind::LeftParen) {
            self.parse_function_rest(ty, name)
        } else {
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect(&TokenKind::Semicolon)?;

            if ty == TypeName::Void {
                return Err(Error::SyntaxError(format!(
                    "variable '{}' cannot have type 'void'",
                    name
                )));
            }

            Ok(Statement::VarDecl(VarDecl { ty, name, init }))
        }
    }

    /// Parses a function declaration after its return type and name.
    fn parse_function_rest(&mut self, return_type: TypeName, name: String) -> Result<Statement, Error> {
        self.expect(&TokenKind::LeftParen)?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let ty = self.expect_type()?;
                if ty == TypeName::Void {
                    return Err(Error::SyntaxError(
                        "parameter cannot have type 'void'".into(),
                    ));
                }
                let name = self.expect_identifier()?;
                params.push(Param { ty, name });

                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.parse_block()?;

        Ok(Statement::FunctionDecl(FunctionDecl {
            return_type,
            name,
            params,
            body,
        }))
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let then_block = self.parse_block()?;
        let else_block = if self.check(&TokenKind::Else) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            condition,
            then_block,
            else_block,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = self.parse_block()?;

        Ok(Statement::While(WhileStatement { condition, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        // Init: a declaration or an assignment, terminated by the first ';'
        let init = match &self.current.kind {
            TokenKind::IntType
            | TokenKind::FloatType
            | TokenKind::BoolType
            | TokenKind::StringType => self.parse_declaration()?,
            _ => {
                let assign = self.parse_bare_assignment()?;
                self.expect(&TokenKind::Semicolon)?;
                Statement::Assign(assign)
            }
        };

        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon)?;

        // Update: an assignment with no trailing ';'
        let update = Statement::Assign(self.parse_bare_assignment()?);
        self.expect(&TokenKind::RightParen)?;

        let body = self.parse_block()?;

        Ok(Statement::For(ForStatement {
            init: Box::new(init),
            condition,
            update: Box::new(update),
            body,
        }))
    }

    /// Parses `name = expr` without the trailing semicolon.
    fn parse_bare_assignment(&mut self) -> Result<Assign, Error> {
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Equal)?;
        let value = self.parse_expression()?;
        Ok(Assign { name, value })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'return'
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        Ok(Statement::Return(ReturnStatement { value }))
    }

    fn parse_block(&mut self) -> Result<Block, Error> {
        self.expect(&TokenKind::LeftBrace)?;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        self.expect(&TokenKind::RightBrace)?;
        Ok(Block { statements })
    }

    /// Parses either `name = expr;` or a bare expression statement.
    fn parse_assignment_or_expression(&mut self) -> Result<Statement, Error> {
        let expression = self.parse_expression()?;

        if let Expression::Identifier(id) = &expression {
            if self.check(&TokenKind::Equal) {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon)?;
                return Ok(Statement::Assign(Assign {
                    name: id.name.clone(),
                    value,
                }));
            }
        }

        self.expect(&TokenKind::Semicolon)?;
        Ok(Statement::Expression(ExprStatement { expression }))
    }

    // ========================================================================
    // Expressions (precedence climbing, lowest first)
    // ========================================================================

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_logical_and()?;

        while self.check(&TokenKind::PipePipe) {
            self.advance();
            let right = self.parse_logical_and()?;
            left = binary(BinaryOperator::LogicalOr, left, right);
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_equality()?;

        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::LogicalAnd, left, right);
        }

        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_comparison()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_additive()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::LessThan => BinaryOperator::LessThan,
                TokenKind::GreaterThan => BinaryOperator::GreaterThan,
                TokenKind::LessThanEqual => BinaryOperator::LessThanEqual,
                TokenKind::GreaterThanEqual => BinaryOperator::GreaterThanEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let operator = match &self.current.kind {
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Bang => UnaryOperator::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        let argument = self.parse_unary()?;

        Ok(Expression::Unary(UnaryExpression {
            operator,
            argument: Box::new(argument),
        }))
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        match self.current.kind.clone() {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expression::Literal(Literal::Int(value)))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expression::Literal(Literal::Float(value)))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expression::Literal(Literal::Str(value)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Bool(false)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check(&TokenKind::LeftParen) {
                    self.parse_call_rest(name)
                } else {
                    Ok(Expression::Identifier(Identifier { name }))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let expression = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expression)
            }
            other => Err(Error::SyntaxError(format!(
                "unexpected token {:?} at byte {}",
                other, self.current.span.start
            ))),
        }
    }

    /// Parses the argument list of a call whose callee was just consumed.
    fn parse_call_rest(&mut self, name: String) -> Result<Expression, Error> {
        self.expect(&TokenKind::LeftParen)?;

        let mut arguments = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightParen)?;

        Ok(Expression::Call(CallExpression {
            callee: Identifier { name },
            arguments,
        }))
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn advance(&mut self) -> Token {
        let next = self.scanner.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, Error> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(Error::SyntaxError(format!(
                "expected {:?}, found {:?} at byte {}",
                kind, self.current.kind, self.current.span.start
            )))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, Error> {
        match self.current.kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(Error::SyntaxError(format!(
                "expected identifier, found {:?} at byte {}",
                other, self.current.span.start
            ))),
        }
    }

    fn expect_type(&mut self) -> Result<TypeName, Error> {
        let ty = match &self.current.kind {
            TokenKind::IntType => TypeName::Int,
            TokenKind::FloatType => TypeName::Float,
            TokenKind::BoolType => TypeName::Bool,
            TokenKind::StringType => TypeName::Str,
            TokenKind::VoidType => TypeName::Void,
            other => {
                return Err(Error::SyntaxError(format!(
                    "expected type name, found {:?} at byte {}",
                    other, self.current.span.start
                )));
            }
        };
        self.advance();
        Ok(ty)
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        Parser::new(source).parse_program().expect("should parse")
    }

    fn parse_expr(source: &str) -> Expression {
        let source = format!("{};", source);
        Parser::new(&source).parse_expression().expect("should parse")
    }

    #[test]
    fn test_parse_var_decl() {
        let program = parse_ok("int x = 10;");
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(
            &program.statements[0],
            Statement::VarDecl(decl) if decl.name == "x" && decl.ty == TypeName::Int
        ));
    }

    #[test]
    fn test_parse_var_decl_without_init() {
        let program = parse_ok("float y;");
        assert!(matches!(
            &program.statements[0],
            Statement::VarDecl(decl) if decl.init.is_none()
        ));
    }

    #[test]
    fn test_parse_void_variable_rejected() {
        let err = Parser::new("void x;").parse_program().unwrap_err();
        assert!(matches!(err, Error::SyntaxError(_)));
    }

    #[test]
    fn test_parse_assignment() {
        let program = parse_ok("x = 5;");
        assert!(matches!(
            &program.statements[0],
            Statement::Assign(assign) if assign.name == "x"
        ));
    }

    #[test]
    fn test_parse_precedence() {
        // 10 + 5 * 2 must parse as 10 + (5 * 2)
        let expr = parse_expr("10 + 5 * 2");
        let Expression::Binary(bin) = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(bin.operator, BinaryOperator::Add);
        assert!(matches!(
            bin.right.as_ref(),
            Expression::Binary(inner) if inner.operator == BinaryOperator::Multiply
        ));
    }

    #[test]
    fn test_parse_parenthesized() {
        let expr = parse_expr("(10 + 5) * 2");
        let Expression::Binary(bin) = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(bin.operator, BinaryOperator::Multiply);
    }

    #[test]
    fn test_parse_unary_nested() {
        let expr = parse_expr("-(-5)");
        assert!(matches!(expr, Expression::Unary(_)));
    }

    #[test]
    fn test_parse_if_else() {
        let program = parse_ok("if (x > 5) { y = 1; } else { y = 2; }");
        let Statement::If(if_stmt) = &program.statements[0] else {
            panic!("expected if statement");
        };
        assert!(if_stmt.else_block.is_some());
    }

    #[test]
    fn test_parse_while() {
        let program = parse_ok("while (i > 0) { i = i - 1; }");
        assert!(matches!(&program.statements[0], Statement::While(_)));
    }

    #[test]
    fn test_parse_for() {
        let program = parse_ok("for (i = 0; i < 5; i = i + 1) { sum = sum + i; }");
        let Statement::For(for_stmt) = &program.statements[0] else {
            panic!("expected for statement");
        };
        assert!(matches!(for_stmt.init.as_ref(), Statement::Assign(_)));
        assert!(matches!(for_stmt.update.as_ref(), Statement::Assign(_)));
    }

    #[test]
    fn test_parse_function_decl() {
        let program = parse_ok("int add(int a, int b) { return a + b; }");
        let Statement::FunctionDecl(func) = &program.statements[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(func.name, "add");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.return_type, TypeName::Int);
    }

    #[test]
    fn test_parse_call_with_arguments() {
        let expr = parse_expr("add(10, 20)");
        let Expression::Call(call) = expr else {
            panic!("expected call expression");
        };
        assert_eq!(call.callee.name, "add");
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn test_parse_return_without_value() {
        let program = parse_ok("void f() { return; }");
        let Statement::FunctionDecl(func) = &program.statements[0] else {
            panic!("expected function declaration");
        };
        assert!(matches!(
            &func.body.statements[0],
            Statement::Return(ret) if ret.value.is_none()
        ));
    }

    #[test]
    fn test_parse_nested_blocks() {
        let program = parse_ok("{ int x = 1; { int y = 2; } }");
        assert!(matches!(&program.statements[0], Statement::Block(_)));
    }

    #[test]
    fn test_parse_missing_semicolon() {
        let err = Parser::new("int x = 10 int y = 20;")
            .parse_program()
            .unwrap_err();
        assert!(matches!(err, Error::SyntaxError(_)));
    }

    #[test]
    fn test_parse_comment_lines() {
        let program = parse_ok("int x = 1; # trailing comment\n# full line\nx = 2;");
        assert_eq!(program.statements.len(), 2);
    }
}
