//! Recursive-descent parser
//!
//! Standard precedence-climbing expression parser over the token
//! stream, producing the syntax tree in [`crate::ast`]. Semicolons are
//! accepted but not required between statements.

use crate::ast::{
    BinaryOp, DeclKind, Declarator, Expr, FunctionDef, LogicalOp, Program, Span, Stmt, StmtKind,
    UnaryOp,
};
use crate::error::JsError;
use crate::lexer::{Lexer, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, JsError> {
        Ok(Self {
            tokens: Lexer::new(source).tokenize()?,
            pos: 0,
        })
    }

    pub fn parse_program(&mut self) -> Result<Program, JsError> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        Ok(Program { body })
    }

    // ── Token helpers ──────────────────────────────────────────────

    fn peek(&self) -> &Token {
        // The token stream always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, JsError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let span = self.span();
            Err(JsError::syntax_error(
                format!("expected {}", what),
                span.line,
                span.column,
            ))
        }
    }

    fn error(&self, message: impl Into<String>) -> JsError {
        let span = self.span();
        JsError::syntax_error(message, span.line, span.column)
    }

    // ── Statements ─────────────────────────────────────────────────

    fn statement(&mut self) -> Result<Stmt, JsError> {
        let span = self.span();
        let kind = match self.peek().kind {
            TokenKind::Var => self.var_declaration(DeclKind::Var)?,
            TokenKind::Let => self.var_declaration(DeclKind::Let)?,
            TokenKind::Const => self.var_declaration(DeclKind::Const)?,
            TokenKind::Function => self.function_declaration()?,
            TokenKind::LeftBrace => self.block()?,
            TokenKind::If => self.if_statement()?,
            TokenKind::While => self.while_statement()?,
            TokenKind::Return => self.return_statement()?,
            TokenKind::Break => {
                self.advance();
                self.eat(&TokenKind::Semicolon);
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                self.eat(&TokenKind::Semicolon);
                StmtKind::Continue
            }
            _ => {
                let expr = self.expression()?;
                self.eat(&TokenKind::Semicolon);
                StmtKind::Expression(expr)
            }
        };
        Ok(Stmt { kind, span })
    }

    fn var_declaration(&mut self, kind: DeclKind) -> Result<StmtKind, JsError> {
        self.advance();
        let mut declarations = Vec::new();
        loop {
            let name = self.identifier_name("variable name")?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.assignment()?)
            } else {
                if kind == DeclKind::Const {
                    return Err(self.error("missing initializer in const declaration"));
                }
                None
            };
            declarations.push(Declarator { name, init });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.eat(&TokenKind::Semicolon);
        Ok(StmtKind::VarDecl { kind, declarations })
    }

    fn function_declaration(&mut self) -> Result<StmtKind, JsError> {
        self.advance();
        let name = self.identifier_name("function name")?;
        let (params, body) = self.function_rest()?;
        Ok(StmtKind::FunctionDecl(FunctionDef {
            name: Some(name),
            params,
            body,
        }))
    }

    fn function_rest(&mut self) -> Result<(Vec<String>, Vec<Stmt>), JsError> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.identifier_name("parameter name")?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok((params, body))
    }

    fn block(&mut self) -> Result<StmtKind, JsError> {
        self.advance();
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(StmtKind::Block(body))
    }

    fn if_statement(&mut self) -> Result<StmtKind, JsError> {
        self.advance();
        self.expect(TokenKind::LeftParen, "'('")?;
        let test = self.expression()?;
        self.expect(TokenKind::RightParen, "')'")?;
        let consequent = Box::new(self.statement()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            consequent,
            alternate,
        })
    }

    fn while_statement(&mut self) -> Result<StmtKind, JsError> {
        self.advance();
        self.expect(TokenKind::LeftParen, "'('")?;
        let test = self.expression()?;
        self.expect(TokenKind::RightParen, "')'")?;
        let body = Box::new(self.statement()?);
        Ok(StmtKind::While { test, body })
    }

    fn return_statement(&mut self) -> Result<StmtKind, JsError> {
        self.advance();
        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.check(&TokenKind::Eof)
        {
            None
        } else {
            Some(self.expression()?)
        };
        self.eat(&TokenKind::Semicolon);
        Ok(StmtKind::Return(argument))
    }

    fn identifier_name(&mut self, what: &str) -> Result<String, JsError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!("expected {}", what))),
        }
    }

    // ── Expressions ────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, JsError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, JsError> {
        let target = self.logical_or()?;

        let op = match self.peek().kind {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinaryOp::Add),
            TokenKind::MinusAssign => Some(BinaryOp::Sub),
            TokenKind::StarAssign => Some(BinaryOp::Mul),
            TokenKind::SlashAssign => Some(BinaryOp::Div),
            _ => return Ok(target),
        };
        if !matches!(target, Expr::Identifier(_) | Expr::Member { .. }) {
            return Err(self.error("invalid assignment target"));
        }
        self.advance();
        let value = self.assignment()?;

        // Compound assignments desugar to a plain assignment of the
        // binary expression.
        let value = match op {
            Some(op) => Expr::Binary {
                op,
                left: Box::new(target.clone()),
                right: Box::new(value),
            },
            None => value,
        };
        Ok(Expr::Assignment {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, JsError> {
        let mut left = self.logical_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, JsError> {
        let mut left = self.bitwise_or()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.bitwise_or()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn bitwise_or(&mut self) -> Result<Expr, JsError> {
        let mut left = self.bitwise_xor()?;
        while self.eat(&TokenKind::BitOr) {
            let right = self.bitwise_xor()?;
            left = binary(BinaryOp::BitOr, left, right);
        }
        Ok(left)
    }

    fn bitwise_xor(&mut self) -> Result<Expr, JsError> {
        let mut left = self.bitwise_and()?;
        while self.eat(&TokenKind::BitXor) {
            let right = self.bitwise_and()?;
            left = binary(BinaryOp::BitXor, left, right);
        }
        Ok(left)
    }

    fn bitwise_and(&mut self) -> Result<Expr, JsError> {
        let mut left = self.equality()?;
        while self.eat(&TokenKind::BitAnd) {
            let right = self.equality()?;
            left = binary(BinaryOp::BitAnd, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, JsError> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq | TokenKind::EqEqEq => BinaryOp::Eq,
                TokenKind::NotEq | TokenKind::NotEqEq => BinaryOp::Ne,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.relational()?;
            left = binary(op, left, right);
        }
    }

    fn relational(&mut self) -> Result<Expr, JsError> {
        let mut left = self.shift()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::Ge,
                TokenKind::In | TokenKind::Instanceof => {
                    return Err(self.error("operator is reserved"));
                }
                _ => return Ok(left),
            };
            self.advance();
            let right = self.shift()?;
            left = binary(op, left, right);
        }
    }

    fn shift(&mut self) -> Result<Expr, JsError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.additive()?;
            left = binary(op, left, right);
        }
    }

    fn additive(&mut self) -> Result<Expr, JsError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, JsError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, JsError> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::BitNot => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::New | TokenKind::Delete => {
                return Err(self.error("operator is reserved"));
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                return self.increment_decrement(None);
            }
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let argument = self.unary()?;
                Ok(Expr::Unary {
                    op,
                    argument: Box::new(argument),
                })
            }
            None => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, JsError> {
        let expr = self.call_member()?;
        if matches!(
            self.peek().kind,
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) {
            return self.increment_decrement(Some(expr));
        }
        Ok(expr)
    }

    /// `++x` / `x++` (and the `--` forms) desugar to an assignment of
    /// the incremented value.
    fn increment_decrement(&mut self, target: Option<Expr>) -> Result<Expr, JsError> {
        let op = match self.peek().kind {
            TokenKind::PlusPlus => BinaryOp::Add,
            _ => BinaryOp::Sub,
        };
        self.advance();
        let target = match target {
            Some(t) => t,
            None => self.call_member()?,
        };
        if !matches!(target, Expr::Identifier(_) | Expr::Member { .. }) {
            return Err(self.error("invalid increment target"));
        }
        Ok(Expr::Assignment {
            target: Box::new(target.clone()),
            value: Box::new(Expr::Binary {
                op,
                left: Box::new(target),
                right: Box::new(Expr::Number(1.0)),
            }),
        })
    }

    fn call_member(&mut self) -> Result<Expr, JsError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let name = self.identifier_name("property name")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(Expr::String(name)),
                    computed: false,
                };
            } else if self.eat(&TokenKind::LeftBracket) {
                let property = self.expression()?;
                self.expect(TokenKind::RightBracket, "']'")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                    computed: true,
                };
            } else if self.eat(&TokenKind::LeftParen) {
                let mut arguments = Vec::new();
                if !self.check(&TokenKind::RightParen) {
                    loop {
                        arguments.push(self.assignment()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightParen, "')'")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, JsError> {
        match self.peek().kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Boolean(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::Undefined => {
                self.advance();
                Ok(Expr::Undefined)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier(name))
            }
            TokenKind::Function => {
                self.advance();
                let name = match &self.peek().kind {
                    TokenKind::Identifier(n) => {
                        let n = n.clone();
                        self.advance();
                        Some(n)
                    }
                    _ => None,
                };
                let (params, body) = self.function_rest()?;
                Ok(Expr::Function(FunctionDef { name, params, body }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RightBracket) {
                    loop {
                        elements.push(self.assignment()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightBracket, "']'")?;
                Ok(Expr::ArrayLiteral(elements))
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut properties = Vec::new();
                if !self.check(&TokenKind::RightBrace) {
                    loop {
                        let key = match self.peek().kind.clone() {
                            TokenKind::Identifier(name) => {
                                self.advance();
                                name
                            }
                            TokenKind::String(s) => {
                                self.advance();
                                s
                            }
                            TokenKind::Number(n) => {
                                self.advance();
                                crate::value::number_to_string(n)
                            }
                            _ => return Err(self.error("expected property key")),
                        };
                        self.expect(TokenKind::Colon, "':'")?;
                        let value = self.assignment()?;
                        properties.push((key, value));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightBrace, "'}'")?;
                Ok(Expr::ObjectLiteral(properties))
            }
            _ => Err(self.error("unexpected token")),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
