//! Tokenizer
//!
//! Hand-written scanner over the raw source bytes with 1-based
//! line/column tracking. Identifiers are ASCII; strings accept single
//! or double quotes with the usual escapes.

use crate::ast::Span;
use crate::error::JsError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Identifier(String),

    // Keywords
    Var,
    Let,
    Const,
    Function,
    If,
    Else,
    While,
    Return,
    Break,
    Continue,
    True,
    False,
    Null,
    Undefined,
    Typeof,
    Void,
    New,
    Delete,
    In,
    Instanceof,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,
    Colon,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Not,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Shl,
    Shr,
    PlusPlus,
    MinusMinus,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, JsError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> u8 {
        self.source.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.source.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn advance(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), JsError> {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.advance();
                }
                b'/' if self.peek_at(1) == b'/' => {
                    while self.peek() != b'\n' && self.peek() != 0 {
                        self.advance();
                    }
                }
                b'/' if self.peek_at(1) == b'*' => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    loop {
                        if self.peek() == 0 {
                            return Err(JsError::syntax_error(
                                "unterminated block comment",
                                line,
                                column,
                            ));
                        }
                        if self.peek() == b'*' && self.peek_at(1) == b'/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, JsError> {
        self.skip_whitespace_and_comments()?;

        let span = Span {
            line: self.line,
            column: self.column,
        };
        let token = |kind| Token { kind, span };

        let c = self.peek();
        if c == 0 {
            return Ok(token(TokenKind::Eof));
        }

        if c.is_ascii_digit() || (c == b'.' && self.peek_at(1).is_ascii_digit()) {
            return Ok(Token {
                kind: self.number(span)?,
                span,
            });
        }
        if c == b'"' || c == b'\'' {
            return Ok(Token {
                kind: self.string(span)?,
                span,
            });
        }
        if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
            return Ok(Token {
                kind: self.identifier(),
                span,
            });
        }

        self.advance();
        let kind = match c {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b'[' => TokenKind::LeftBracket,
            b']' => TokenKind::RightBracket,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'~' => TokenKind::BitNot,
            b'^' => TokenKind::BitXor,
            b'+' => {
                if self.matches(b'+') {
                    TokenKind::PlusPlus
                } else if self.matches(b'=') {
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if self.matches(b'-') {
                    TokenKind::MinusMinus
                } else if self.matches(b'=') {
                    TokenKind::MinusAssign
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if self.matches(b'=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                if self.matches(b'=') {
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => TokenKind::Percent,
            b'=' => {
                if self.matches(b'=') {
                    if self.matches(b'=') {
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.matches(b'=') {
                    if self.matches(b'=') {
                        TokenKind::NotEqEq
                    } else {
                        TokenKind::NotEq
                    }
                } else {
                    TokenKind::Not
                }
            }
            b'<' => {
                if self.matches(b'<') {
                    TokenKind::Shl
                } else if self.matches(b'=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.matches(b'>') {
                    TokenKind::Shr
                } else if self.matches(b'=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            b'&' => {
                if self.matches(b'&') {
                    TokenKind::AndAnd
                } else {
                    TokenKind::BitAnd
                }
            }
            b'|' => {
                if self.matches(b'|') {
                    TokenKind::OrOr
                } else {
                    TokenKind::BitOr
                }
            }
            _ => {
                return Err(JsError::syntax_error(
                    format!("unexpected character '{}'", c as char),
                    span.line,
                    span.column,
                ));
            }
        };
        Ok(token(kind))
    }

    fn number(&mut self, span: Span) -> Result<TokenKind, JsError> {
        let start = self.pos;
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        } else if self.peek() == b'.' && start != self.pos {
            self.advance();
        }
        if self.peek() == b'e' || self.peek() == b'E' {
            let mut lookahead = 1;
            if self.peek_at(1) == b'+' || self.peek_at(1) == b'-' {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_ascii_digit() {
                for _ in 0..lookahead {
                    self.advance();
                }
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        let text = std::str::from_utf8(&self.source[start..self.pos])
            .map_err(|_| JsError::syntax_error("invalid number literal", span.line, span.column))?;
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| JsError::syntax_error("invalid number literal", span.line, span.column))
    }

    fn string(&mut self, span: Span) -> Result<TokenKind, JsError> {
        let quote = self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                0 | b'\n' => {
                    return Err(JsError::syntax_error(
                        "unterminated string literal",
                        span.line,
                        span.column,
                    ));
                }
                c if c == quote => {
                    self.advance();
                    return Ok(TokenKind::String(text));
                }
                b'\\' => {
                    self.advance();
                    let escaped = self.advance();
                    match escaped {
                        b'n' => text.push('\n'),
                        b't' => text.push('\t'),
                        b'r' => text.push('\r'),
                        b'0' => text.push('\0'),
                        b'\\' => text.push('\\'),
                        b'\'' => text.push('\''),
                        b'"' => text.push('"'),
                        b'u' => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let digit = self.advance();
                                let value = (digit as char).to_digit(16).ok_or_else(|| {
                                    JsError::syntax_error(
                                        "invalid unicode escape",
                                        span.line,
                                        span.column,
                                    )
                                })?;
                                code = code * 16 + value;
                            }
                            text.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        other => {
                            text.push(other as char);
                        }
                    }
                }
                _ => {
                    // Consume one full UTF-8 sequence.
                    let first = self.advance();
                    text.push(first as char);
                    if first >= 0x80 {
                        let extra = match first {
                            0xC0..=0xDF => 1,
                            0xE0..=0xEF => 2,
                            _ => 3,
                        };
                        text.pop();
                        let mut bytes = vec![first];
                        for _ in 0..extra {
                            bytes.push(self.advance());
                        }
                        match std::str::from_utf8(&bytes) {
                            Ok(s) => text.push_str(s),
                            Err(_) => text.push('\u{fffd}'),
                        }
                    }
                }
            }
        }
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while is_identifier_char(self.peek()) {
            self.advance();
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
        match text {
            "var" => TokenKind::Var,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "typeof" => TokenKind::Typeof,
            "void" => TokenKind::Void,
            "new" => TokenKind::New,
            "delete" => TokenKind::Delete,
            "in" => TokenKind::In,
            "instanceof" => TokenKind::Instanceof,
            _ => TokenKind::Identifier(text.to_string()),
        }
    }
}

fn is_identifier_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 .5 1e3 2.5e-1"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.5),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(0.25),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#""a\nb" 'c'"#),
            vec![
                TokenKind::String("a\nb".to_string()),
                TokenKind::String("c".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("=== !== == != <= >= << >> && ||"),
            vec![
                TokenKind::EqEqEq,
                TokenKind::NotEqEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_spans() {
        let tokens = Lexer::new("// line\n  x /* block */ y").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier("x".to_string()));
        assert_eq!(tokens[0].span.line, 2);
        assert_eq!(tokens[0].span.column, 3);
        assert_eq!(tokens[1].kind, TokenKind::Identifier("y".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Lexer::new("\"abc").tokenize().is_err());
    }
}
