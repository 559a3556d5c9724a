//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes Slate source code.
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match ch {
            // Single-character tokens
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,

            // Multi-character tokens
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),
            '&' => self.scan_ampersand(),
            '|' => self.scan_pipe(),

            // String literals
            '"' => self.scan_string(),

            // Numbers
            '0'..='9' => self.scan_number(ch),

            // Identifiers and keywords
            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => TokenKind::Invalid,
        };

        Token::new(kind, Span::new(start, self.current_pos))
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\n' | '\r') => {
                    self.advance();
                }
                Some('#') => {
                    // Comment: skip until end of line
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::EqualEqual
        } else {
            TokenKind::Equal
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::NotEqual
        } else {
            TokenKind::Bang
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::LessThanEqual
        } else {
            TokenKind::LessThan
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::GreaterThanEqual
        } else {
            TokenKind::GreaterThan
        }
    }

    fn scan_ampersand(&mut self) -> TokenKind {
        if self.peek() == Some('&') {
            self.advance();
            TokenKind::AmpersandAmpersand
        } else {
            TokenKind::Invalid
        }
    }

    fn scan_pipe(&mut self) -> TokenKind {
        if self.peek() == Some('|') {
            self.advance();
            TokenKind::PipePipe
        } else {
            TokenKind::Invalid
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                Some((_, '"')) => return TokenKind::Str(value),
                Some((_, '\\')) => match self.advance() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, other)) => value.push(other),
                    None => return TokenKind::Invalid,
                },
                Some((_, '\n')) | None => return TokenKind::Invalid,
                Some((_, ch)) => value.push(ch),
            }
        }
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        let mut digits = String::from(first);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // A '.' followed by a digit makes this a float literal
        if self.peek() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead
                .next()
                .is_some_and(|(_, ch)| ch.is_ascii_digit())
            {
                digits.push('.');
                self.advance();
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_digit() {
                        digits.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
                return match digits.parse::<f64>() {
                    Ok(value) => TokenKind::Float(value),
                    Err(_) => TokenKind::Invalid,
                };
            }
        }

        match digits.parse::<i64>() {
            Ok(value) => TokenKind::Int(value),
            Err(_) => TokenKind::Invalid,
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::keyword(&name).unwrap_or(TokenKind::Identifier(name))
    }
}

fn is_id_start(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

fn is_id_continue(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = scanner.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            kinds.push(token.kind);
        }
        kinds
    }

    #[test]
    fn test_scan_declaration() {
        let kinds = scan_all("int x = 10;");
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntType,
                TokenKind::Identifier("x".into()),
                TokenKind::Equal,
                TokenKind::Int(10),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_scan_float_and_int() {
        let kinds = scan_all("3.14 42");
        assert_eq!(kinds, vec![TokenKind::Float(3.14), TokenKind::Int(42)]);
    }

    #[test]
    fn test_scan_operators() {
        let kinds = scan_all("== != <= >= && || ! = < >");
        assert_eq!(
            kinds,
            vec![
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::LessThanEqual,
                TokenKind::GreaterThanEqual,
                TokenKind::AmpersandAmpersand,
                TokenKind::PipePipe,
                TokenKind::Bang,
                TokenKind::Equal,
                TokenKind::LessThan,
                TokenKind::GreaterThan,
            ]
        );
    }

    #[test]
    fn test_scan_string_with_escapes() {
        let kinds = scan_all(r#""a\"b\n""#);
        assert_eq!(kinds, vec![TokenKind::Str("a\"b\n".into())]);
    }

    #[test]
    fn test_scan_comment_skipped() {
        let kinds = scan_all("int x; # the rest is ignored\nx");
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntType,
                TokenKind::Identifier("x".into()),
                TokenKind::Semicolon,
                TokenKind::Identifier("x".into()),
            ]
        );
    }

    #[test]
    fn test_scan_keywords() {
        let kinds = scan_all("if else while for return true false void");
        assert_eq!(
            kinds,
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::Return,
                TokenKind::True,
                TokenKind::False,
                TokenKind::VoidType,
            ]
        );
    }

    #[test]
    fn test_scan_invalid_character() {
        let kinds = scan_all("@");
        assert_eq!(kinds, vec![TokenKind::Invalid]);
    }
}
