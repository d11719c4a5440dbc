//! Query text to tokens.
//!
//! [`Lexer`] is a lazy iterator. It yields one `Ok(Token)` per token, ends
//! with an [`TokenKind::Eof`] token, and stops after the first error.

use regex::Regex;

use crate::context::Context;
use crate::duration::{Duration, TimeUnit};
use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};

/// Lex `text` lazily
pub fn tokenize(text: &str) -> Lexer<'_> {
    Lexer::new(text)
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            done: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn context(&self, start: usize) -> Context {
        Context::new(start, self.pos)
    }

    fn next_token(&mut self) -> Result<Token> {
        self.eat_while(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));

        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, Context::at(start)));
        };

        match c {
            '0'..='9' => self.number(start),
            '"' | '\'' => self.string(start, c),
            'r' if self.peek_nth(1) == Some('"') => self.regex(start),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.identifier(start)),
            _ => self.symbol(start),
        }
    }

    fn number(&mut self, start: usize) -> Result<Token> {
        self.eat_while(|c| c.is_ascii_digit());
        let mut is_double = false;

        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
            is_double = true;
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let has_exponent = match self.peek_nth(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                self.eat_while(|c| c.is_ascii_digit());
                is_double = true;
            }
        }

        let digits_end = self.pos;
        let text = &self.source[start..digits_end];

        if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            return self.duration(start, digits_end, is_double);
        }

        let context = self.context(start);
        if is_double {
            let value = text
                .parse::<f64>()
                .map_err(|e| Error::lex(context, format!("invalid number `{text}`: {e}")))?;
            if !value.is_finite() {
                return Err(Error::lex(
                    context,
                    format!("double literal `{text}` is out of range"),
                ));
            }
            return Ok(Token::new(TokenKind::Double(value), context));
        }

        let value = text
            .parse::<i64>()
            .map_err(|_| Error::lex(context, format!("integer literal `{text}` is out of range")))?;
        Ok(Token::new(TokenKind::Integer(value), context))
    }

    fn duration(&mut self, start: usize, digits_end: usize, is_double: bool) -> Result<Token> {
        self.eat_while(|c| c.is_ascii_alphabetic());
        let suffix_end = self.pos;
        // Anything glued on after the unit belongs to the same (bad) literal
        self.eat_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');

        let context = self.context(start);
        let literal = &self.source[start..self.pos];

        if is_double {
            return Err(Error::lex(
                context,
                format!("duration literal `{literal}` must have an integer value"),
            ));
        }

        let suffix = &self.source[digits_end..self.pos];
        let unit = TimeUnit::from_suffix(suffix)
            .filter(|_| suffix_end == self.pos)
            .ok_or_else(|| {
                Error::lex(
                    context,
                    format!("invalid duration suffix `{suffix}`, expected one of ms, s, m, h, d, w"),
                )
            })?;

        let value = self.source[start..digits_end]
            .parse::<i64>()
            .map_err(|_| Error::lex(context, format!("duration literal `{literal}` is out of range")))?;

        Ok(Token::new(TokenKind::Duration(Duration::new(value, unit)), context))
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token> {
        self.bump();
        let mut value = String::new();

        loop {
            match self.bump() {
                None => {
                    return Err(Error::lex(
                        self.context(start),
                        "unterminated string literal",
                    ));
                }
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escape_start = self.pos - 1;
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some(other) => {
                            return Err(Error::lex(
                                self.context(escape_start),
                                format!("unknown escape sequence `\\{other}`"),
                            ));
                        }
                        None => {
                            return Err(Error::lex(
                                self.context(start),
                                "unterminated string literal",
                            ));
                        }
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }

        Ok(Token::new(TokenKind::String(value), self.context(start)))
    }

    fn regex(&mut self, start: usize) -> Result<Token> {
        // r"
        self.bump();
        self.bump();
        let mut pattern = String::new();

        loop {
            match self.bump() {
                None => {
                    return Err(Error::lex(
                        self.context(start),
                        "unterminated regex literal",
                    ));
                }
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('"') => pattern.push('"'),
                    Some(other) => {
                        pattern.push('\\');
                        pattern.push(other);
                    }
                    None => {
                        return Err(Error::lex(
                            self.context(start),
                            "unterminated regex literal",
                        ));
                    }
                },
                Some(c) => pattern.push(c),
            }
        }

        let context = self.context(start);
        Regex::new(&pattern)
            .map_err(|e| Error::lex(context, format!("invalid regular expression: {e}")))?;

        Ok(Token::new(TokenKind::Regex(pattern), context))
    }

    fn identifier(&mut self, start: usize) -> Token {
        self.eat_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        let name = self.source[start..self.pos].to_string();
        Token::new(TokenKind::Identifier(name), self.context(start))
    }

    fn symbol(&mut self, start: usize) -> Result<Token> {
        let Some(c) = self.bump() else {
            return Ok(Token::new(TokenKind::Eof, Context::at(start)));
        };

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '!' if self.eat('=') => TokenKind::BangEqual,
            '!' => TokenKind::Bang,
            '=' if self.eat('=') => TokenKind::EqualEqual,
            '=' if self.eat('~') => TokenKind::Match,
            '=' => TokenKind::Assign,
            '<' if self.eat('=') => TokenKind::LessEqual,
            '<' => TokenKind::Less,
            '>' if self.eat('=') => TokenKind::GreaterEqual,
            '>' => TokenKind::Greater,
            other => {
                return Err(Error::lex(
                    self.context(start),
                    format!("unexpected character `{other}`"),
                ));
            }
        };

        Ok(Token::new(kind, self.context(start)))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.next_token();
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => self.done = true,
            Err(e) => {
                log::debug!("Lexing stopped at {}: {e}", e.context());
                self.done = true;
            }
            Ok(_) => {}
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}
