use std::fmt;

use crate::context::Context;
use crate::duration::Duration;

/// Kinds of token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Double(f64),
    Duration(Duration),
    String(String),
    /// `r"..."`, already validated as a pattern
    Regex(String),
    /// Identifiers and keywords alike; the parser decides which is which
    Identifier(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `!`
    Bang,
    /// `=`
    Assign,
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `=~`
    Match,
    /// `^`
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Eof,
}

impl TokenKind {
    pub fn is_identifier(&self, name: &str) -> bool {
        matches!(self, Self::Identifier(id) if id == name)
    }

    /// Source text of fixed tokens
    pub fn symbol(&self) -> Option<&'static str> {
        let symbol = match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Bang => "!",
            Self::Assign => "=",
            Self::EqualEqual => "==",
            Self::BangEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Match => "=~",
            Self::Caret => "^",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Comma => ",",
            Self::Semicolon => ";",
            _ => return None,
        };
        Some(symbol)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "integer `{v}`"),
            Self::Double(v) => write!(f, "double `{v:?}`"),
            Self::Duration(d) => write!(f, "duration `{d}`"),
            Self::String(s) => write!(f, "string {s:?}"),
            Self::Regex(r) => write!(f, "regex {r:?}"),
            Self::Identifier(id) => write!(f, "`{id}`"),
            Self::Eof => write!(f, "end of input"),
            other => write!(f, "`{}`", other.symbol().unwrap_or("?")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub context: Context,
}

impl Token {
    pub fn new(kind: TokenKind, context: Context) -> Self {
        Self { kind, context }
    }
}
