//! Errors raised while lexing, parsing, evaluating or compiling a query.
//!
//! Every variant carries the [`Context`] of the text that caused it. None of
//! them are recovered from internally: the first error aborts the operation.

use std::fmt;

use crate::context::Context;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed token: unterminated string, bad suffix, stray character
    #[error("{message}")]
    Lex { context: Context, message: String },
    /// Token sequence that does not fit the grammar
    #[error("expected {expected}, found {found}")]
    Parse {
        context: Context,
        expected: String,
        found: String,
    },
    #[error("unbound reference `{name}`")]
    UnboundReference { context: Context, name: String },
    /// Operator or function applied to values of the wrong type
    #[error("type error: {message}")]
    Type { context: Context, message: String },
    /// Division by zero or overflow
    #[error("arithmetic error: {message}")]
    Arithmetic { context: Context, message: String },
    #[error("unknown function `{name}`")]
    UnknownFunction { context: Context, name: String },
    #[error("function `{name}` expects {expected} argument(s), got {actual}")]
    Arity {
        context: Context,
        name: String,
        expected: usize,
        actual: usize,
    },
    /// Subtree that cannot be turned into a backend request
    #[error("not compilable: {message}")]
    NotCompilable { context: Context, message: String },
}

/// Coarse classification of [`Error`], handy for matching in callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Parse,
    UnboundReference,
    Type,
    Arithmetic,
    UnknownFunction,
    Arity,
    NotCompilable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lex => "lex error",
            Self::Parse => "parse error",
            Self::UnboundReference => "unbound reference",
            Self::Type => "type error",
            Self::Arithmetic => "arithmetic error",
            Self::UnknownFunction => "unknown function",
            Self::Arity => "arity error",
            Self::NotCompilable => "not compilable",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn lex(context: Context, message: impl Into<String>) -> Self {
        Self::Lex {
            context,
            message: message.into(),
        }
    }

    pub fn parse(context: Context, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Parse {
            context,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn type_error(context: Context, message: impl Into<String>) -> Self {
        Self::Type {
            context,
            message: message.into(),
        }
    }

    pub fn arithmetic(context: Context, message: impl Into<String>) -> Self {
        Self::Arithmetic {
            context,
            message: message.into(),
        }
    }

    pub fn not_compilable(context: Context, message: impl Into<String>) -> Self {
        Self::NotCompilable {
            context,
            message: message.into(),
        }
    }

    pub fn context(&self) -> Context {
        match self {
            Self::Lex { context, .. }
            | Self::Parse { context, .. }
            | Self::UnboundReference { context, .. }
            | Self::Type { context, .. }
            | Self::Arithmetic { context, .. }
            | Self::UnknownFunction { context, .. }
            | Self::Arity { context, .. }
            | Self::NotCompilable { context, .. } => *context,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lex { .. } => ErrorKind::Lex,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::UnboundReference { .. } => ErrorKind::UnboundReference,
            Self::Type { .. } => ErrorKind::Type,
            Self::Arithmetic { .. } => ErrorKind::Arithmetic,
            Self::UnknownFunction { .. } => ErrorKind::UnknownFunction,
            Self::Arity { .. } => ErrorKind::Arity,
            Self::NotCompilable { .. } => ErrorKind::NotCompilable,
        }
    }

    /// Format the error with the offending source line and a caret marker.
    ///
    /// ```text
    /// 1:5: type error: cannot apply `-` to duration and integer
    ///   10s - 4
    ///       ^
    /// ```
    pub fn display_with_source(&self, source: &str) -> String {
        let context = self.context();
        let (line, column) = context.locate(source);
        let text = source.lines().nth(line - 1).unwrap_or("");

        // Caret runs to the end of the context, clipped to the current line
        let remaining = text.chars().count().saturating_sub(column - 1);
        let width = context
            .slice(source)
            .map(|s| s.lines().next().unwrap_or("").chars().count())
            .unwrap_or(0)
            .clamp(1, remaining.max(1));

        format!(
            "{line}:{column}: {self}\n  {text}\n  {}{}",
            " ".repeat(column - 1),
            "^".repeat(width)
        )
    }
}
