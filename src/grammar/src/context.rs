use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` into the query text.
///
/// Every token, node and error carries one so diagnostics can point at the
/// exact text involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Context {
    pub start: usize,
    pub end: usize,
}

impl Context {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width context at `offset`
    pub fn at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Smallest context covering both
    pub fn join(&self, other: &Context) -> Context {
        Context::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The text this context covers, if it lies within `source`
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }

    /// 1-based line and column (in characters) of the start offset
    pub fn locate(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
