//! Runtime values produced by evaluation.
//!
//! Values carry no source context; errors about them are reported against
//! the node that produced or consumed them.

use std::fmt;

use metadata::Filter;
use metadata::filter::quote_string;
use serde::Serialize;

use crate::duration::Duration;

mod arithmetic;
mod comparison;

pub use arithmetic::{binary, logical, unary};
pub use comparison::{compare, ordering};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Integer(i64),
    Double(f64),
    Duration(Duration),
    String(String),
    Boolean(bool),
    List(Vec<Value>),
    /// A set of series described by a filter
    SeriesSelector(Filter),
}

impl Value {
    /// Name used in type errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::Duration(_) => "duration",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::List(_) => "list",
            Self::SeriesSelector(_) => "selector",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Double(_))
    }

    pub fn as_selector(&self) -> Option<&Filter> {
        match self {
            Self::SeriesSelector(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn into_selector(self) -> Option<Filter> {
        match self {
            Self::SeriesSelector(filter) => Some(filter),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Duration(d) => write!(f, "{d}"),
            Self::String(s) => f.write_str(&quote_string(s)),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::SeriesSelector(filter) => f.write_str(&filter.to_dsl()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl From<Filter> for Value {
    fn from(value: Filter) -> Self {
        Self::SeriesSelector(value)
    }
}
