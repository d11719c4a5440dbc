//! Series filters carried by metadata requests.
//!
//! A [`Filter`] is a boolean predicate over a [`Series`]. Filters are plain
//! data: they can be applied to a series, simplified with
//! [`Filter::optimize`], serialized, and rendered back to query text with
//! [`Filter::to_dsl`].

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;
use crate::series::Series;

/// A regular expression matched against a whole tag value.
///
/// The pattern is compiled once, when the filter is built or deserialized.
/// Equality, ordering and hashing use the pattern text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagPattern {
    source: String,
    regex: Regex,
}

impl TagPattern {
    pub fn new(source: impl Into<String>) -> Result<Self, MetadataError> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            MetadataError::InvalidPattern {
                pattern: source.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl TryFrom<String> for TagPattern {
    type Error = MetadataError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::new(source)
    }
}

impl From<TagPattern> for String {
    fn from(pattern: TagPattern) -> Self {
        pattern.source
    }
}

impl PartialEq for TagPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for TagPattern {}

impl Hash for TagPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl PartialOrd for TagPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TagPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source.cmp(&other.source)
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A predicate over series
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Matches every series
    True,
    /// Matches no series
    False,
    /// Matches when every child matches
    And { filters: Vec<Filter> },
    /// Matches when any child matches
    Or { filters: Vec<Filter> },
    /// Inverts its child
    Not { filter: Box<Filter> },
    /// Series key equality
    MatchKey { key: String },
    /// Tag value equality
    MatchTag { tag: String, value: String },
    /// Tag presence
    HasTag { tag: String },
    /// Tag value prefix
    StartsWith { tag: String, value: String },
    /// Tag value matches the whole pattern
    Regex { tag: String, pattern: TagPattern },
}

impl Filter {
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or { filters }
    }

    pub fn not(filter: Filter) -> Self {
        Self::Not {
            filter: Box::new(filter),
        }
    }

    pub fn match_key(key: impl Into<String>) -> Self {
        Self::MatchKey { key: key.into() }
    }

    pub fn match_tag(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MatchTag {
            tag: tag.into(),
            value: value.into(),
        }
    }

    pub fn has_tag(tag: impl Into<String>) -> Self {
        Self::HasTag { tag: tag.into() }
    }

    pub fn starts_with(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self::StartsWith {
            tag: tag.into(),
            value: value.into(),
        }
    }

    /// Fails when `pattern` is not a valid regular expression
    pub fn regex(
        tag: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self, MetadataError> {
        Ok(Self::Regex {
            tag: tag.into(),
            pattern: TagPattern::new(pattern)?,
        })
    }

    /// Short operator name, also used by the bracketed display form
    pub fn operator(&self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::And { .. } => "and",
            Self::Or { .. } => "or",
            Self::Not { .. } => "not",
            Self::MatchKey { .. } => "key",
            Self::MatchTag { .. } => "=",
            Self::HasTag { .. } => "+",
            Self::StartsWith { .. } => "^",
            Self::Regex { .. } => "~",
        }
    }

    /// Check whether the series matches this filter
    pub fn apply(&self, series: &Series) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::And { filters } => filters.iter().all(|f| f.apply(series)),
            Self::Or { filters } => filters.iter().any(|f| f.apply(series)),
            Self::Not { filter } => !filter.apply(series),
            Self::MatchKey { key } => &series.key == key,
            Self::MatchTag { tag, value } => series.tag(tag) == Some(value.as_str()),
            Self::HasTag { tag } => series.tags.contains_key(tag),
            Self::StartsWith { tag, value } => series
                .tag(tag)
                .is_some_and(|v| v.starts_with(value.as_str())),
            Self::Regex { tag, pattern } => series.tag(tag).is_some_and(|v| pattern.is_match(v)),
        }
    }

    /// Simplify the filter into a canonical form.
    ///
    /// Nested conjunctions and disjunctions are flattened, sorted and
    /// deduplicated; `true`/`false` children are folded away; double
    /// negation is removed.
    pub fn optimize(&self) -> Filter {
        match self {
            Self::And { filters } => optimize_and(filters),
            Self::Or { filters } => optimize_or(filters),
            Self::Not { filter } => match filter.as_ref() {
                Self::Not { filter } => filter.optimize(),
                other => match other.optimize() {
                    Self::True => Self::False,
                    Self::False => Self::True,
                    optimized => Self::not(optimized),
                },
            },
            other => other.clone(),
        }
    }

    /// Render the filter as query text that compiles back to this filter
    pub fn to_dsl(&self) -> String {
        match self {
            Self::True => "true".to_string(),
            Self::False => "false".to_string(),
            Self::And { filters } if filters.is_empty() => "true".to_string(),
            Self::Or { filters } if filters.is_empty() => "false".to_string(),
            Self::And { filters } => join_dsl(filters, "and", |f| {
                matches!(f, Self::And { .. } | Self::Or { .. })
            }),
            Self::Or { filters } => join_dsl(filters, "or", |f| matches!(f, Self::Or { .. })),
            Self::Not { filter } => format!("!({})", filter.to_dsl()),
            Self::MatchKey { key } => format!("key({})", quote_string(key)),
            Self::MatchTag { tag, value } => format!("{tag} = {}", quote_string(value)),
            Self::HasTag { tag } => format!("+{tag}"),
            Self::StartsWith { tag, value } => format!("{tag} ^ {}", quote_string(value)),
            Self::Regex { tag, pattern } => format!("{tag} =~ {}", quote_string(pattern.as_str())),
        }
    }
}

fn optimize_and(filters: &[Filter]) -> Filter {
    let mut children = BTreeSet::new();

    for filter in filters {
        match filter.optimize() {
            Filter::True => {}
            Filter::False => return Filter::False,
            Filter::And { filters } => children.extend(filters),
            other => {
                children.insert(other);
            }
        }
    }

    collapse(children, Filter::True, Filter::and)
}

fn optimize_or(filters: &[Filter]) -> Filter {
    let mut children = BTreeSet::new();

    for filter in filters {
        match filter.optimize() {
            Filter::False => {}
            Filter::True => return Filter::True,
            Filter::Or { filters } => children.extend(filters),
            other => {
                children.insert(other);
            }
        }
    }

    collapse(children, Filter::False, Filter::or)
}

fn collapse(
    children: BTreeSet<Filter>,
    neutral: Filter,
    build: impl FnOnce(Vec<Filter>) -> Filter,
) -> Filter {
    let mut children: Vec<Filter> = children.into_iter().collect();
    match children.len() {
        0 => neutral,
        1 => children.remove(0),
        _ => build(children),
    }
}

fn join_dsl(filters: &[Filter], op: &str, needs_parens: impl Fn(&Filter) -> bool) -> String {
    filters
        .iter()
        .map(|f| {
            if needs_parens(f) {
                format!("({})", f.to_dsl())
            } else {
                f.to_dsl()
            }
        })
        .collect::<Vec<_>>()
        .join(&format!(" {op} "))
}

/// Quote a string literal the way the query grammar reads it back
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.operator();
        match self {
            Self::True | Self::False => write!(f, "[{op}]"),
            Self::And { filters } | Self::Or { filters } => {
                write!(f, "[{op}")?;
                for filter in filters {
                    write!(f, ", {filter}")?;
                }
                write!(f, "]")
            }
            Self::Not { filter } => write!(f, "[{op}, {filter}]"),
            Self::MatchKey { key } => write!(f, "[{op}, {key}]"),
            Self::HasTag { tag } => write!(f, "[{op}, {tag}]"),
            Self::MatchTag { tag, value } | Self::StartsWith { tag, value } => {
                write!(f, "[{op}, {tag}, {value}]")
            }
            Self::Regex { tag, pattern } => write!(f, "[{op}, {tag}, {pattern}]"),
        }
    }
}
