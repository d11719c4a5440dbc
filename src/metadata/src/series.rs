//! Series identity and the time window a request covers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MetadataError;
use crate::filter::quote_string;

/// A time series, identified by its key and its tag set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Series {
    /// Series key (the metric name)
    pub key: String,
    /// Tags, kept sorted so that identity does not depend on insertion order
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Series {
    /// Create a series with the given key and no tags
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Add a tag to this series
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    /// Get a tag value by name
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(|s| s.as_str())
    }

    /// Hex SHA-256 of the key and tags, each length-prefixed
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        let mut field = |value: &str| {
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        };

        field(&self.key);
        for (name, value) in &self.tags {
            field(name);
            field(value);
        }
        hex::encode(hasher.finalize())
    }

    /// Reject series that no backend can index
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.key.is_empty() {
            return Err(MetadataError::InvalidSeries(
                "series key cannot be empty".to_string(),
            ));
        }
        if let Some(name) = self.tags.keys().find(|name| name.is_empty()) {
            return Err(MetadataError::InvalidSeries(format!(
                "tag name cannot be empty (value {})",
                quote_string(&self.tags[name])
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.key)?;
        for (i, (name, value)) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name} = {}", quote_string(value))?;
        }
        write!(f, "}}")
    }
}

/// A closed time window in milliseconds since epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn new(start: i64, end: i64) -> Result<Self, MetadataError> {
        if start > end {
            return Err(MetadataError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range ending at `end` and reaching back `lookback_ms`
    pub fn ending_at(end: i64, lookback_ms: i64) -> Self {
        Self {
            start: end.saturating_sub(lookback_ms.max(0)),
            end,
        }
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest range covering both
    pub fn join(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}
