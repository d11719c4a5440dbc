//! Request and response objects exchanged with a metadata backend.
//!
//! These are value objects only. Every response carries a [`Statistics`]
//! summary which is empty unless the backend reports something.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::series::{DateRange, Series};
use crate::statistics::Statistics;

/// Buffer a write for a single series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteMetadataRequest {
    pub series: Series,
    pub range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WriteMetadataResponse {
    /// Identifier of the written series
    pub id: String,
    #[serde(default)]
    pub statistics: Statistics,
}

macro_rules! filter_request {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub filter: Filter,
            pub range: DateRange,
            /// Upper bound on the number of results, unlimited when absent
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub limit: Option<usize>,
        }

        impl $name {
            pub fn new(filter: Filter, range: DateRange, limit: Option<usize>) -> Self {
                Self {
                    filter,
                    range,
                    limit,
                }
            }
        }
    };
}

filter_request!(
    /// Find tag names and values of matching series
    FindTagsRequest
);
filter_request!(
    /// Find matching series
    FindSeriesRequest
);
filter_request!(
    /// Find identifiers of matching series
    FindSeriesIdsRequest
);
filter_request!(
    /// Count matching series
    CountSeriesRequest
);
filter_request!(
    /// Delete matching series
    DeleteSeriesRequest
);
filter_request!(
    /// Find the distinct keys of matching series
    FindKeysRequest
);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FindTagsResponse {
    pub tags: BTreeMap<String, BTreeSet<String>>,
    /// Number of series that contributed tags
    pub size: usize,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FindSeriesResponse {
    pub series: Vec<Series>,
    pub limited: bool,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FindSeriesIdsResponse {
    pub ids: BTreeSet<String>,
    pub limited: bool,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountSeriesResponse {
    pub count: u64,
    pub limited: bool,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeleteSeriesResponse {
    pub deleted: u64,
    pub failed: u64,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FindKeysResponse {
    pub keys: BTreeSet<String>,
    /// Number of series inspected
    pub size: usize,
    /// Number of series whose key was already seen
    pub duplicates: usize,
    #[serde(default)]
    pub statistics: Statistics,
}

/// The kinds of request a query can be compiled into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    Write,
    FindTags,
    FindSeries,
    FindSeriesIds,
    CountSeries,
    DeleteSeries,
    FindKeys,
}

impl RequestKind {
    pub const ALL: [RequestKind; 7] = [
        Self::Write,
        Self::FindTags,
        Self::FindSeries,
        Self::FindSeriesIds,
        Self::CountSeries,
        Self::DeleteSeries,
        Self::FindKeys,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::FindTags => "find-tags",
            Self::FindSeries => "find-series",
            Self::FindSeriesIds => "find-series-ids",
            Self::CountSeries => "count-series",
            Self::DeleteSeries => "delete-series",
            Self::FindKeys => "find-keys",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown request kind '{s}', expected one of: {}", names.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "kebab-case")]
pub enum MetadataRequest {
    Write(WriteMetadataRequest),
    FindTags(FindTagsRequest),
    FindSeries(FindSeriesRequest),
    FindSeriesIds(FindSeriesIdsRequest),
    CountSeries(CountSeriesRequest),
    DeleteSeries(DeleteSeriesRequest),
    FindKeys(FindKeysRequest),
}

impl MetadataRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Write(_) => RequestKind::Write,
            Self::FindTags(_) => RequestKind::FindTags,
            Self::FindSeries(_) => RequestKind::FindSeries,
            Self::FindSeriesIds(_) => RequestKind::FindSeriesIds,
            Self::CountSeries(_) => RequestKind::CountSeries,
            Self::DeleteSeries(_) => RequestKind::DeleteSeries,
            Self::FindKeys(_) => RequestKind::FindKeys,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "kebab-case")]
pub enum MetadataResponse {
    Write(WriteMetadataResponse),
    FindTags(FindTagsResponse),
    FindSeries(FindSeriesResponse),
    FindSeriesIds(FindSeriesIdsResponse),
    CountSeries(CountSeriesResponse),
    DeleteSeries(DeleteSeriesResponse),
    FindKeys(FindKeysResponse),
}

impl MetadataResponse {
    pub fn statistics(&self) -> &Statistics {
        match self {
            Self::Write(r) => &r.statistics,
            Self::FindTags(r) => &r.statistics,
            Self::FindSeries(r) => &r.statistics,
            Self::FindSeriesIds(r) => &r.statistics,
            Self::CountSeries(r) => &r.statistics,
            Self::DeleteSeries(r) => &r.statistics,
            Self::FindKeys(r) => &r.statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind_parsing() {
        for kind in RequestKind::ALL {
            assert_eq!(kind.name().parse::<RequestKind>().unwrap(), kind);
        }
        let err = "find-everything".parse::<RequestKind>().unwrap_err();
        assert!(err.contains("find-series-ids"));
    }

    #[test]
    fn test_statistics_default_when_missing() {
        let response: CountSeriesResponse =
            serde_json::from_str(r#"{"count": 3, "limited": false}"#).unwrap();
        assert_eq!(response.count, 3);
        assert!(response.statistics.is_empty());
    }

    #[test]
    fn test_request_serialization() {
        let request = MetadataRequest::FindSeries(FindSeriesRequest::new(
            Filter::match_tag("host", "a"),
            DateRange::new(0, 10).unwrap(),
            None,
        ));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["request"], "find-series");
        assert_eq!(json["filter"]["type"], "match_tag");
        assert!(json.get("limit").is_none());
        assert_eq!(request.kind(), RequestKind::FindSeries);
    }
}
