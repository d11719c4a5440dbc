/// Errors raised by metadata value objects and backends
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetadataError {
    /// A date range whose start lies after its end
    #[error("Invalid date range [{start}, {end}]: start must not be after end")]
    InvalidRange { start: i64, end: i64 },
    /// A series that cannot be stored (e.g. an empty key)
    #[error("Invalid series: {0}")]
    InvalidSeries(String),
    /// A tag pattern that is not a valid regular expression
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    /// Failure reported by a backend implementation
    #[error("Backend error: {0}")]
    Backend(String),
}
