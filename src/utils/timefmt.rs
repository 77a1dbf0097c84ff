//! Timestamp encoding shared by the persistence backends.
//!
//! Timestamps are stored as fixed-width RFC3339 strings (microsecond
//! precision, UTC) so lexicographic ordering in the database matches
//! chronological ordering.

use chrono::{DateTime, SecondsFormat, Utc};

/// Encode a timestamp into its persisted string form.
#[must_use]
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a persisted timestamp, normalizing to UTC.
pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
