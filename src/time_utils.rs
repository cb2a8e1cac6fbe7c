use chrono::{DateTime, Utc};

use crate::constants::CREATED_AT_FORMAT;

/// Current UTC timestamp.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// `Metadata.CreatedAt` stamp: `2025-01-15T10:00:00Z`.
pub fn format_created_at(dt: &DateTime<Utc>) -> String {
    dt.format(CREATED_AT_FORMAT).to_string()
}

/// ISO 8601 timestamp for SQLite columns.
pub fn to_sqlite(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse an ISO 8601 timestamp read back from SQLite.
pub fn from_sqlite(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    s.parse::<DateTime<Utc>>()
}
