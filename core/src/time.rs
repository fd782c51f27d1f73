//! Time related utils.

use chrono::TimeZone;
use chrono::Utc;

use crate::Error;
use crate::Result;

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create a new DateTime from now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Create a DateTime from unix seconds.
pub fn from_timestamp(secs: i64) -> Result<DateTime> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| Error::config_invalid(format!("timestamp {secs} is out of range")))
}

/// Format time into ISO 8601 with separators at second precision: "2023-11-14T22:13:20Z"
///
/// This is the format used by both the signing key info and the
/// `x-attains-date` header.
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
