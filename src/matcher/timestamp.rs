//! Timestamp helpers: RFC 3339 literals and the current time, both as
//! nanoseconds since the Unix epoch.

use chrono::{DateTime, Utc};

/// Parse an RFC 3339 date-time such as `2015-04-11T17:30:26.113Z`.
///
/// Returns `None` for text that is not a full date-time with offset, or one
/// outside the range representable in `i64` nanoseconds.
pub fn parse_rfc3339(text: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(text)
        .ok()?
        .timestamp_nanos_opt()
}

/// Current wall-clock time.
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
