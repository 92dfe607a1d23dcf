//! Wall-clock helpers. Store write timestamps are microseconds since the Unix
//! epoch (UTC); later timestamps win when the store reconciles writes.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_micros() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();

    i64::try_from(nanos / 1_000).unwrap_or(i64::MAX)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();

    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}

/// Render a microsecond timestamp as RFC 3339, falling back to the raw number.
#[must_use]
pub fn format_micros(micros: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| micros.to_string())
}
