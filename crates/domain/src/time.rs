//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike, Utc};

/// UTC timestamp used for event times, health history and export stamps.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Truncate a wall-clock reading to the start of its minute.
///
/// Time windows compare at minute granularity, like the `HH:MM` strings
/// they are configured with.
#[must_use]
pub fn minute_of(at: NaiveDateTime) -> NaiveTime {
    NaiveTime::from_hms_opt(at.hour(), at.minute(), 0).unwrap_or(NaiveTime::MIN)
}

/// Parse an `HH:MM` string.
///
/// # Errors
///
/// Returns the chrono parse error when the string is not a valid time.
pub fn parse_hh_mm(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
}
