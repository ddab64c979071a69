//! Lenient timestamp parsing for backend records.
//!
//! The backend emits naive ISO-8601 timestamps (no offset) for rows created
//! with a UTC clock, while other producers send RFC 3339. Both are accepted and
//! normalised to UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error as _};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 or naive ISO-8601 timestamp, assuming UTC for the latter.
#[must_use]
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}

/// Serde adapter for required timestamps.
///
/// # Errors
///
/// Returns a deserialisation error when the value is not a recognised timestamp.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| D::Error::custom(format!("unrecognised timestamp '{raw}'")))
}

/// Serde adapter for optional timestamps; unparseable values become `None`.
///
/// # Errors
///
/// Returns a deserialisation error only when the value is not a string or null.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_naive_backend_timestamps_as_utc() {
        let parsed = parse("2025-03-14T09:26:53.589793").expect("naive timestamp");
        assert_eq!(parsed.year(), 2025);
        assert_eq!(parsed.hour(), 9);
        assert_eq!(parsed.nanosecond(), 589_793_000);
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse("2025-03-14T09:26:53+02:00").expect("rfc3339 timestamp");
        assert_eq!(parsed.hour(), 7);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("yesterday").is_none());
        assert!(parse("").is_none());
    }
}
