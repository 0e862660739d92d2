//! DateTime parsing utilities with consistent error handling.

use chrono::{DateTime, Utc};

/// Parses an RFC3339 timestamp string, returning an error if parsing fails.
///
/// Timestamps are persisted as RFC3339 text by the SQLite adapters.
///
/// # Examples
///
/// ```
/// use taleweaver_domain::common::parse_datetime;
/// use chrono::Datelike;
///
/// let dt = parse_datetime("2024-01-15T10:30:00Z").unwrap();
/// assert_eq!(dt.year(), 2024);
/// ```
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_offsets_into_utc() {
        let dt = parse_datetime("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("yesterday").is_err());
    }
}
