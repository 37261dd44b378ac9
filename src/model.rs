//! Session record and timestamp helpers shared by the store, API and tracker

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One contiguous tracked period of Meet activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Session {
    /// Duration in milliseconds, computed on read
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

/// Format a timestamp the way it is persisted: RFC 3339, UTC, millisecond precision.
///
/// The fixed width keeps lexical order equal to chronological order in SQL.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Offset-carrying forms RFC 3339 parsing misses: `+0200` offsets,
/// minute precision and the basic (separator-free) format.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y%m%dT%H%M%S%#z",
];

/// Forms without an offset, read as UTC
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with any offset, the extended and basic forms in
/// [`OFFSET_FORMATS`], a naive date-time (read as UTC) and a bare
/// `YYYY-MM-DD` (midnight UTC). The result is truncated to milliseconds, the
/// precision it is stored at. Years outside 0000..=9999 are rejected since
/// they break the fixed-width stored form.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(raw)
        .ok()
        .or_else(|| {
            OFFSET_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
        })
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })?;

    if !(0..=9999).contains(&parsed.year()) {
        return None;
    }
    Some(parsed.trunc_subsecs(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_ms() {
        let session = Session {
            id: "s1".into(),
            user_id: "u1".into(),
            start_time: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 6, 1, 11, 30, 0).unwrap(),
        };
        assert_eq!(session.duration_ms(), 90 * 60 * 1000);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-06-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-06-01T10:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-06-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-06-01T10:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-06-01"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("2024-06-01T10:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-06-01T10:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-06-01T12:00:00+0200"), Some(expected));
        assert_eq!(parse_timestamp("20240601T100000Z"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-01T00:00:00Z"), None);
    }

    #[test]
    fn test_parse_timestamp_rejects_unstorable_years() {
        assert_eq!(parse_timestamp("+10000-01-01T00:00:00"), None);
        assert_eq!(parse_timestamp("+10000-01-01T00:00:00Z"), None);
        assert_eq!(parse_timestamp("-0001-01-01T00:00:00"), None);
        // Still 9999 locally, but 10000 once converted to UTC
        assert_eq!(parse_timestamp("9999-12-31T23:00:00-05:00"), None);
        assert!(parse_timestamp("9999-12-31T23:59:59Z").is_some());
    }

    #[test]
    fn test_parse_timestamp_truncates_to_millis() {
        let parsed = parse_timestamp("2024-06-01T10:00:00.0009Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
        assert_eq!(
            parse_timestamp(&format_timestamp(&parsed)),
            Some(parsed)
        );
    }

    #[test]
    fn test_format_timestamp_is_sortable() {
        let a = Utc.with_ymd_and_hms(2024, 6, 1, 9, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(&b), "2024-06-01T10:00:00.000Z");
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }
}
