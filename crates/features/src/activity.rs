//! Activity timestamp parsing.
//!
//! Upstream records carry timestamps in a handful of formats. Parsing is
//! lenient and never fails loudly: callers decide what an unknown
//! timestamp means.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse an activity timestamp. Naive forms are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole days between `timestamp` and `now`. Future timestamps count as 0.
pub fn days_since(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - timestamp).num_days().max(0)
}

/// Days since the last recorded activity, or `None` when missing or unparseable.
pub fn activity_age_days(last_activity: Option<&str>, now: DateTime<Utc>) -> Option<i64> {
    last_activity
        .and_then(parse_timestamp)
        .map(|ts| days_since(ts, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        assert!(parse_timestamp("2024-06-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-06-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-06-01 10:00:00").is_some());
        assert!(parse_timestamp("2024-06-01T10:00:00.123456").is_some());
        assert!(parse_timestamp("2024-06-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_days_since() {
        let ts = parse_timestamp("2024-06-20T12:00:00Z").unwrap();
        assert_eq!(days_since(ts, now()), 10);

        let future = parse_timestamp("2024-07-05").unwrap();
        assert_eq!(days_since(future, now()), 0);
    }

    #[test]
    fn test_activity_age_days() {
        assert_eq!(activity_age_days(Some("2024-06-23"), now()), Some(7));
        assert_eq!(activity_age_days(Some("not a date"), now()), None);
        assert_eq!(activity_age_days(None, now()), None);
    }
}
