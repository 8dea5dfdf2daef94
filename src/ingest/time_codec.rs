//! Timestamp text → epoch seconds
//!
//! Naive datetimes are read as UTC so the same file indexes identically on any host.

use crate::error::{LedgerError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// The only format accepted from interactive callers
pub const STRICT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lenient parse used by the importer: integer epoch seconds, RFC 3339,
/// ISO-like naive datetimes (with `T` or a space) or a bare date.
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(LedgerError::validation("empty timestamp"));
    }

    if let Ok(epoch) = s.parse::<i64>() {
        return Ok(epoch);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().timestamp());
    }

    Err(LedgerError::validation(format!("unparseable timestamp '{}'", s)))
}

/// Epoch float truncated to whole seconds, or `None` outside the i64 range
fn float_to_epoch(f: f64) -> Option<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    (t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

/// Timestamp from a JSON cell. Numbers are truncated to whole seconds.
pub fn parse_timestamp_value(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_epoch))
            .ok_or_else(|| LedgerError::validation(format!("timestamp out of range: {}", n))),
        Value::String(s) => parse_timestamp(s),
        Value::Null => Err(LedgerError::validation("missing timestamp")),
        other => Err(LedgerError::validation(format!(
            "unsupported timestamp value: {}",
            other
        ))),
    }
}

/// `YYYY-MM-DD HH:MM:SS` only. Digit strings are rejected so callers cannot
/// pass raw epoch values where a datetime is expected.
pub fn parse_datetime_strict(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() || s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(s, STRICT_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Inverse of the strict parser, for display
pub fn format_timestamp(epoch: i64) -> Option<String> {
    DateTime::from_timestamp(epoch, 0).map(|dt| dt.format(STRICT_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_epoch_and_datetime_forms() {
        assert_eq!(parse_timestamp("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_timestamp(" -5 ").unwrap(), -5);
        assert_eq!(parse_timestamp("2024-01-01 00:00:00").unwrap(), 1_704_067_200);
        assert_eq!(parse_timestamp("2024-01-01T00:00:10").unwrap(), 1_704_067_210);
        assert_eq!(parse_timestamp("2024-01-01T01:00:00+01:00").unwrap(), 1_704_067_200);
        assert_eq!(parse_timestamp("2024-01-01").unwrap(), 1_704_067_200);
    }

    #[test]
    fn test_garbage_is_validation_error() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(err.is_validation());
        assert!(parse_timestamp("   ").unwrap_err().is_validation());
    }

    #[test]
    fn test_json_values() {
        assert_eq!(parse_timestamp_value(&json!(42)).unwrap(), 42);
        assert_eq!(parse_timestamp_value(&json!(42.9)).unwrap(), 42);
        assert_eq!(parse_timestamp_value(&json!("43")).unwrap(), 43);
        assert!(parse_timestamp_value(&Value::Null).is_err());
        assert!(parse_timestamp_value(&json!([1])).is_err());
    }

    #[test]
    fn test_out_of_range_numbers_rejected() {
        assert!(parse_timestamp_value(&json!(1e300)).is_err());
        assert!(parse_timestamp_value(&json!(-1e300)).is_err());
        assert!(parse_timestamp_value(&json!(u64::MAX)).is_err());
        assert_eq!(parse_timestamp_value(&json!(-42.5)).unwrap(), -42);
    }

    #[test]
    fn test_strict_parser_rejects_epoch_strings() {
        assert_eq!(parse_datetime_strict("1700000000"), None);
        assert_eq!(parse_datetime_strict(""), None);
        assert_eq!(parse_datetime_strict("2024-01-01T00:00:00"), None);
        assert_eq!(parse_datetime_strict("2024-01-01 00:00:00"), Some(1_704_067_200));
    }

    #[test]
    fn test_format_roundtrips_strict() {
        let text = format_timestamp(1_704_067_210).unwrap();
        assert_eq!(text, "2024-01-01 00:00:10");
        assert_eq!(parse_datetime_strict(&text), Some(1_704_067_210));
    }
}
