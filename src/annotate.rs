//! Staleness and trend annotation of the merged reading.
//!
//! Buienradar stations report every 10 minutes. When the feed keeps serving
//! the same old measurement (station outage, stuck upstream cache) the
//! display must show an error instead of pretending the weather is frozen.
//!
//! # Clock injection
//! All functions accept a `now: DateTime<Utc>` parameter rather than calling
//! `Utc::now()` internally, which keeps staleness deterministic in tests.

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};

use crate::model::{Record, FIELD_BAROMETRIC_TREND, FIELD_ERROR, FIELD_TIMESTAMP};
use crate::trend::BarometricTrend;

/// Readings older than this are unusable.
pub const STALE_AFTER_MINUTES: i64 = 120;

/// Format of the feed's offset-less timestamps, e.g. "2021-06-19T13:40:00".
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parses a measurement timestamp.
///
/// Accepts RFC 3339 (with offset) and the feed's own offset-less form, which
/// is local time of the machine running the service.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(text, NAIVE_TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp '{}': {}", text, e))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("timestamp '{}' does not exist in local time", text))
}

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Returns `true` if the reading's timestamp is older than `max_age_minutes`
/// relative to `now`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
///
/// Returns an error if the reading has no timestamp or it cannot be parsed.
/// Callers treat that as stale.
pub fn is_stale_at(
    reading: &Record,
    max_age_minutes: i64,
    now: DateTime<Utc>,
) -> Result<bool, String> {
    let text = reading
        .text(FIELD_TIMESTAMP)
        .ok_or_else(|| "reading has no timestamp".to_string())?;
    let measured = parse_timestamp(text)?;
    Ok(now - measured > Duration::minutes(max_age_minutes))
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// Adds the constant "stable" barometric trend and the staleness error.
pub fn annotate(reading: &Record, now: DateTime<Utc>) -> Record {
    annotate_with_trend(reading, BarometricTrend::Stable, now)
}

/// Adds `trend` and forces `error = true` when the reading is stale or its
/// timestamp is unusable. An error already set is never cleared.
///
/// Pure: no logging, no locks. Callers wanting to report why a reading was
/// rejected use `is_stale_at` directly.
pub fn annotate_with_trend(reading: &Record, trend: BarometricTrend, now: DateTime<Utc>) -> Record {
    let mut annotated = reading.clone();
    annotated.insert(FIELD_BAROMETRIC_TREND, trend.code() as f64);

    let unusable = is_stale_at(reading, STALE_AFTER_MINUTES, now).unwrap_or(true);

    if unusable || reading.flag(FIELD_ERROR) {
        annotated.insert(FIELD_ERROR, true);
    }
    annotated
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    fn reading_at(timestamp: &str) -> Record {
        Record::new()
            .with("temperature", 20.2)
            .with("timestamp", timestamp)
            .with("error", false)
    }

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    // --- Not stale ----------------------------------------------------------

    #[test]
    fn test_reading_10_minutes_old_is_not_stale() {
        let reading = reading_at("2024-05-01T12:50:00+00:00");
        let stale = is_stale_at(&reading, STALE_AFTER_MINUTES, fixed_now())
            .expect("valid timestamp should not error");
        assert!(!stale);
    }

    #[test]
    fn test_reading_exactly_at_threshold_is_not_stale() {
        let reading = reading_at("2024-05-01T11:00:00+00:00");
        let stale = is_stale_at(&reading, STALE_AFTER_MINUTES, fixed_now())
            .expect("valid timestamp should not error");
        assert!(!stale, "staleness is strictly greater than, not >=");
    }

    #[test]
    fn test_offset_is_honoured() {
        // 14:30 at +02:00 is 12:30 UTC, 30 minutes before fixed_now.
        let reading = reading_at("2024-05-01T14:30:00+02:00");
        let stale = is_stale_at(&reading, 20, fixed_now()).expect("should parse");
        assert!(stale);
        let stale = is_stale_at(&reading, 60, fixed_now()).expect("should parse");
        assert!(!stale);
    }

    #[test]
    fn test_naive_timestamp_is_local_time() {
        let naive = NaiveDateTime::parse_from_str("2021-06-19T13:40:00", NAIVE_TIMESTAMP_FORMAT)
            .expect("fixture timestamp should parse");
        let measured = Local
            .from_local_datetime(&naive)
            .earliest()
            .expect("mid-June noon exists in every zone")
            .with_timezone(&Utc);

        assert_eq!(parse_timestamp("2021-06-19T13:40:00"), Ok(measured));

        let reading = reading_at("2021-06-19T13:40:00");
        let now = measured + chrono::Duration::minutes(30);
        assert_eq!(is_stale_at(&reading, STALE_AFTER_MINUTES, now), Ok(false));
    }

    // --- Stale --------------------------------------------------------------

    #[test]
    fn test_reading_one_minute_past_threshold_is_stale() {
        let reading = reading_at("2024-05-01T10:59:00+00:00");
        let stale = is_stale_at(&reading, STALE_AFTER_MINUTES, fixed_now())
            .expect("valid timestamp should not error");
        assert!(stale);
    }

    #[test]
    fn test_reading_seconds_past_threshold_is_stale() {
        let reading = reading_at("2024-05-01T10:59:30+00:00");
        let stale = is_stale_at(&reading, STALE_AFTER_MINUTES, fixed_now())
            .expect("valid timestamp should not error");
        assert!(stale, "2h00m30s is past the two-hour threshold");

        let annotated = annotate(&reading, fixed_now());
        assert!(annotated.flag("error"));
    }

    // --- Error handling -----------------------------------------------------

    #[test]
    fn test_invalid_timestamp_returns_error() {
        let reading = reading_at("not-a-datetime");
        assert!(is_stale_at(&reading, STALE_AFTER_MINUTES, fixed_now()).is_err());
    }

    #[test]
    fn test_missing_timestamp_returns_error() {
        let reading = Record::new().with("timestamp", Value::Missing);
        assert!(is_stale_at(&reading, STALE_AFTER_MINUTES, fixed_now()).is_err());
    }

    // --- Annotation ---------------------------------------------------------

    #[test]
    fn test_three_hour_old_reading_becomes_error() {
        let reading = reading_at("2024-05-01T10:00:00+00:00");
        let annotated = annotate(&reading, fixed_now());
        assert!(annotated.flag("error"));
    }

    #[test]
    fn test_fresh_reading_keeps_error_false() {
        let reading = reading_at("2024-05-01T12:50:00+00:00");
        let annotated = annotate(&reading, fixed_now());
        assert!(!annotated.flag("error"));
        assert_eq!(annotated.number("temperature"), Some(20.2));
    }

    #[test]
    fn test_fresh_reading_does_not_clear_existing_error() {
        let reading = reading_at("2024-05-01T12:50:00+00:00").with("error", true);
        let annotated = annotate(&reading, fixed_now());
        assert!(annotated.flag("error"));
    }

    #[test]
    fn test_malformed_timestamp_is_an_error_not_a_panic() {
        let annotated = annotate(&reading_at("yesterday"), fixed_now());
        assert!(annotated.flag("error"));
    }

    #[test]
    fn test_trend_codes_are_written() {
        let reading = reading_at("2024-05-01T12:50:00+00:00");
        let annotated = annotate(&reading, fixed_now());
        assert_eq!(annotated.number("barometric_trend"), Some(4.0));

        let annotated = annotate_with_trend(&reading, BarometricTrend::Falling, fixed_now());
        assert_eq!(annotated.number("barometric_trend"), Some(2.0));
        let annotated = annotate_with_trend(&reading, BarometricTrend::Rising, fixed_now());
        assert_eq!(annotated.number("barometric_trend"), Some(1.0));
    }

    #[test]
    fn test_input_reading_is_untouched() {
        let reading = reading_at("2020-01-01T00:00:00+00:00");
        let _ = annotate(&reading, fixed_now());
        assert!(!reading.flag("error"));
        assert!(reading.get("barometric_trend").is_none());
    }
}
