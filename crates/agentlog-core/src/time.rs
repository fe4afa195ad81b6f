//! Timestamp formatting and best-effort parsing.
//!
//! Timestamps written by this system are RFC 3339 in local time with
//! microsecond precision. Timestamps read back may come from other tools,
//! so parsing accepts offset, `Z`, and naive forms; anything else makes
//! the derived value (a duration, a clock time) degrade rather than fail.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat};

use crate::text::truncate_str;

/// Current local time as an RFC 3339 string with microseconds.
#[must_use]
pub fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Current local date as `YYYY-MM-DD`.
#[must_use]
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// `HHMMSS` form of `dt`, used in log file names.
#[must_use]
pub fn hhmmss(dt: &DateTime<Local>) -> String {
    dt.format("%H%M%S").to_string()
}

/// Parse an RFC 3339 or naive `YYYY-MM-DDTHH:MM:SS[.f]` timestamp.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    naive.and_local_timezone(Local).earliest()
}

/// Milliseconds between two timestamp strings, when both parse.
#[must_use]
pub fn duration_ms(start: &str, end: &str) -> Option<i64> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    Some((end - start).num_milliseconds())
}

/// The `HH:MM:SS` portion of a timestamp string.
///
/// Falls back to the input unchanged when it does not look like a
/// timestamp, matching how rendered logs display whatever they stored.
#[must_use]
pub fn clock_time(ts: &str) -> &str {
    match ts.split_once('T') {
        Some((_, rest)) => truncate_str(rest, 8),
        None => ts,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_iso_round_trips() {
        let ts = now_iso();
        assert!(ts.contains('T'));
        assert!(parse_timestamp(&ts).is_some());
    }

    #[test]
    fn today_shape() {
        let d = today();
        assert_eq!(d.len(), 10);
        assert_eq!(d.as_bytes()[4], b'-');
        assert_eq!(d.as_bytes()[7], b'-');
    }

    #[test]
    fn parse_offset_form() {
        assert!(parse_timestamp("2026-08-22T14:30:05.123456+09:00").is_some());
    }

    #[test]
    fn parse_zulu_form() {
        assert!(parse_timestamp("2026-08-22T05:30:05Z").is_some());
    }

    #[test]
    fn parse_naive_form() {
        assert!(parse_timestamp("2026-08-22T14:30:05").is_some());
        assert!(parse_timestamp("2026-08-22T14:30:05.123456").is_some());
    }

    #[test]
    fn parse_garbage_fails() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn duration_between_naive_stamps() {
        let ms = duration_ms("2026-08-22T14:30:05", "2026-08-22T14:30:06.500");
        assert_eq!(ms, Some(1500));
    }

    #[test]
    fn duration_can_be_negative() {
        let ms = duration_ms("2026-08-22T14:30:06", "2026-08-22T14:30:05");
        assert_eq!(ms, Some(-1000));
    }

    #[test]
    fn duration_none_on_bad_input() {
        assert_eq!(duration_ms("not-a-time", "2026-08-22T14:30:05"), None);
        assert_eq!(duration_ms("2026-08-22T14:30:05", ""), None);
    }

    #[test]
    fn clock_time_slices_after_t() {
        assert_eq!(clock_time("2026-08-22T14:30:05.123456+09:00"), "14:30:05");
        assert_eq!(clock_time("2026-08-22T14:30:05"), "14:30:05");
    }

    #[test]
    fn clock_time_passes_through_odd_input() {
        assert_eq!(clock_time("14:30"), "14:30");
        assert_eq!(clock_time(""), "");
    }
}
