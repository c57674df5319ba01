//! Nanosecond epoch time helpers.
//!
//! All record and section times are signed nanoseconds from the Unix epoch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Nanoseconds since 1970-01-01T00:00:00Z.
pub type NsTime = i64;

/// Nanoseconds per second.
pub const NS_PER_SEC: i64 = 1_000_000_000;

/// Split a nanosecond time into whole seconds and a non-negative
/// nanosecond remainder.
pub fn split(ns: NsTime) -> (i64, u32) {
    (ns.div_euclid(NS_PER_SEC), ns.rem_euclid(NS_PER_SEC) as u32)
}

/// Epoch seconds as a float, for numeric columns.
pub fn to_epoch_seconds(ns: NsTime) -> f64 {
    ns as f64 / NS_PER_SEC as f64
}

/// Epoch seconds rounded to microseconds, formatted `%.6f`.
pub fn epoch_micro_string(ns: NsTime) -> String {
    format!("{:.6}", to_epoch_seconds(ns))
}

fn datetime(ns: NsTime) -> DateTime<Utc> {
    let (secs, nanos) = split(ns);
    DateTime::from_timestamp(secs, nanos).unwrap_or_default()
}

/// ISO-8601 with microsecond precision: `YYYY-MM-DDTHH:MM:SS.ffffff`.
pub fn iso_micro(ns: NsTime) -> String {
    datetime(ns).format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// ISO-8601 with whole-second precision: `YYYY-MM-DDTHH:MM:SS`.
pub fn iso_seconds(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// Parse an ISO-8601 date-time (optionally fractional, optional `Z`)
/// back into nanoseconds.
pub fn parse_iso(text: &str) -> Option<NsTime> {
    let text = text.trim().trim_end_matches('Z');
    let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    let dt = parsed.and_utc();
    Some(dt.timestamp() * NS_PER_SEC + i64::from(dt.timestamp_subsec_nanos()))
}

/// Build a nanosecond time from a year / day-of-year civil time.
///
/// `second` may be 60 during a leap second; the caller is expected to
/// re-map it onto the repeated UTC second when a leap table is loaded.
pub fn from_yday(
    year: i32,
    yday: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
) -> Option<NsTime> {
    let date = NaiveDate::from_yo_opt(year, yday)?;
    let leap_carry = second.saturating_sub(59);
    let time = date.and_hms_opt(hour, minute, second.min(59))?;
    let base = time.and_utc().timestamp();
    Some((base + i64::from(leap_carry)) * NS_PER_SEC + i64::from(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_round_trip() {
        let ns = 1_388_534_400 * NS_PER_SEC + 123_456_000;
        assert_eq!(iso_micro(ns), "2014-01-01T00:00:00.123456");
        assert_eq!(parse_iso("2014-01-01T00:00:00.123456"), Some(ns));
    }

    #[test]
    fn seconds_format_has_no_fraction() {
        assert_eq!(iso_seconds(1_388_534_400), "2014-01-01T00:00:00");
    }

    #[test]
    fn parse_accepts_space_separator() {
        assert_eq!(
            parse_iso("2014-01-01 00:00:00"),
            Some(1_388_534_400 * NS_PER_SEC)
        );
    }

    #[test]
    fn negative_times_split_correctly() {
        let (secs, nanos) = split(-1_500_000_000);
        assert_eq!(secs, -2);
        assert_eq!(nanos, 500_000_000);
    }

    #[test]
    fn yday_conversion() {
        // 2014-060 is 2014-03-01.
        let ns = from_yday(2014, 60, 12, 30, 0, 0).unwrap();
        assert_eq!(iso_micro(ns), "2014-03-01T12:30:00.000000");
    }

    #[test]
    fn second_sixty_lands_on_next_minute() {
        let ns = from_yday(2015, 181, 23, 59, 60, 0).unwrap();
        assert_eq!(iso_micro(ns), "2015-07-01T00:00:00.000000");
    }
}
