//! Timestamp parsing and formatting
//!
//! All accepted SQL date formats, tried most specific first so a fully
//! qualified timestamp is never truncated to a bare date. A plain integer
//! never parses as a date.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};

use crate::error::{QuartzError, Result};

/// Short date format with a human-readable month element, e.g. `2015-Sep-10`.
pub const DATE_SHORT_FORMAT: &str = "%Y-%b-%d";

/// Fully numeric short date format, e.g. `2015-09-10`.
pub const DATE_NUMBER_FORMAT: &str = "%Y-%m-%d";

/// Long textual format without the trailing zone name, e.g.
/// `2015-09-10 13:37:00.000042 +0200`.
pub const DATE_TEXTUAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// Parse all accepted SQL date formats.
pub fn parse_date(data: &str) -> Result<DateTime<FixedOffset>> {
    // RFC 3339, with or without fractional seconds.
    if let Ok(t) = DateTime::parse_from_rfc3339(data) {
        return Ok(t);
    }

    // Long textual format, `YYYY-MM-DD HH:MM:SS[.f] ±ZZZZ TZ`. The trailing
    // zone abbreviation is informational only; the offset is authoritative.
    if let Ok(t) = DateTime::parse_from_str(strip_zone_name(data), DATE_TEXTUAL_FORMAT) {
        return Ok(t);
    }

    if let Ok(d) = NaiveDate::parse_from_str(data, DATE_SHORT_FORMAT) {
        return Ok(midnight_utc(d));
    }

    if let Ok(d) = NaiveDate::parse_from_str(data, DATE_NUMBER_FORMAT) {
        return Ok(midnight_utc(d));
    }

    Err(QuartzError::Type(format!("not a date: {data}")))
}

/// Current wall-clock time, the value NOW()/CURRENT_TIMESTAMP materialize to.
pub fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

/// Format a timestamp cell for emission: RFC 3339 with sub-second digits.
pub fn format_long(t: &DateTime<FixedOffset>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn midnight_utc(d: NaiveDate) -> DateTime<FixedOffset> {
    d.and_time(NaiveTime::MIN).and_utc().fixed_offset()
}

/// Drop a trailing ` TZ` zone-name token (`... +0200 CEST` -> `... +0200`).
fn strip_zone_name(data: &str) -> &str {
    match data.rsplit_once(' ') {
        Some((head, tail))
            if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            head
        }
        _ => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_nano() {
        let t = parse_date("2015-09-10T13:37:00.000000042+02:00").unwrap();
        assert_eq!(t.timestamp_subsec_nanos(), 42);
    }

    #[test]
    fn test_parse_numeric_date() {
        let t = parse_date("2015-09-10").unwrap();
        assert_eq!(format_long(&t), "2015-09-10T00:00:00Z");
    }

    #[test]
    fn test_parse_month_name_date() {
        let t = parse_date("2015-Sep-10").unwrap();
        assert_eq!(format_long(&t), "2015-09-10T00:00:00Z");
    }

    #[test]
    fn test_parse_textual_with_zone_name() {
        let t = parse_date("2015-09-10 13:37:00.000042 +0200 CEST").unwrap();
        assert_eq!(t.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_bare_integer_is_not_a_date() {
        assert!(parse_date("2015").is_err());
        assert!(parse_date("42").is_err());
    }

    #[test]
    fn test_roundtrip_through_long_format() {
        let t = now();
        let back = parse_date(&format_long(&t)).unwrap();
        assert_eq!(t, back);
    }
}
