//! Date-time parsing for feed timestamps.
//!
//! Two dialects are understood: the RFC 1123 family used by RSS
//! (`Mon, 02 Jan 2006 15:04:05 PST`) and ISO 8601 used by Atom
//! (`2006-01-02T15:04:05-08:00`). Zone abbreviations resolve against a
//! fixed table instead of the host's locale or time zone database, so the
//! result does not depend on where the process runs.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateDialect {
    Rfc1123,
    Iso8601,
}

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Zone abbreviations and their offset from UTC in minutes.
const ZONES: &[(&str, i32)] = &[
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("WET", 0),
    ("EST", -5 * 60),
    ("EDT", -4 * 60),
    ("CST", -6 * 60),
    ("CDT", -5 * 60),
    ("MST", -7 * 60),
    ("MDT", -6 * 60),
    ("PST", -8 * 60),
    ("PDT", -7 * 60),
    ("AKST", -9 * 60),
    ("AKDT", -8 * 60),
    ("HST", -10 * 60),
    ("BST", 60),
    ("WEST", 60),
    ("CET", 60),
    ("CEST", 2 * 60),
    ("EET", 2 * 60),
    ("EEST", 3 * 60),
    ("MSK", 3 * 60),
    ("IST", 5 * 60 + 30),
    ("HKT", 8 * 60),
    ("AWST", 8 * 60),
    ("JST", 9 * 60),
    ("KST", 9 * 60),
    ("ACST", 9 * 60 + 30),
    ("AEST", 10 * 60),
    ("AEDT", 11 * 60),
    ("NZST", 12 * 60),
    ("NZDT", 13 * 60),
];

pub fn parse(text: &str, dialect: DateDialect) -> Option<DateTime<Utc>> {
    match dialect {
        DateDialect::Rfc1123 => parse_rfc1123(text),
        DateDialect::Iso8601 => parse_iso8601(text),
    }
}

/// Parse `text`, substituting `now` when it is missing or malformed.
///
/// Ingestion never aborts because of a single bad date.
pub fn parse_or_now(text: Option<&str>, dialect: DateDialect, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(text) = text else {
        return now;
    };

    parse(text, dialect).unwrap_or_else(|| {
        debug!("Unparseable {:?} date {:?}, falling back to now", dialect, text);
        now
    })
}

/// `[Wdy,] DD Mon YYYY HH:MM[:SS] [zone]`
///
/// The zone may be an abbreviation from the fixed table, a numeric offset
/// (`+0200`, `-08:00`) or `GMT`/`UTC` followed by an offset. A missing zone
/// is read as UTC. Two-digit years are rejected.
pub fn parse_rfc1123(text: &str) -> Option<DateTime<Utc>> {
    let mut rest = text.trim();

    if let Some((head, tail)) = rest.split_once(',') {
        if !is_weekday(head.trim()) {
            return None;
        }
        rest = tail;
    }

    let mut tokens = rest.split_whitespace();

    let first = tokens.next()?;
    // Weekday without the comma, e.g. "Mon 02 Jan 2006 ..."
    let day_token = if is_weekday(first) { tokens.next()? } else { first };

    let day: u32 = parse_digits(day_token, 1, 2)?;
    let month = month_number(tokens.next()?)?;
    let year: i32 = parse_digits(tokens.next()?, 4, 4)?;
    let time = parse_time_of_day(tokens.next()?)?;

    let offset_minutes = match tokens.next() {
        None => 0,
        Some(zone) => zone_offset(zone)?,
    };

    if tokens.next().is_some() {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let offset = FixedOffset::east_opt(offset_minutes * 60)?;
    let local = offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()?;

    Some(local.with_timezone(&Utc))
}

/// ISO 8601 date-time with an offset (`Z`, `+HH:MM`, `+HHMM`), optional
/// fractional seconds and optional seconds. Timestamps without an offset
/// and bare dates are read as UTC.
pub fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    const WITH_OFFSET: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%dT%H:%M%:z",
    ];
    for format in WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = text.strip_suffix(['Z', 'z']).unwrap_or(text);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

fn is_weekday(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    WEEKDAYS.iter().any(|day| {
        lower == *day || (lower.len() > 3 && lower.starts_with(day) && full_weekday(&lower))
    })
}

fn full_weekday(lower: &str) -> bool {
    matches!(
        lower,
        "monday" | "tuesday" | "wednesday" | "thursday" | "friday" | "saturday" | "sunday"
    )
}

fn month_number(token: &str) -> Option<u32> {
    let lower = token.to_ascii_lowercase();
    if lower.len() < 3 || !lower.is_ascii() {
        return None;
    }
    let position = MONTHS.iter().position(|m| lower.starts_with(m))?;
    // Accept "Jan" and "January", but not "Janx"
    if lower.len() > 3 && lower != full_month(position) {
        return None;
    }
    Some(position as u32 + 1)
}

fn full_month(index: usize) -> &'static str {
    const FULL: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    FULL[index]
}

fn parse_time_of_day(token: &str) -> Option<NaiveTime> {
    let mut parts = token.split(':');
    let hour = parse_digits(parts.next()?, 2, 2)?;
    let minute = parse_digits(parts.next()?, 2, 2)?;
    let second = match parts.next() {
        Some(s) => parse_digits(s, 2, 2)?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn zone_offset(token: &str) -> Option<i32> {
    if let Some(minutes) = numeric_offset(token) {
        return Some(minutes);
    }

    let upper = token.to_ascii_uppercase();
    for prefix in ["GMT", "UTC"] {
        if let Some(rest) = upper.strip_prefix(prefix) {
            if !rest.is_empty() {
                return numeric_offset(rest);
            }
        }
    }

    ZONES
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, minutes)| *minutes)
}

/// `+HHMM`, `-HHMM`, `+HH:MM`, `-HH:MM`
fn numeric_offset(token: &str) -> Option<i32> {
    let (sign, digits) = match token.as_bytes().first()? {
        b'+' => (1, &token[1..]),
        b'-' => (-1, &token[1..]),
        _ => return None,
    };
    let digits = digits.replace(':', "");
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = parse_digits(&digits[..2], 2, 2)?;
    let minutes: i32 = parse_digits(&digits[2..], 2, 2)?;
    if minutes >= 60 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

fn parse_digits<T: std::str::FromStr>(token: &str, min: usize, max: usize) -> Option<T> {
    if token.len() < min || token.len() > max || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_rfc1123_with_zone_abbreviation() {
        assert_eq!(
            parse_rfc1123("Mon, 02 Jan 2006 15:04:05 PST"),
            Some(utc(2006, 1, 2, 23, 4, 5))
        );
        assert_eq!(
            parse_rfc1123("Mon, 02 Jan 2006 15:04:05 EDT"),
            Some(utc(2006, 1, 2, 19, 4, 5))
        );
    }

    #[test]
    fn test_rfc1123_gmt_and_numeric_offsets() {
        assert_eq!(
            parse_rfc1123("Mon, 01 Jan 2024 00:00:00 GMT"),
            Some(utc(2024, 1, 1, 0, 0, 0))
        );
        assert_eq!(
            parse_rfc1123("Tue, 10 Jun 2003 04:00:00 +0200"),
            Some(utc(2003, 6, 10, 2, 0, 0))
        );
        assert_eq!(
            parse_rfc1123("Tue, 10 Jun 2003 04:00:00 -05:30"),
            Some(utc(2003, 6, 10, 9, 30, 0))
        );
        assert_eq!(
            parse_rfc1123("Tue, 10 Jun 2003 04:00:00 GMT+0100"),
            Some(utc(2003, 6, 10, 3, 0, 0))
        );
    }

    #[test]
    fn test_rfc1123_optional_parts() {
        // no weekday, no seconds, single-digit day
        assert_eq!(parse_rfc1123("2 Jan 2006 15:04 UTC"), Some(utc(2006, 1, 2, 15, 4, 0)));
        // no zone at all reads as UTC
        assert_eq!(parse_rfc1123("Mon, 02 Jan 2006 15:04:05"), Some(utc(2006, 1, 2, 15, 4, 5)));
        // case-insensitive names, full month name
        assert_eq!(
            parse_rfc1123("monday, 02 JANUARY 2006 15:04:05 gmt"),
            Some(utc(2006, 1, 2, 15, 4, 5))
        );
    }

    #[test]
    fn test_rfc1123_rejects_malformed() {
        assert_eq!(parse_rfc1123(""), None);
        assert_eq!(parse_rfc1123("yesterday"), None);
        assert_eq!(parse_rfc1123("Mon, 02 Jan 06 15:04:05 GMT"), None);
        assert_eq!(parse_rfc1123("Mon, 32 Jan 2006 15:04:05 GMT"), None);
        assert_eq!(parse_rfc1123("Mon, 02 Foo 2006 15:04:05 GMT"), None);
        assert_eq!(parse_rfc1123("Mon, 02 Jan 2006 25:04:05 GMT"), None);
        assert_eq!(parse_rfc1123("Mon, 02 Jan 2006 15:04:05 XYZ"), None);
        assert_eq!(parse_rfc1123("Funday, 02 Jan 2006 15:04:05 GMT"), None);
    }

    #[test]
    fn test_iso8601_variants() {
        assert_eq!(parse_iso8601("2024-01-01T00:00:00Z"), Some(utc(2024, 1, 1, 0, 0, 0)));
        assert_eq!(
            parse_iso8601("2006-01-02T15:04:05-08:00"),
            Some(utc(2006, 1, 2, 23, 4, 5))
        );
        assert_eq!(
            parse_iso8601("2006-01-02T15:04:05.123+0100"),
            Some(utc(2006, 1, 2, 14, 4, 5) + chrono::Duration::milliseconds(123))
        );
        assert_eq!(parse_iso8601("2006-01-02T15:04:05"), Some(utc(2006, 1, 2, 15, 4, 5)));
        assert_eq!(parse_iso8601("2006-01-02"), Some(utc(2006, 1, 2, 0, 0, 0)));
        assert_eq!(parse_iso8601("  2024-01-01T00:00:00Z\n"), Some(utc(2024, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_iso8601_rejects_malformed() {
        assert_eq!(parse_iso8601("not a date"), None);
        assert_eq!(parse_iso8601("Mon, 02 Jan 2006 15:04:05 GMT"), None);
        assert_eq!(parse_iso8601("2006-13-02T15:04:05Z"), None);
    }

    #[test]
    fn test_parse_or_now_fallbacks() {
        let now = utc(2020, 5, 5, 5, 5, 5);
        assert_eq!(parse_or_now(None, DateDialect::Rfc1123, now), now);
        assert_eq!(parse_or_now(Some("garbage"), DateDialect::Iso8601, now), now);
        assert_eq!(
            parse_or_now(Some("2024-01-01T00:00:00Z"), DateDialect::Iso8601, now),
            utc(2024, 1, 1, 0, 0, 0)
        );
    }
}
