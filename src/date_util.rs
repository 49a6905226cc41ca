use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp as stored by the CRM into local wall-clock time.
///
/// Accepts RFC 3339 (converted to the local zone), naive date-times, and bare
/// `YYYY-MM-DD` dates (midnight). Anything else yields `None`.
pub fn parse_instant(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    parse_date(s).map(start_of_day)
}

/// Parse a bare `YYYY-MM-DD` date. Trailing text of any kind is rejected.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// The calendar day of a date or date-time string.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    parse_instant(s).map(|dt| dt.date())
}

/// Parse an optional timestamp field; missing and malformed both give `None`.
pub fn parse_opt(s: Option<&str>) -> Option<NaiveDateTime> {
    s.and_then(parse_instant)
}

pub fn start_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}

/// Last whole second of the day.
pub fn end_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(23, 59, 59).unwrap_or_else(|| start_of_day(d))
}
