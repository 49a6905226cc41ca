use std::sync::LazyLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use crate::date_util::{end_of_day, parse_day, start_of_day};
use crate::error::{Error, Result};

static RE_CUSTOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S*)\s*\.\.\s*(\S*)$").unwrap());
static RE_ROLLING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[dD]$").unwrap());

/// The period picker of the analytics dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PeriodSelector {
    Day,
    #[default]
    Week,
    Month,
    /// Explicit `YYYY-MM-DD` bounds; either may be missing while the user is
    /// still picking.
    Custom {
        from: Option<String>,
        to: Option<String>,
    },
}

impl PeriodSelector {
    /// Parse a period string.
    ///
    /// Supported formats:
    /// - `day` / `today` / `1d`
    /// - `week` / `7d`
    /// - `month` / `30d`
    /// - `2025-01-01..2025-01-31`: custom range, either side may be empty
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "day" | "today" => return Ok(PeriodSelector::Day),
            "week" => return Ok(PeriodSelector::Week),
            "month" => return Ok(PeriodSelector::Month),
            _ => {}
        }

        if let Some(caps) = RE_ROLLING.captures(s) {
            return match &caps[1] {
                "1" => Ok(PeriodSelector::Day),
                "7" => Ok(PeriodSelector::Week),
                "30" => Ok(PeriodSelector::Month),
                n => Err(Error::PeriodParse(format!(
                    "only 1d, 7d and 30d windows are supported, got {n}d"
                ))),
            };
        }

        if let Some(caps) = RE_CUSTOM.captures(s) {
            let bound = |i: usize| {
                let v = caps[i].trim();
                (!v.is_empty()).then(|| v.to_string())
            };
            return Ok(PeriodSelector::Custom {
                from: bound(1),
                to: bound(2),
            });
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    pub fn custom(from: &str, to: &str) -> Self {
        PeriodSelector::Custom {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
        }
    }

    /// Canonical key string, the inverse of [`PeriodSelector::parse`].
    pub fn to_key(&self) -> String {
        match self {
            PeriodSelector::Day => "day".to_string(),
            PeriodSelector::Week => "week".to_string(),
            PeriodSelector::Month => "month".to_string(),
            PeriodSelector::Custom { from, to } => format!(
                "{}..{}",
                from.as_deref().unwrap_or(""),
                to.as_deref().unwrap_or("")
            ),
        }
    }

    /// Resolve to concrete instants relative to `now`.
    ///
    /// Rolling windows end at `now` and start at midnight of the first day.
    /// A custom range covers whole days; if a bound is missing, unparseable,
    /// or the range is inverted, the result is [`DateRange::empty`].
    pub fn resolve(&self, now: NaiveDateTime) -> DateRange {
        let today = now.date();
        match self {
            PeriodSelector::Day => DateRange::new(start_of_day(today), now),
            PeriodSelector::Week => {
                DateRange::new(start_of_day(today - Duration::days(6)), now)
            }
            PeriodSelector::Month => {
                DateRange::new(start_of_day(today - Duration::days(29)), now)
            }
            PeriodSelector::Custom { from, to } => {
                let from = from.as_deref().and_then(parse_day);
                let to = to.as_deref().and_then(parse_day);
                match (from, to) {
                    (Some(f), Some(t)) => DateRange::new(start_of_day(f), end_of_day(t)),
                    _ => {
                        log::debug!("incomplete custom period {}, matching nothing", self);
                        DateRange::empty()
                    }
                }
            }
        }
    }
}

impl std::fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

/// An inclusive instant range. The empty range contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    bounds: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl DateRange {
    /// `from > to` collapses to the empty range.
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        if from > to {
            return Self::empty();
        }
        Self {
            bounds: Some((from, to)),
        }
    }

    pub fn empty() -> Self {
        Self { bounds: None }
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn from(&self) -> Option<NaiveDateTime> {
        self.bounds.map(|(f, _)| f)
    }

    pub fn to(&self) -> Option<NaiveDateTime> {
        self.bounds.map(|(_, t)| t)
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        match self.bounds {
            Some((from, to)) => from <= t && t <= to,
            None => false,
        }
    }

    /// Missing instants are never inside a period.
    pub fn contains_opt(&self, t: Option<NaiveDateTime>) -> bool {
        t.is_some_and(|t| self.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(15, 45, 10)
            .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(PeriodSelector::parse("day").unwrap(), PeriodSelector::Day);
        assert_eq!(PeriodSelector::parse("Today").unwrap(), PeriodSelector::Day);
        assert_eq!(PeriodSelector::parse(" week ").unwrap(), PeriodSelector::Week);
        assert_eq!(PeriodSelector::parse("MONTH").unwrap(), PeriodSelector::Month);
    }

    #[test]
    fn test_parse_rolling() {
        assert_eq!(PeriodSelector::parse("1d").unwrap(), PeriodSelector::Day);
        assert_eq!(PeriodSelector::parse("7d").unwrap(), PeriodSelector::Week);
        assert_eq!(PeriodSelector::parse("30D").unwrap(), PeriodSelector::Month);
        assert!(PeriodSelector::parse("14d").is_err());
    }

    #[test]
    fn test_parse_custom() {
        assert_eq!(
            PeriodSelector::parse("2025-01-01..2025-01-31").unwrap(),
            PeriodSelector::custom("2025-01-01", "2025-01-31")
        );
        assert_eq!(
            PeriodSelector::parse("2025-01-01..").unwrap(),
            PeriodSelector::Custom {
                from: Some("2025-01-01".into()),
                to: None
            }
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PeriodSelector::parse("garbage").is_err());
        assert!(PeriodSelector::parse("2025-Q1").is_err());
    }

    #[test]
    fn test_to_key_round_trip() {
        for key in ["day", "week", "month", "2025-01-01..2025-02-01", "..2025-02-01"] {
            assert_eq!(PeriodSelector::parse(key).unwrap().to_key(), key);
        }
    }

    #[test]
    fn test_resolve_day() {
        let r = PeriodSelector::Day.resolve(now());
        assert_eq!(r.from(), Some(at(2025, 3, 14, 0, 0, 0)));
        assert_eq!(r.to(), Some(now()));
    }

    #[test]
    fn test_resolve_week_is_seven_days_inclusive() {
        let r = PeriodSelector::Week.resolve(now());
        assert_eq!(r.from(), Some(at(2025, 3, 8, 0, 0, 0)));
        assert_eq!(r.to(), Some(now()));
        assert!(r.contains(at(2025, 3, 8, 0, 0, 0)));
        assert!(!r.contains(at(2025, 3, 7, 23, 59, 59)));
        assert!(!r.contains(at(2025, 3, 14, 15, 45, 11)));
    }

    #[test]
    fn test_resolve_month_is_thirty_days_inclusive() {
        let r = PeriodSelector::Month.resolve(now());
        assert_eq!(r.from(), Some(at(2025, 2, 13, 0, 0, 0)));
    }

    #[test]
    fn test_resolve_custom_covers_whole_days() {
        let r = PeriodSelector::custom("2025-01-01", "2025-01-31").resolve(now());
        assert_eq!(r.from(), Some(at(2025, 1, 1, 0, 0, 0)));
        assert_eq!(r.to(), Some(at(2025, 1, 31, 23, 59, 59)));
    }

    #[test]
    fn test_resolve_custom_incomplete_fails_closed() {
        let missing_to = PeriodSelector::Custom {
            from: Some("2025-01-01".into()),
            to: None,
        };
        assert!(missing_to.resolve(now()).is_empty());

        let garbage = PeriodSelector::custom("2025-01-01", "soon");
        assert!(garbage.resolve(now()).is_empty());
        assert!(!garbage.resolve(now()).contains(now()));
    }

    #[test]
    fn test_resolve_custom_trailing_junk_fails_closed() {
        let junk = PeriodSelector::custom("2025-03-01xyz", "2025-03-31garbage");
        assert!(junk.resolve(now()).is_empty());

        let timed = PeriodSelector::custom("2025-03-01T10:00", "2025-03-02");
        let r = timed.resolve(now());
        assert_eq!(r.from(), Some(at(2025, 3, 1, 0, 0, 0)));
        assert_eq!(r.to(), Some(at(2025, 3, 2, 23, 59, 59)));
    }

    #[test]
    fn test_resolve_custom_inverted_is_empty() {
        let r = PeriodSelector::custom("2025-02-01", "2025-01-01").resolve(now());
        assert!(r.is_empty());
        assert!(!r.contains(at(2025, 1, 15, 12, 0, 0)));
    }

    #[test]
    fn test_single_day_custom_range() {
        let r = PeriodSelector::custom("2025-01-01", "2025-01-01").resolve(now());
        assert!(r.contains(at(2025, 1, 1, 23, 59, 59)));
        assert!(!r.contains(at(2025, 1, 2, 0, 0, 0)));
    }

    #[test]
    fn test_contains_opt() {
        let r = PeriodSelector::Day.resolve(now());
        assert!(!r.contains_opt(None));
        assert!(r.contains_opt(Some(at(2025, 3, 14, 1, 0, 0))));
    }
}
