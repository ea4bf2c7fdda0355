use crate::error::ParseError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

pub const MINUTES_PER_HOUR: i64 = 60;
pub const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// Absolute instant in whole minutes since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, Ord, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd)]
pub struct Time(pub i64);

impl Time {
    pub const MAX: Time = Time(i64::MAX);

    pub(crate) fn is_overlapping(time: &(Time, Time), window: &(Time, Time)) -> bool {
        time.0 < window.1 && time.1 > window.0
    }

    pub fn from_utc(instant: DateTime<Utc>) -> Time {
        Time(instant.timestamp().div_euclid(60))
    }

    pub fn to_utc(self) -> DateTime<Utc> {
        self.0
            .checked_mul(60)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn hours(hours: i64) -> i64 {
        hours * MINUTES_PER_HOUR
    }

    /// Fractional hours from `self` to `later`; negative if `later` is earlier.
    pub fn hours_until(self, later: Time) -> f64 {
        (later.0 - self.0) as f64 / MINUTES_PER_HOUR as f64
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Time::MAX {
            return write!(f, "END");
        }
        write!(f, "{}", self.to_utc().format("%Y-%m-%d %H:%MZ"))
    }
}

impl FromStr for Time {
    type Err = ParseError;

    /// Accepts `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD HH:MM`, read as UTC.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
            .map(|ndt| Time::from_utc(ndt.and_utc()))
            .map_err(|_| ParseError::Instant(s.to_string()))
    }
}

impl Add<i64> for Time {
    type Output = Self;

    fn add(self, rhs: i64) -> Self::Output {
        Time(self.0.saturating_add(rhs))
    }
}

impl Sub<i64> for Time {
    type Output = Self;

    fn sub(self, rhs: i64) -> Self::Output {
        Time(self.0.saturating_sub(rhs))
    }
}

/// Minutes between two instants.
impl Sub<Time> for Time {
    type Output = i64;

    fn sub(self, rhs: Time) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

impl AddAssign<i64> for Time {
    fn add_assign(&mut self, rhs: i64) {
        self.0 = self.0.saturating_add(rhs);
    }
}

/// Calendar month that day/hour/minute shipment stamps and cancellation days refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Period {
        Period { year, month }
    }

    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn instant(&self, day: u32, hour: u32, minute: u32) -> Option<Time> {
        self.date(day)?
            .and_hms_opt(hour, minute, 0)
            .map(|ndt| Time::from_utc(ndt.and_utc()))
    }

    pub fn start(&self) -> Option<Time> {
        self.instant(1, 0, 0)
    }

    /// First instant of the following month.
    pub fn end(&self) -> Option<Time> {
        let first = self.date(1)?;
        let next = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }?;
        next.and_hms_opt(0, 0, 0).map(|ndt| Time::from_utc(ndt.and_utc()))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parses `H:MM` / `HH:MM` into minutes after midnight.
pub fn parse_hhmm(s: &str) -> Result<u32, ParseError> {
    let err = || ParseError::TimeOfDay(s.to_string());
    let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
    let h: u32 = h.trim().parse().map_err(|_| err())?;
    let m: u32 = m.trim().parse().map_err(|_| err())?;
    if h > 23 || m > 59 {
        return Err(err());
    }
    Ok(h * 60 + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_instants() {
        let period = Period::new(2025, 12);
        let start = period.start().unwrap();
        let end = period.end().unwrap();
        assert_eq!(31 * MINUTES_PER_DAY, end - start);
        assert_eq!(
            start + MINUTES_PER_DAY + 90,
            period.instant(2, 1, 30).unwrap()
        );
        assert_eq!(None, period.instant(32, 0, 0));
    }

    #[test]
    fn test_parse_round_trip_display() {
        let t: Time = "2025-01-03T10:05".parse().unwrap();
        assert_eq!("2025-01-03 10:05Z", t.to_string());
        assert_eq!(t, "2025-01-03 10:05".parse().unwrap());
        assert!("yesterday".parse::<Time>().is_err());
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(Ok(14 * 60 + 22), parse_hhmm("14:22"));
        assert_eq!(Ok(5), parse_hhmm("0:05"));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("1422").is_err());
    }

    #[test]
    fn test_overlap() {
        assert!(Time::is_overlapping(&(Time(0), Time(10)), &(Time(5), Time(20))));
        assert!(!Time::is_overlapping(&(Time(0), Time(10)), &(Time(10), Time(20))));
    }
}
