//! Calendar-day arithmetic and provider timestamp parsing
//!
//! All timestamps in this crate are local wall-clock times. The clock
//! collaborator is responsible for applying the timezone and DST rules, so
//! once a value is a [`Timestamp`] it is never reinterpreted again.

use core::fmt;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};
use thiserror_no_std::Error;

/// Local wall-clock time
pub type Timestamp = NaiveDateTime;

/// Length of the fixed `YYYY-MM-DDTHH:MM:SS` part of a provider timestamp
const API_TIMESTAMP_LEN: usize = 19;

/// Source of the current local time
pub trait Clock {
    /// Current local time, already timezone adjusted
    fn now(&self) -> Timestamp;
}

/// Errors produced while handling times
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimeError {
    /// Text did not match `YYYY-MM-DDTHH:MM:SS` or named an impossible time
    #[error("Malformed timestamp (expected YYYY-MM-DDTHH:MM:SS)")]
    MalformedTimestamp,
}

/// A local calendar date without time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// Build a day from its parts, `None` if the date does not exist
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub const fn date(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// The day `n` calendar days away (negative goes back)
    ///
    /// Works on the civil date, so a 23 or 25 hour DST day still advances by
    /// exactly one date. Saturates at the ends of the representable range.
    pub fn add_days(self, n: i64) -> Self {
        let days = Days::new(n.unsigned_abs());
        let shifted = if n >= 0 {
            self.0.checked_add_days(days).unwrap_or(NaiveDate::MAX)
        } else {
            self.0.checked_sub_days(days).unwrap_or(NaiveDate::MIN)
        };
        Self(shifted)
    }

    /// Local time at the start of `hour` on this day
    pub fn at_hour(self, hour: u32) -> Option<Timestamp> {
        self.0.and_hms_opt(hour, 0, 0)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}

/// Strip the time of day from a local timestamp
pub fn normalize_to_calendar_day(t: &Timestamp) -> CalendarDay {
    CalendarDay(t.date())
}

/// Calendar arithmetic, see [`CalendarDay::add_days`]
pub fn add_days(day: CalendarDay, n: i64) -> CalendarDay {
    day.add_days(n)
}

/// Truncate a timestamp to the start of its hour
pub fn start_of_hour(t: &Timestamp) -> Timestamp {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*t)
}

/// Parse a provider timestamp such as `2024-01-23T00:00:00`
///
/// Exactly six integer fields in fixed widths are required. A trailing UTC
/// offset designator (`Z`, `+01:00`) is accepted and ignored since the
/// wall-clock part is already local.
pub fn parse_api_timestamp(s: &str) -> Result<Timestamp, TimeError> {
    split_api_timestamp(s).map(|(timestamp, _)| timestamp)
}

/// Like [`parse_api_timestamp`] but also returns the offset designator
///
/// The designator is the (possibly empty) text after the seconds field.
pub fn split_api_timestamp(s: &str) -> Result<(Timestamp, &str), TimeError> {
    let bytes = s.as_bytes();
    if bytes.len() < API_TIMESTAMP_LEN {
        return Err(TimeError::MalformedTimestamp);
    }

    let separators = [(4, b'-'), (7, b'-'), (10, b'T'), (13, b':'), (16, b':')];
    if separators.iter().any(|&(idx, sep)| bytes[idx] != sep) {
        return Err(TimeError::MalformedTimestamp);
    }

    let year = parse_digits(&bytes[0..4])?;
    let month = parse_digits(&bytes[5..7])?;
    let day = parse_digits(&bytes[8..10])?;
    let hour = parse_digits(&bytes[11..13])?;
    let minute = parse_digits(&bytes[14..16])?;
    let second = parse_digits(&bytes[17..19])?;

    let timestamp = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or(TimeError::MalformedTimestamp)?;

    // The first 19 bytes were all ASCII, so this is a char boundary.
    let offset = &s[API_TIMESTAMP_LEN..];
    if !is_offset_designator(offset.as_bytes()) {
        return Err(TimeError::MalformedTimestamp);
    }

    Ok((timestamp, offset))
}

fn parse_digits(field: &[u8]) -> Result<u32, TimeError> {
    field.iter().try_fold(0u32, |acc, &b| {
        if b.is_ascii_digit() {
            Ok(acc * 10 + u32::from(b - b'0'))
        } else {
            Err(TimeError::MalformedTimestamp)
        }
    })
}

fn is_offset_designator(suffix: &[u8]) -> bool {
    match suffix {
        [] | [b'Z'] => true,
        [sign, h1, h2, b':', m1, m2] => {
            matches!(sign, b'+' | b'-')
                && [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}
