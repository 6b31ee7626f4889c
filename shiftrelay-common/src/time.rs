//! Schedule timestamp normalization
//!
//! Converts the `D-MMM-YY` / `H:MM AM/PM` strings a schedule image yields
//! into seconds since the Unix epoch, interpreted in the local time zone.
//! Malformed input yields `None`; callers decide what to substitute through
//! [`or_default`].

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Default shift length used when the end time cannot be parsed
pub const DEFAULT_SHIFT_SECONDS: i64 = 8 * 60 * 60;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// A value paired with whether it was substituted for missing/bad input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaulted<T> {
    pub value: T,
    pub defaulted: bool,
}

impl<T> Defaulted<T> {
    pub fn parsed(value: T) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            defaulted: true,
        }
    }
}

/// Validate-or-default: keep a parsed value, otherwise take the fallback
pub fn or_default<T>(parsed: Option<T>, fallback: impl FnOnce() -> T) -> Defaulted<T> {
    match parsed {
        Some(value) => Defaulted::parsed(value),
        None => Defaulted::fallback(fallback()),
    }
}

/// Convert a schedule date and time to local epoch seconds
///
/// `to_epoch_seconds("1-Dec-24", "9:00 PM")` is 2024-12-01 21:00 local.
/// Returns `None` for any malformed component or a local time that does
/// not exist (DST gap). Ambiguous local times take the earlier instant.
pub fn to_epoch_seconds(date: &str, time: &str) -> Option<i64> {
    let naive = NaiveDateTime::new(parse_date(date)?, parse_time(time)?);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Parse `D-MMM-YY` (two-digit year is 2000 + YY; four digits taken as-is)
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let mut parts = date.trim().split('-');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let day: u32 = parse_digits(day)?;
    let month = month_number(month)?;
    let year: i32 = match year.trim().len() {
        2 => 2000 + parse_digits::<i32>(year)?,
        4 => parse_digits(year)?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse `H:MM AM/PM` into a 24-hour wall-clock time
pub fn parse_time(time: &str) -> Option<NaiveTime> {
    let upper = time.trim().to_ascii_uppercase();
    let (clock, pm) = if let Some(rest) = upper.strip_suffix("PM") {
        (rest, true)
    } else if let Some(rest) = upper.strip_suffix("AM") {
        (rest, false)
    } else {
        return None;
    };

    let (hour, minute) = clock.trim_end().split_once(':')?;
    let hour: u32 = parse_digits(hour)?;
    let minute: u32 = parse_digits(minute)?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return None;
    }

    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn month_number(abbrev: &str) -> Option<u32> {
    let lower = abbrev.trim().to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .map(|idx| idx as u32 + 1)
}

fn parse_digits<T: std::str::FromStr>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
