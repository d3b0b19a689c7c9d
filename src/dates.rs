use crate::models::CoffeeEntry;
use chrono::{Datelike, NaiveDate};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Morning,
    Afternoon,
    Night,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayParseError {
    Malformed(String),
    OutOfRange(String),
}

impl fmt::Display for DayParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayParseError::Malformed(raw) => write!(f, "malformed day string '{raw}'"),
            DayParseError::OutOfRange(raw) => write!(f, "'{raw}' is not a valid calendar date"),
        }
    }
}

impl std::error::Error for DayParseError {}

// Strict "YYYY-MM-DD": three numeric components naming a real calendar day.
pub fn parse_day_key(raw: &str) -> Result<NaiveDate, DayParseError> {
    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() != 3 {
        return Err(DayParseError::Malformed(raw.to_string()));
    }
    let year: i32 = parts[0]
        .parse()
        .map_err(|_| DayParseError::Malformed(raw.to_string()))?;
    let month: u32 = parts[1]
        .parse()
        .map_err(|_| DayParseError::Malformed(raw.to_string()))?;
    let day: u32 = parts[2]
        .parse()
        .map_err(|_| DayParseError::Malformed(raw.to_string()))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DayParseError::OutOfRange(raw.to_string()))
}

// The calendar day an entry counts toward. Prefers the explicit `date`
// field (a coffee may be logged for a past day); without one, the
// timestamp's local day stands in. A present-but-malformed `date` is an
// error for this entry alone.
pub fn logical_day(entry: &CoffeeEntry) -> Result<NaiveDate, DayParseError> {
    match entry.date.as_deref() {
        Some("") | None => Ok(entry.timestamp.date_naive()),
        Some(raw) => parse_day_key(raw),
    }
}

// 0 = Sunday .. 6 = Saturday, from (year, month, day) components so the
// weekday never shifts with the timestamp's offset.
pub fn weekday_index(day: NaiveDate) -> usize {
    day.weekday().num_days_from_sunday() as usize
}

pub fn day_part(hour: u32) -> DayPart {
    match hour {
        6..=11 => DayPart::Morning,
        12..=17 => DayPart::Afternoon,
        _ => DayPart::Night,
    }
}
