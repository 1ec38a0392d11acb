use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::prelude::{EngineError, EngineResult};

const STAMP_DIGITS: usize = 14;

/// Wall-clock GPS timestamp in the cleaned `YYYYMMDDHHMMSS[.fff]` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GpsStamp(NaiveDateTime);

impl GpsStamp {
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }

    /// Parses the cleaned encoding. A fractional part of up to nine digits
    /// is accepted after a dot, so `20240904101500.0` reads like the plain
    /// integer form.
    pub fn parse(text: &str) -> EngineResult<Self> {
        let trimmed = text.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        if whole.len() != STAMP_DIGITS || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EngineError::Timestamp(format!(
                "expected YYYYMMDDHHMMSS, got '{}'",
                trimmed
            )));
        }

        let field = |range: std::ops::Range<usize>| -> u32 {
            whole[range].parse().unwrap_or(u32::MAX)
        };
        let year = field(0..4) as i32;
        let datetime = NaiveDate::from_ymd_opt(year, field(4..6), field(6..8))
            .and_then(|date| date.and_hms_opt(field(8..10), field(10..12), field(12..14)))
            .ok_or_else(|| {
                EngineError::Timestamp(format!("'{}' is not a calendar instant", trimmed))
            })?;

        let nanos = parse_fraction(fraction).ok_or_else(|| {
            EngineError::Timestamp(format!("bad fractional seconds in '{}'", trimmed))
        })?;

        Ok(Self(datetime + Duration::nanoseconds(nanos)))
    }

    /// Integer form, as written by tools that treat the column as a number.
    pub fn from_digits(value: i64) -> EngineResult<Self> {
        Self::parse(&format!("{:014}", value))
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn truncate_to_second(&self) -> Self {
        Self(self.0 - Duration::nanoseconds(i64::from(self.0.nanosecond())))
    }

    pub fn offset_seconds(&self, seconds: f64) -> Self {
        let nanos = (seconds * 1e9).round() as i64;
        Self(self.0 + Duration::nanoseconds(nanos))
    }

    pub fn seconds_since(&self, earlier: &GpsStamp) -> f64 {
        let delta = self.0 - earlier.0;
        match delta.num_nanoseconds() {
            Some(nanos) => nanos as f64 / 1e9,
            None => delta.num_milliseconds() as f64 / 1e3,
        }
    }

    /// `HH:MM:SS` label used by the playback readout.
    pub fn clock_label(&self) -> String {
        self.0.format("%H:%M:%S").to_string()
    }
}

fn parse_fraction(digits: &str) -> Option<i64> {
    if digits.is_empty() {
        return Some(0);
    }
    if digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(value * 10_i64.pow(9 - digits.len() as u32))
}

impl fmt::Display for GpsStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dt = &self.0;
        write!(
            f,
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        )?;
        let nanos = dt.nanosecond();
        if nanos == 0 {
            Ok(())
        } else if nanos % 1_000_000 == 0 {
            write!(f, ".{:03}", nanos / 1_000_000)
        } else {
            write!(f, ".{:09}", nanos)
        }
    }
}

impl FromStr for GpsStamp {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GpsStamp {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GpsStamp> for String {
    fn from(stamp: GpsStamp) -> Self {
        stamp.to_string()
    }
}
