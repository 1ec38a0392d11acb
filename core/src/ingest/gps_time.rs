use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::prelude::{EngineError, EngineResult};
use crate::timeline::GpsStamp;

const SECONDS_PER_WEEK: f64 = 604_800.0;
const STAMP_YEARS: std::ops::RangeInclusive<i32> = 1000..=9999;

/// Receiver clock to wall clock conversion.
///
/// Raw receiver logs carry `week:tow` (GPS week number and seconds into the
/// week). Those are shifted from GPS time to UTC by `leap_seconds`, then to
/// local wall time in `time_zone`, daylight saving included. Setting
/// `utc_offset_hours` replaces the zone with a fixed offset. Cells already in
/// the cleaned `YYYYMMDDHHMMSS` form pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDecoder {
    /// IANA zone name.
    pub time_zone: String,
    pub utc_offset_hours: Option<f64>,
    pub leap_seconds: i64,
}

impl Default for TimeDecoder {
    fn default() -> Self {
        Self {
            time_zone: "America/New_York".to_string(),
            utc_offset_hours: None,
            leap_seconds: 18,
        }
    }
}

/// Resolved target of the UTC to wall clock shift.
enum LocalClock {
    Fixed(FixedOffset),
    Zone(Tz),
}

impl TimeDecoder {
    fn local_clock(&self) -> EngineResult<LocalClock> {
        match self.utc_offset_hours {
            Some(hours) => {
                let seconds = (hours * 3600.0).round();
                FixedOffset::east_opt(seconds as i32)
                    .filter(|_| seconds.is_finite())
                    .map(LocalClock::Fixed)
                    .ok_or_else(|| {
                        EngineError::Timestamp(format!("UTC offset {}h out of range", hours))
                    })
            }
            None => self.time_zone.parse::<Tz>().map(LocalClock::Zone).map_err(|err| {
                EngineError::Timestamp(format!("unknown time zone '{}': {}", self.time_zone, err))
            }),
        }
    }

    /// Checks the zone or offset once, before any rows are decoded.
    pub fn validate(&self) -> EngineResult<()> {
        self.local_clock().map(|_| ())
    }

    pub fn decode(&self, cell: &str) -> EngineResult<GpsStamp> {
        let cell = cell.trim();
        match cell.split_once(':') {
            Some((week, tow)) => {
                let week: u32 = week.trim().parse().map_err(|_| {
                    EngineError::Timestamp(format!("bad GPS week in '{}'", cell))
                })?;
                let tow: f64 = tow.trim().parse().map_err(|_| {
                    EngineError::Timestamp(format!("bad time of week in '{}'", cell))
                })?;
                self.decode_week_tow(week, tow)
            }
            None => GpsStamp::parse(cell),
        }
    }

    pub fn decode_week_tow(&self, week: u32, tow: f64) -> EngineResult<GpsStamp> {
        if !tow.is_finite() || !(0.0..SECONDS_PER_WEEK).contains(&tow) {
            return Err(EngineError::Timestamp(format!(
                "time of week {} outside [0, {})",
                tow, SECONDS_PER_WEEK
            )));
        }
        let out_of_range = || {
            EngineError::Timestamp(format!("GPS week {} is outside the calendar range", week))
        };

        let utc = Duration::try_weeks(i64::from(week))
            .and_then(|weeks| gps_epoch().checked_add_signed(weeks))
            .and_then(|t| t.checked_add_signed(Duration::milliseconds((tow * 1e3).round() as i64)))
            .and_then(|t| {
                Duration::try_seconds(self.leap_seconds).and_then(|leap| t.checked_sub_signed(leap))
            })
            .ok_or_else(out_of_range)?;

        let local = match self.local_clock()? {
            LocalClock::Fixed(offset) => utc
                .checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
                .ok_or_else(out_of_range)?,
            LocalClock::Zone(zone) => zone.from_utc_datetime(&utc).naive_local(),
        };
        if !STAMP_YEARS.contains(&local.year()) {
            return Err(out_of_range());
        }
        Ok(GpsStamp::new(local))
    }
}

fn gps_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 6)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}
