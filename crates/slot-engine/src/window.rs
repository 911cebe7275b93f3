//! Working-hours windows.
//!
//! A [`WorkWindow`] turns a calendar date plus local opening and closing times
//! into one concrete [`Interval`] in the scheduling zone.

use chrono::{Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{EngineError, Result};
use crate::interval::{Instant, Interval};

/// Default scheduling zone.
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

/// The daily interval during which availability is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkWindow {
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    zone: Tz,
    interval: Interval,
}

impl WorkWindow {
    /// Build the window for `date` between `start_time` and `end_time` in `zone`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidWorkHours` if `start_time >= end_time`, and
    /// `EngineError::NonexistentLocalTime` if either bound falls in a DST gap.
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime, zone: Tz) -> Result<Self> {
        if start_time >= end_time {
            return Err(EngineError::InvalidWorkHours {
                start: start_time,
                end: end_time,
            });
        }
        let start = resolve_local(date.and_time(start_time), zone)?;
        let end = resolve_local(date.and_time(end_time), zone)?;
        let interval = Interval::new(start, end)?;

        Ok(Self {
            date,
            start_time,
            end_time,
            zone,
            interval,
        })
    }

    /// Window with the default 11:00–20:00 hours.
    pub fn with_default_hours(date: NaiveDate, zone: Tz) -> Result<Self> {
        Self::new(date, default_work_start(), default_work_end(), zone)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }
}

/// Default start of working hours (11:00 local).
pub fn default_work_start() -> NaiveTime {
    NaiveTime::MIN + Duration::hours(11)
}

/// Default end of working hours (20:00 local).
pub fn default_work_end() -> NaiveTime {
    NaiveTime::MIN + Duration::hours(20)
}

/// Parse an IANA timezone name.
///
/// # Errors
/// Returns `EngineError::InvalidTimezone` for unknown names.
pub fn parse_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse()
        .map_err(|_| EngineError::InvalidTimezone(name.to_string()))
}

/// Map a local wall time to an instant. Ambiguous times (DST fall-back) take
/// the earlier instant; times inside a DST gap are rejected.
pub fn resolve_local(local: NaiveDateTime, zone: Tz) -> Result<Instant> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(EngineError::NonexistentLocalTime(format!(
            "{} in {}",
            local,
            zone.name()
        ))),
    }
}
