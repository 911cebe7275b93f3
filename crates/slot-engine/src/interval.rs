//! Half-open time ranges.
//!
//! An [`Interval`] is `[start, end)` with `start < end`. Instants are stored in
//! UTC so that every comparison happens on one timeline; conversion into the
//! scheduling zone happens only when a caller asks for it.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A point in time. All arithmetic happens on this single timeline.
pub type Instant = DateTime<Utc>;

/// A non-empty half-open time range `[start, end)`.
///
/// Ordering is by start, then by end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "UncheckedInterval")]
pub struct Interval {
    start: Instant,
    end: Instant,
}

#[derive(Deserialize)]
struct UncheckedInterval {
    start: Instant,
    end: Instant,
}

impl TryFrom<UncheckedInterval> for Interval {
    type Error = EngineError;

    fn try_from(raw: UncheckedInterval) -> Result<Self> {
        Interval::new(raw.start, raw.end)
    }
}

impl Interval {
    /// Build an interval, rejecting zero-length and inverted ranges.
    ///
    /// # Errors
    /// Returns `EngineError::EmptyInterval` when `start >= end`.
    pub fn new(start: Instant, end: Instant) -> Result<Self> {
        if start >= end {
            return Err(EngineError::EmptyInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Internal constructor for call sites that have already compared the bounds.
    pub(crate) fn from_ordered(start: Instant, end: Instant) -> Self {
        debug_assert!(start < end, "interval bounds out of order");
        Self { start, end }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the two ranges share at least one instant.
    /// Adjacent intervals (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The common part of two intervals, if any.
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then(|| Interval::from_ordered(start, end))
    }

    /// Start and end expressed in `zone`, for display at the egress boundary.
    pub fn in_zone(&self, zone: Tz) -> (DateTime<Tz>, DateTime<Tz>) {
        (self.start.with_timezone(&zone), self.end.with_timezone(&zone))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Sort intervals and merge every pair where the next start is `<=` the
/// current end. The result is ascending and non-overlapping.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                // Overlapping or adjacent: extend the current interval.
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}
