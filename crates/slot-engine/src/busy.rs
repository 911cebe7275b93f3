//! Convert raw calendar events into merged busy intervals.
//!
//! Events are parsed, clipped to the work window, sorted, and merged. An event
//! that cannot be parsed is skipped and reported; it never aborts extraction.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::interval::{merge_intervals, Instant, Interval};
use crate::window::{parse_zone, resolve_local, WorkWindow};

/// A calendar event as returned by the calendar collaborator.
///
/// Field names follow the Google Calendar `events.list` item shape so a
/// response body can be deserialized directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<RawEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<RawEventTime>,
}

/// Either a timestamp (`dateTime`) or an all-day date (`date`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawEvent {
    /// Timed event from two RFC 3339 strings.
    pub fn timed(summary: &str, start: &str, end: &str) -> Self {
        Self {
            summary: Some(summary.to_string()),
            start: Some(RawEventTime::date_time(start)),
            end: Some(RawEventTime::date_time(end)),
        }
    }

    /// All-day event; `end` is exclusive, as the calendar service encodes it.
    pub fn all_day(summary: &str, start: &str, end: &str) -> Self {
        Self {
            summary: Some(summary.to_string()),
            start: Some(RawEventTime::date(start)),
            end: Some(RawEventTime::date(end)),
        }
    }

    pub fn label(&self) -> &str {
        self.summary.as_deref().unwrap_or("(untitled)")
    }

    /// Parse the event's bounds. `fallback` is used for `dateTime` values that
    /// carry no offset and no `timeZone`.
    ///
    /// # Errors
    /// Returns `EngineError::MalformedEvent` when a bound is missing, does not
    /// parse, mixes an all-day date with a timestamp, or ends before it starts.
    pub fn bounds(&self, fallback: Tz) -> Result<EventBounds> {
        let start = self
            .start
            .as_ref()
            .ok_or_else(|| malformed("missing start"))?
            .parse(fallback)?;
        let end = self
            .end
            .as_ref()
            .ok_or_else(|| malformed("missing end"))?
            .parse(fallback)?;

        match (start, end) {
            (ParsedTime::Instant(s), ParsedTime::Instant(e)) => {
                if e < s {
                    return Err(malformed(format!("ends before it starts ({} < {})", e, s)));
                }
                Ok(EventBounds::Timed { start: s, end: e })
            }
            (ParsedTime::Date(s), ParsedTime::Date(e)) => {
                if e < s {
                    return Err(malformed(format!("ends before it starts ({} < {})", e, s)));
                }
                Ok(EventBounds::AllDay {
                    first: s,
                    end_exclusive: e,
                })
            }
            _ => Err(malformed("start and end mix an all-day date with a timestamp")),
        }
    }
}

impl RawEventTime {
    pub fn date_time(value: &str) -> Self {
        Self {
            date_time: Some(value.to_string()),
            ..Self::default()
        }
    }

    pub fn date(value: &str) -> Self {
        Self {
            date: Some(value.to_string()),
            ..Self::default()
        }
    }

    fn parse(&self, fallback: Tz) -> Result<ParsedTime> {
        if let Some(raw) = &self.date_time {
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Ok(ParsedTime::Instant(dt.with_timezone(&Utc)));
            }
            // No offset: interpret as wall time in the event's own zone.
            let zone = match &self.time_zone {
                Some(name) => parse_zone(name).map_err(|e| malformed(e.to_string()))?,
                None => fallback,
            };
            let local = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
                .map_err(|_| malformed(format!("unparseable dateTime '{}'", raw)))?;
            let instant = resolve_local(local, zone).map_err(|e| malformed(e.to_string()))?;
            return Ok(ParsedTime::Instant(instant));
        }
        if let Some(raw) = &self.date {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| malformed(format!("unparseable date '{}'", raw)))?;
            return Ok(ParsedTime::Date(date));
        }
        Err(malformed("neither dateTime nor date present"))
    }
}

enum ParsedTime {
    Instant(Instant),
    Date(NaiveDate),
}

/// Parsed event bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBounds {
    Timed { start: Instant, end: Instant },
    /// Dates in `[first, end_exclusive)`. A same-day pair covers `first` only.
    AllDay {
        first: NaiveDate,
        end_exclusive: NaiveDate,
    },
}

impl EventBounds {
    /// The busy part of this event inside `window`, if any.
    pub fn clip_to(&self, window: &WorkWindow) -> Option<Interval> {
        let bounds = window.interval();
        match *self {
            EventBounds::Timed { start, end } => {
                let start = start.max(bounds.start());
                let end = end.min(bounds.end());
                (start < end).then(|| Interval::from_ordered(start, end))
            }
            EventBounds::AllDay {
                first,
                end_exclusive,
            } => {
                let day = window.date();
                let covers = if end_exclusive > first {
                    first <= day && day < end_exclusive
                } else {
                    first == day
                };
                covers.then_some(bounds)
            }
        }
    }

    /// Start and end as instants. All-day events run from local midnight of
    /// `first` to local midnight of the exclusive end date in `zone`.
    ///
    /// # Errors
    /// Returns `EngineError::NonexistentLocalTime` if midnight falls in a DST gap.
    pub fn instants(&self, zone: Tz) -> Result<(Instant, Instant)> {
        match *self {
            EventBounds::Timed { start, end } => Ok((start, end)),
            EventBounds::AllDay {
                first,
                end_exclusive,
            } => {
                let last = end_exclusive.max(first.succ_opt().unwrap_or(first));
                let start = resolve_local(first.and_time(NaiveTime::MIN), zone)?;
                let end = resolve_local(last.and_time(NaiveTime::MIN), zone)?;
                Ok((start, end))
            }
        }
    }
}

/// An event that was dropped because it could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEvent {
    pub summary: String,
    pub error: EngineError,
}

/// Result of busy extraction for one calendar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusyExtraction {
    /// Ascending, non-overlapping, clipped to the window.
    pub busy: Vec<Interval>,
    pub skipped: Vec<SkippedEvent>,
}

/// Convert raw events into the merged busy intervals inside `window`.
///
/// Events entirely outside the window are dropped, partially overlapping ones
/// are truncated, all-day events occupy the whole window of their dates.
/// Overlapping or adjacent busy intervals are merged.
pub fn extract_busy(events: &[RawEvent], window: &WorkWindow) -> BusyExtraction {
    let mut clipped = Vec::with_capacity(events.len());
    let mut skipped = Vec::new();

    for event in events {
        match event.bounds(window.zone()) {
            Ok(bounds) => match bounds.clip_to(window) {
                Some(interval) => clipped.push(interval),
                None => debug!(event = event.label(), "event outside work window, dropped"),
            },
            Err(error) => {
                warn!(event = event.label(), %error, "skipping malformed event");
                skipped.push(SkippedEvent {
                    summary: event.label().to_string(),
                    error,
                });
            }
        }
    }

    BusyExtraction {
        busy: merge_intervals(clipped),
        skipped,
    }
}

fn malformed(reason: impl Into<String>) -> EngineError {
    EngineError::MalformedEvent(reason.into())
}
