//! Meeting requests.
//!
//! [`SchedulingRequest`] is the validated record the coordinator consumes.
//! [`MeetingDraft`] is the partially populated form produced by the
//! language-model adapter; every field is explicitly [`Field::Unset`] until a
//! value is parsed, and [`MeetingDraft::finalize`] fills defaults or reports
//! what is missing.

use std::fmt;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use regex::Regex;
use slot_engine::{parse_zone, resolve_local, validate_rule, Interval};
use tracing::{debug, warn};

use crate::config::{hhmm, SchedulerConfig};
use crate::error::{Result, SchedulerError};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Loose syntactic check: something, `@`, a domain with a dot.
pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

/// Optional meeting metadata. `None` means "use the configured default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingDetails {
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Passthrough RRULE, already validated.
    pub recurrence: Option<String>,
    pub conference: Option<bool>,
}

/// One scheduling request: who, when, and in which zone.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingRequest {
    /// Attendee emails; the first one organizes and owns the booking.
    pub attendees: Vec<String>,
    /// Requested start, local wall time in `timezone`.
    pub start: NaiveDateTime,
    /// Requested end, local wall time in `timezone`.
    pub end: NaiveDateTime,
    pub timezone: Tz,
    /// Per-request working hours overriding the configured ones.
    pub work_hours: Option<(NaiveTime, NaiveTime)>,
    pub details: MeetingDetails,
}

impl SchedulingRequest {
    pub fn new(attendees: Vec<String>, start: NaiveDateTime, end: NaiveDateTime, timezone: Tz) -> Self {
        Self {
            attendees,
            start,
            end,
            timezone,
            work_hours: None,
            details: MeetingDetails::default(),
        }
    }

    pub fn with_details(mut self, details: MeetingDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_work_hours(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.work_hours = Some((start, end));
        self
    }

    pub fn organizer(&self) -> Option<&str> {
        self.attendees.first().map(String::as_str)
    }

    /// The requested range as an absolute interval.
    ///
    /// # Errors
    /// `InvalidRequestRange` when the end is not after the start, or
    /// `Engine(NonexistentLocalTime)` when a bound falls in a DST gap.
    pub fn requested_interval(&self) -> Result<Interval> {
        let invalid = || SchedulerError::InvalidRequestRange {
            start: self.start,
            end: self.end,
        };
        if self.end <= self.start {
            return Err(invalid());
        }
        let start = resolve_local(self.start, self.timezone)?;
        let end = resolve_local(self.end, self.timezone)?;
        Interval::new(start, end).map_err(|_| invalid())
    }
}

/// A value that is either known or explicitly not provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Unset,
    Set(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unset
    }
}

impl<T> Field<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Field::Set(value) => Some(value),
            Field::Unset => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Set(value) => Some(value),
            Field::Unset => None,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Unset, Field::Set)
    }
}

/// Meeting request as extracted from free text, before defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeetingDraft {
    pub summary: Field<String>,
    pub location: Field<String>,
    pub description: Field<String>,
    pub start_date: Field<NaiveDate>,
    pub start_time: Field<NaiveTime>,
    pub end_date: Field<NaiveDate>,
    pub end_time: Field<NaiveTime>,
    pub time_zone: Field<Tz>,
    pub recurrence: Field<String>,
    pub attendees: Field<Vec<String>>,
    pub conference: Field<bool>,
}

impl MeetingDraft {
    /// Parse `key: value` lines.
    ///
    /// Unknown keys, lines without a colon, and values that do not parse are
    /// logged and ignored. Blank values and placeholders such as `none` or
    /// `n/a` leave the field unset.
    pub fn parse_kv(text: &str) -> Self {
        let mut draft = MeetingDraft::default();

        for line in text.lines() {
            let line = line.trim().trim_start_matches(['-', '*']).trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                warn!("Unparsable extraction line: {}", line);
                continue;
            };
            let key = key.trim().trim_matches('*').to_lowercase().replace(' ', "_");
            let value = value.trim().trim_matches(['"', '\'']).trim();
            if is_placeholder(value) {
                continue;
            }
            draft.apply(&key, value);
        }

        draft
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "summary" | "title" => self.summary = Field::Set(value.to_string()),
            "location" => self.location = Field::Set(value.to_string()),
            "description" => self.description = Field::Set(value.to_string()),
            "start_date" | "date" => self.start_date = parsed(key, value, parse_date),
            "start_time" => self.start_time = parsed(key, value, hhmm::parse),
            "end_date" => self.end_date = parsed(key, value, parse_date),
            "end_time" => self.end_time = parsed(key, value, hhmm::parse),
            "time_zone" | "timezone" => self.time_zone = parsed(key, value, parse_timezone),
            "recurrence" => self.recurrence = Field::Set(value.to_string()),
            "attendees" => {
                let emails: Vec<String> = value
                    .split([',', ';'])
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect();
                if !emails.is_empty() {
                    self.attendees = Field::Set(emails);
                }
            }
            "conference_data" | "conference" => {
                self.conference = parsed(key, value, parse_yes_no);
            }
            other => debug!("Ignoring unknown extraction key '{}'", other),
        }
    }

    /// Fill defaults and produce a request the coordinator can run.
    ///
    /// Start date defaults to `today`, end date to the start date, end time
    /// to start plus the configured default duration, zone to the configured
    /// zone. Malformed attendee emails are dropped with a warning; the
    /// configured default host is added as organizer; duplicates are removed.
    ///
    /// # Errors
    /// `IncompleteRequest` naming `start_time` and/or `attendees` when they are
    /// missing, `Engine(InvalidRule)` for a malformed recurrence rule.
    pub fn finalize(self, config: &SchedulerConfig, today: NaiveDate) -> Result<SchedulingRequest> {
        let mut missing = Vec::new();

        let start_time = self.start_time.into_option();
        if start_time.is_none() {
            missing.push("start_time");
        }
        let extracted: Vec<String> = self
            .attendees
            .into_option()
            .unwrap_or_default()
            .into_iter()
            .filter(|email| {
                let valid = is_valid_email(email);
                if !valid {
                    warn!("Dropping invalid attendee email '{}'", email);
                }
                valid
            })
            .collect();
        if extracted.is_empty() {
            missing.push("attendees");
        }
        let Some(start_time) = start_time.filter(|_| missing.is_empty()) else {
            return Err(SchedulerError::IncompleteRequest(missing));
        };

        let timezone = match self.time_zone {
            Field::Set(zone) => zone,
            Field::Unset => config.zone()?,
        };
        let start_date = self.start_date.into_option().unwrap_or(today);
        let start = start_date.and_time(start_time);
        let end = match self.end_time {
            Field::Set(end_time) => self.end_date.into_option().unwrap_or(start_date).and_time(end_time),
            Field::Unset => start + config.default_duration(),
        };

        let attendees = dedupe_attendees(config.default_host.iter().cloned().chain(extracted));

        let recurrence = match self.recurrence {
            Field::Set(rule) => Some(validate_rule(&rule, start, timezone)?),
            Field::Unset => None,
        };

        let request = SchedulingRequest::new(attendees, start, end, timezone).with_details(MeetingDetails {
            summary: self.summary.into_option(),
            location: self.location.into_option(),
            description: self.description.into_option(),
            recurrence,
            conference: self.conference.into_option(),
        });
        debug!("Finalized meeting request: {:?}", request);
        Ok(request)
    }
}

impl fmt::Display for MeetingDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show<T: fmt::Display>(field: &Field<T>) -> String {
            field.get().map_or_else(|| "<unset>".to_string(), |v| v.to_string())
        }
        writeln!(f, "summary: {}", show(&self.summary))?;
        writeln!(f, "start_date: {}", show(&self.start_date))?;
        writeln!(f, "start_time: {}", show(&self.start_time))?;
        writeln!(f, "end_date: {}", show(&self.end_date))?;
        writeln!(f, "end_time: {}", show(&self.end_time))?;
        writeln!(f, "time_zone: {}", show(&self.time_zone))?;
        let attendees = self
            .attendees
            .get()
            .map_or_else(|| "<unset>".to_string(), |a| a.join(", "));
        write!(f, "attendees: {}", attendees)
    }
}

/// Keep the first occurrence of each email, compared case-insensitively.
fn dedupe_attendees(emails: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    emails
        .into_iter()
        .filter(|email| seen.insert(email.to_lowercase()))
        .collect()
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty()
        || value.starts_with('<')
        || ["none", "n/a", "na", "null", "unknown", "not provided", "unset"]
            .iter()
            .any(|p| value.eq_ignore_ascii_case(p))
}

fn parsed<T>(key: &str, value: &str, parse: impl Fn(&str) -> Option<T>) -> Field<T> {
    match parse(value) {
        Some(v) => Field::Set(v),
        None => {
            warn!("Ignoring unparsable {} '{}'", key, value);
            Field::Unset
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// IANA name, or one of the abbreviations people actually type.
pub fn parse_timezone(value: &str) -> Option<Tz> {
    match value.to_uppercase().as_str() {
        "IST" => Some(Tz::Asia__Kolkata),
        "UTC" | "GMT" | "Z" => Some(Tz::UTC),
        _ => parse_zone(value).ok(),
    }
}

fn parse_yes_no(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "y" | "true" | "on" => Some(true),
        "no" | "n" | "false" | "off" => Some(false),
        _ => None,
    }
}
