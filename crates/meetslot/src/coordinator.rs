//! Scheduling coordinator.
//!
//! Drives one request through
//! `COLLECT_INPUT → FETCH_EVENTS → EXTRACT_BUSY → RESOLVE_FREE → INTERSECT → VALIDATE → {BOOK | REPORT_UNAVAILABLE}`.
//!
//! Calendar fetches run concurrently, one task per attendee, bounded by a
//! semaphore and each under its own timeout. An attendee whose fetch fails is
//! excluded with a warning; the request fails only when nobody's calendar
//! could be read. Everything after the fetch is the synchronous engine.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use slot_engine::{
    common_free, AttendeeSchedule, AvailabilityResult, EventBounds, Instant, Interval, RawEvent, SlotDecision,
    WorkWindow,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::booking::EventBody;
use crate::calendar::{BookingConfirmation, CalendarBooker, CalendarSource, CredentialProvider};
use crate::config::SchedulerConfig;
use crate::error::{CalendarError, Result, SchedulerError};
use crate::request::SchedulingRequest;

/// States of a scheduling run, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    CollectInput,
    FetchEvents,
    ExtractBusy,
    ResolveFree,
    Intersect,
    Validate,
    Book,
    ReportUnavailable,
}

/// Something that degraded the result without failing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The attendee was excluded from the intersection.
    FetchFailed {
        attendee: String,
        reason: String,
        /// Whether a later attempt could succeed.
        retryable: bool,
    },
    /// One event in the attendee's calendar could not be parsed.
    SkippedEvent {
        attendee: String,
        summary: String,
        reason: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::FetchFailed {
                attendee, reason, ..
            } => {
                write!(f, "{} excluded: {}", attendee, reason)
            }
            Warning::SkippedEvent {
                attendee,
                summary,
                reason,
            } => write!(f, "{}: skipped event '{}': {}", attendee, summary, reason),
        }
    }
}

impl Warning {
    fn fetch_failed(attendee: &str, error: &SchedulerError) -> Self {
        let reason = match error {
            SchedulerError::FetchFailure { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        Warning::FetchFailed {
            attendee: attendee.to_string(),
            reason,
            retryable: error.is_retryable(),
        }
    }
}

/// One event from an attendee's calendar, resolved to instants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub summary: String,
    pub start: Instant,
    pub end: Instant,
    pub all_day: bool,
}

/// Per-attendee and common free time for one work window.
#[derive(Debug, Clone, PartialEq)]
pub struct DayAvailability {
    pub window: WorkWindow,
    /// Schedules of the attendees whose calendars were read, in request order.
    pub schedules: Vec<AttendeeSchedule>,
    pub common_free: Vec<Interval>,
    pub warnings: Vec<Warning>,
    /// Attendees left out of the intersection.
    pub excluded: Vec<String>,
}

/// The day's availability plus the verdict on the requested range.
#[derive(Debug, Clone, PartialEq)]
pub struct Availability {
    pub day: DayAvailability,
    pub result: AvailabilityResult,
}

impl Availability {
    pub fn is_satisfied(&self) -> bool {
        self.result.satisfied
    }

    pub fn decision(&self) -> SlotDecision {
        self.result.decision()
    }

    pub fn zone(&self) -> Tz {
        self.day.window.zone()
    }
}

/// Terminal state of a run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Booked {
        availability: Availability,
        confirmation: BookingConfirmation,
        body: Box<EventBody>,
    },
    Rejected { availability: Availability },
}

impl Outcome {
    pub fn availability(&self) -> &Availability {
        match self {
            Outcome::Booked { availability, .. } | Outcome::Rejected { availability } => availability,
        }
    }

    pub fn is_booked(&self) -> bool {
        matches!(self, Outcome::Booked { .. })
    }
}

type FetchResult = Result<Vec<RawEvent>>;

pub struct SchedulingCoordinator {
    config: SchedulerConfig,
    zone: Tz,
    source: Arc<dyn CalendarSource>,
    booker: Arc<dyn CalendarBooker>,
    credentials: Arc<dyn CredentialProvider>,
}

impl SchedulingCoordinator {
    /// # Errors
    /// `SchedulerError::Config` if `config` does not validate.
    pub fn new(
        config: SchedulerConfig,
        source: Arc<dyn CalendarSource>,
        booker: Arc<dyn CalendarBooker>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let zone = config.zone()?;
        Ok(Self {
            config,
            zone,
            source,
            booker,
            credentials,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Free time of each attendee and their common free time on `date`.
    pub async fn free_slots(&self, attendees: &[String], date: NaiveDate) -> Result<DayAvailability> {
        let window = self.config.work_window(date)?;
        let span = info_span!("free_slots", %date, attendees = attendees.len());
        self.collect(attendees, window, &CancellationToken::new())
            .instrument(span)
            .await
    }

    /// Events on `attendee`'s calendar overlapping `[from, until)`, ordered by
    /// start, at most `limit` of them. Events that do not parse are skipped.
    pub async fn upcoming_events(
        &self,
        attendee: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CalendarEntry>> {
        let credential = self.credentials.credential_for(attendee)?;
        let timeout = self.config.fetch_timeout();
        let events = tokio::time::timeout(
            timeout,
            self.source.list_events(&credential, attendee, from, until),
        )
        .await
        .map_err(|_| SchedulerError::fetch(attendee, CalendarError::Timeout(timeout.as_secs())))?
        .map_err(|e| SchedulerError::fetch(attendee, e))?;

        let mut entries = Vec::with_capacity(events.len());
        for event in &events {
            let resolved = event.bounds(self.zone).and_then(|bounds| {
                let (start, end) = bounds.instants(self.zone)?;
                Ok((start, end, bounds))
            });
            match resolved {
                Ok((start, end, bounds)) => {
                    if end > from && start < until {
                        entries.push(CalendarEntry {
                            summary: event.label().to_string(),
                            start,
                            end,
                            all_day: matches!(bounds, EventBounds::AllDay { .. }),
                        });
                    }
                }
                Err(error) => warn!(event = event.label(), %error, "skipping malformed event"),
            }
        }
        entries.sort_by_key(|entry| (entry.start, entry.end));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Run the request up to VALIDATE without booking.
    pub async fn check(&self, request: &SchedulingRequest) -> Result<Availability> {
        let span = info_span!("check", start = %request.start, attendees = request.attendees.len());
        self.evaluate(request, &CancellationToken::new())
            .instrument(span)
            .await
    }

    /// Run the request and book it when the requested range is free.
    pub async fn schedule(&self, request: &SchedulingRequest) -> Result<Outcome> {
        self.schedule_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`schedule`](Self::schedule), abandoning in-flight fetches when
    /// `cancel` fires. Once booking has started it runs to completion.
    pub async fn schedule_with_cancel(
        &self,
        request: &SchedulingRequest,
        cancel: CancellationToken,
    ) -> Result<Outcome> {
        let span = info_span!("schedule", start = %request.start, attendees = request.attendees.len());
        self.run(request, cancel).instrument(span).await
    }

    async fn run(&self, request: &SchedulingRequest, cancel: CancellationToken) -> Result<Outcome> {
        let Some(organizer) = request.organizer() else {
            return Err(SchedulerError::IncompleteRequest(vec!["attendees"]));
        };

        let availability = self.evaluate(request, &cancel).await?;
        if !availability.is_satisfied() {
            debug!(stage = ?Stage::ReportUnavailable, "transition");
            info!(
                alternatives = availability.result.common_free.len(),
                "Requested slot is not available"
            );
            return Ok(Outcome::Rejected { availability });
        }

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }

        debug!(stage = ?Stage::Book, "transition");
        let body = EventBody::from_request(request, &self.config.booking);
        let credential = self
            .credentials
            .credential_for(organizer)
            .map_err(|e| SchedulerError::BookingFailed(e.to_string()))?;
        let confirmation = self
            .booker
            .insert_event(&credential, &self.config.calendar_id, &body)
            .await
            .map_err(|e| SchedulerError::BookingFailed(e.to_string()))?;

        info!(event_id = %confirmation.id, "Meeting booked");
        Ok(Outcome::Booked {
            availability,
            confirmation,
            body: Box::new(body),
        })
    }

    async fn evaluate(
        &self,
        request: &SchedulingRequest,
        cancel: &CancellationToken,
    ) -> Result<Availability> {
        debug!(stage = ?Stage::CollectInput, "transition");
        let requested = request.requested_interval()?;

        // A request crossing midnight is judged against its start date.
        let date = requested.start().with_timezone(&self.zone).date_naive();
        let window = match request.work_hours {
            Some((start, end)) => WorkWindow::new(date, start, end, self.zone)?,
            None => self.config.work_window(date)?,
        };

        let day = self.collect(&request.attendees, window, cancel).await?;

        debug!(stage = ?Stage::Validate, "transition");
        let result = AvailabilityResult::evaluate(requested, day.common_free.clone());
        Ok(Availability { day, result })
    }

    async fn collect(
        &self,
        attendees: &[String],
        window: WorkWindow,
        cancel: &CancellationToken,
    ) -> Result<DayAvailability> {
        debug!(stage = ?Stage::FetchEvents, "transition");
        let fetched = self.fetch_all(attendees, &window, cancel).await?;

        debug!(stage = ?Stage::ExtractBusy, "transition");
        let mut schedules = Vec::with_capacity(fetched.len());
        let mut warnings = Vec::new();
        let mut excluded = Vec::new();

        for (attendee, result) in fetched {
            match result {
                Ok(events) => {
                    let schedule = AttendeeSchedule::build(attendee.as_str(), &events, &window);
                    warnings.extend(schedule.skipped.iter().map(|skipped| Warning::SkippedEvent {
                        attendee: attendee.clone(),
                        summary: skipped.summary.clone(),
                        reason: skipped.error.to_string(),
                    }));
                    schedules.push(schedule);
                }
                Err(error) => {
                    warn!(%attendee, %error, "Excluding attendee");
                    warnings.push(Warning::fetch_failed(&attendee, &error));
                    excluded.push(attendee);
                }
            }
        }

        if !attendees.is_empty() && schedules.is_empty() {
            return Err(SchedulerError::NoAvailabilityData {
                attempted: attendees.len(),
            });
        }

        debug!(stage = ?Stage::Intersect, "transition");
        let common_free = common_free(&window, &schedules);

        Ok(DayAvailability {
            window,
            schedules,
            common_free,
            warnings,
            excluded,
        })
    }

    /// Fetch every attendee's events for the window, in request order.
    async fn fetch_all(
        &self,
        attendees: &[String],
        window: &WorkWindow,
        cancel: &CancellationToken,
    ) -> Result<Vec<(String, FetchResult)>> {
        let interval = window.interval();
        let timeout = self.config.fetch_timeout();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));
        let mut results: Vec<Option<FetchResult>> = attendees.iter().map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (index, attendee) in attendees.iter().enumerate() {
            let credential = match self.credentials.credential_for(attendee) {
                Ok(credential) => credential,
                Err(e) => {
                    results[index] = Some(Err(e));
                    continue;
                }
            };
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let calendar_id = attendee.clone();
            let span = info_span!("fetch", attendee = %attendee);

            tasks.spawn(
                async move {
                    let result = match semaphore.acquire_owned().await {
                        Err(_) => Err(CalendarError::Source("fetch pool closed".to_string())),
                        Ok(_permit) => {
                            let fetch = source.list_events(
                                &credential,
                                &calendar_id,
                                interval.start(),
                                interval.end(),
                            );
                            match tokio::time::timeout(timeout, fetch).await {
                                Ok(Ok(events)) => {
                                    debug!(events = events.len(), "Fetched calendar");
                                    Ok(events)
                                }
                                Ok(Err(e)) => Err(e),
                                Err(_) => Err(CalendarError::Timeout(timeout.as_secs())),
                            }
                        }
                    };
                    (index, result.map_err(|e| SchedulerError::fetch(&calendar_id, e)))
                }
                .instrument(span),
            );
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    info!("Scheduling cancelled during calendar fetch");
                    return Err(SchedulerError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, result))) => results[index] = Some(result),
                    Some(Err(e)) => warn!("Calendar fetch task failed: {}", e),
                    None => break,
                },
            }
        }

        Ok(attendees
            .iter()
            .cloned()
            .zip(results)
            .map(|(attendee, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(SchedulerError::fetch(
                        &attendee,
                        CalendarError::Source("fetch task did not complete".to_string()),
                    ))
                });
                (attendee, result)
            })
            .collect())
    }
}
