//! Error types for the scheduling coordinator and its collaborators.

use chrono::NaiveDateTime;
use slot_engine::EngineError;
use thiserror::Error;

/// Failures that end a scheduling request.
///
/// `FetchFailure` is the exception: the coordinator records it as a warning
/// and carries on with the remaining attendees.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid request range: end {end} is not after start {start}")]
    InvalidRequestRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("No availability data: calendar fetch failed for all {attempted} attendee(s)")]
    NoAvailabilityData { attempted: usize },

    #[error("Fetch failed for {attendee}: {source}")]
    FetchFailure {
        attendee: String,
        #[source]
        source: CalendarError,
    },

    #[error("Booking failed: {0}")]
    BookingFailed(String),

    #[error("Scheduling request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No usable credential for {attendee}: {reason}")]
    Credentials { attendee: String, reason: String },

    #[error("Incomplete meeting request, missing: {}", .0.join(", "))]
    IncompleteRequest(Vec<&'static str>),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SchedulerError {
    pub(crate) fn fetch(attendee: &str, source: CalendarError) -> Self {
        Self::FetchFailure {
            attendee: attendee.to_string(),
            source,
        }
    }

    /// Whether repeating the request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailure { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Failures talking to a calendar service.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Calendar source error: {0}")]
    Source(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl CalendarError {
    /// Whether the same call could succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
