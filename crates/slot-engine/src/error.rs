//! Error types for slot-engine operations.

use chrono::{DateTime, NaiveTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Empty or inverted interval: {start} >= {end}")]
    EmptyInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid working hours: {start} must be before {end}")]
    InvalidWorkHours { start: NaiveTime, end: NaiveTime },

    #[error("Local time does not exist in timezone: {0}")]
    NonexistentLocalTime(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
