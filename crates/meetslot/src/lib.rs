//! # meetslot
//!
//! Meeting scheduling on top of [`slot_engine`]: fetch every attendee's
//! calendar concurrently, compute common free time, and book the requested
//! slot when it fits.
//!
//! ## Modules
//!
//! - [`coordinator`] — the scheduling state machine
//! - [`calendar`] — calendar read/write and credential traits
//! - [`google`] — Google Calendar REST client
//! - [`fixture`] — JSON-file calendars and a dry-run booker
//! - [`booking`] — event body sent when booking
//! - [`request`] — scheduling requests and extracted drafts
//! - [`extract`] — language-model extraction of meeting requests
//! - [`retry`] — bounded retry with exponential backoff
//! - [`config`] — configuration
//! - [`error`] — Error types

pub mod booking;
pub mod calendar;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod fixture;
pub mod google;
pub mod request;
pub mod retry;

pub use booking::EventBody;
pub use calendar::{
    BookingConfirmation, CalendarBooker, CalendarSource, Credential, CredentialProvider,
    StaticCredentials, TokenFileStore,
};
pub use config::{BookingDefaults, ExtractionConfig, ReminderOverride, SchedulerConfig};
pub use coordinator::{
    Availability, CalendarEntry, DayAvailability, Outcome, SchedulingCoordinator, Stage, Warning,
};
pub use error::{CalendarError, Result, SchedulerError};
pub use extract::{ChatCompletionExtractor, MeetingExtractor};
pub use fixture::{JsonCalendarSource, RecordingBooker};
pub use google::GoogleCalendarClient;
pub use request::{Field, MeetingDetails, MeetingDraft, SchedulingRequest};
pub use retry::RetryPolicy;
