//! # slot-engine
//!
//! Deterministic availability resolution for meeting scheduling.
//!
//! Given each attendee's calendar events and a working-hours window, the engine
//! computes busy and free time per attendee, intersects free time across
//! attendees, and decides whether a requested meeting range fits. Everything
//! here is pure and synchronous; fetching events and booking meetings belong
//! to the caller.
//!
//! ## Modules
//!
//! - [`interval`] — half-open `[start, end)` ranges and merging
//! - [`window`] — working-hours window for one date in one timezone
//! - [`busy`] — raw calendar events → merged busy intervals
//! - [`freebusy`] — busy intervals → free intervals
//! - [`intersect`] — free intervals of N attendees → common free intervals
//! - [`validator`] — requested range vs. free intervals
//! - [`schedule`] — per-attendee schedules and the availability result
//! - [`recurrence`] — RRULE validation for passthrough recurrence strings
//! - [`error`] — Error types

pub mod busy;
pub mod error;
pub mod freebusy;
pub mod intersect;
pub mod interval;
pub mod recurrence;
pub mod schedule;
pub mod validator;
pub mod window;

pub use busy::{extract_busy, BusyExtraction, EventBounds, RawEvent, RawEventTime, SkippedEvent};
pub use error::EngineError;
pub use freebusy::{complement, find_first_fit, resolve_free};
pub use intersect::{intersect_all, intersect_pair};
pub use interval::{merge_intervals, Instant, Interval};
pub use recurrence::validate_rule;
pub use schedule::{common_free, AttendeeSchedule, AvailabilityResult};
pub use validator::{validate_slot, SlotDecision};
pub use window::{parse_zone, resolve_local, WorkWindow, DEFAULT_TIMEZONE};
