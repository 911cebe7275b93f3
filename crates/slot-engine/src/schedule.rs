//! Per-attendee schedules and the per-request availability result.

use serde::Serialize;

use crate::busy::{extract_busy, RawEvent, SkippedEvent};
use crate::freebusy::resolve_free;
use crate::interval::Interval;
use crate::intersect::intersect_all;
use crate::validator::{validate_slot, SlotDecision};
use crate::window::WorkWindow;

/// One attendee's busy and free time inside a work window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendeeSchedule {
    pub attendee: String,
    /// Ascending, merged, clipped to the window.
    pub busy: Vec<Interval>,
    /// Complement of `busy` inside the window.
    pub free: Vec<Interval>,
    #[serde(skip)]
    pub skipped: Vec<SkippedEvent>,
}

impl AttendeeSchedule {
    /// Run busy extraction and free-slot resolution for one attendee.
    pub fn build(attendee: impl Into<String>, events: &[RawEvent], window: &WorkWindow) -> Self {
        let extraction = extract_busy(events, window);
        let free = resolve_free(window, &extraction.busy);
        Self {
            attendee: attendee.into(),
            busy: extraction.busy,
            free,
            skipped: extraction.skipped,
        }
    }
}

/// Intersect the free time of every schedule inside the window.
pub fn common_free(window: &WorkWindow, schedules: &[AttendeeSchedule]) -> Vec<Interval> {
    let sequences: Vec<&[Interval]> = schedules.iter().map(|s| s.free.as_slice()).collect();
    intersect_all(&window.interval(), &sequences)
}

/// Result of one scheduling request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityResult {
    pub requested: Interval,
    pub common_free: Vec<Interval>,
    pub satisfied: bool,
}

impl AvailabilityResult {
    pub fn evaluate(requested: Interval, common_free: Vec<Interval>) -> Self {
        let satisfied = validate_slot(&common_free, &requested).is_satisfied();
        Self {
            requested,
            common_free,
            satisfied,
        }
    }

    /// The matching free interval, or all free intervals as alternatives.
    pub fn decision(&self) -> SlotDecision {
        validate_slot(&self.common_free, &self.requested)
    }
}
