//! Check a requested meeting range against free intervals.
//!
//! A request is satisfied only by a single contiguous free interval. Two free
//! intervals whose union covers the request do not count.

use serde::Serialize;

use crate::interval::Interval;

/// Outcome of validating one requested range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "slots", rename_all = "snake_case")]
pub enum SlotDecision {
    /// The free interval that fully contains the request.
    Satisfied(Interval),
    /// The request does not fit; every free interval, as alternatives.
    Unavailable(Vec<Interval>),
}

impl SlotDecision {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, SlotDecision::Satisfied(_))
    }
}

/// Find the free interval `F` with `F.start <= requested.start` and
/// `requested.end <= F.end`.
pub fn validate_slot(free: &[Interval], requested: &Interval) -> SlotDecision {
    match free.iter().find(|slot| slot.contains(requested)) {
        Some(slot) => SlotDecision::Satisfied(*slot),
        None => SlotDecision::Unavailable(free.to_vec()),
    }
}
