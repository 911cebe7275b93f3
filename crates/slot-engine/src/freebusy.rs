//! Compute free intervals from merged busy intervals.
//!
//! A single left-to-right scan over busy intervals that are already sorted,
//! merged, and clipped to the window (see [`crate::busy::extract_busy`]).
//! Feeding unmerged input here produces spurious gaps.

use chrono::Duration;

use crate::interval::Interval;
use crate::window::WorkWindow;

/// The complement of `busy` inside `window`, sorted by start.
pub fn resolve_free(window: &WorkWindow, busy: &[Interval]) -> Vec<Interval> {
    complement(&window.interval(), busy)
}

/// The complement of `busy` inside `bounds`.
pub fn complement(bounds: &Interval, busy: &[Interval]) -> Vec<Interval> {
    let mut free_slots = Vec::new();
    let mut cursor = bounds.start();

    for block in busy {
        let busy_start = block.start().min(bounds.end());
        if cursor < busy_start {
            free_slots.push(Interval::from_ordered(cursor, busy_start));
        }
        cursor = cursor.max(block.end());
    }

    // Trailing free slot after the last busy period.
    if cursor < bounds.end() {
        free_slots.push(Interval::from_ordered(cursor, bounds.end()));
    }

    free_slots
}

/// The first free interval lasting at least `min_duration`.
pub fn find_first_fit(free: &[Interval], min_duration: Duration) -> Option<Interval> {
    free.iter().copied().find(|slot| slot.duration() >= min_duration)
}
