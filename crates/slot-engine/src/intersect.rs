//! Intersect free-interval sequences across attendees.
//!
//! Each input sequence must be ascending and non-overlapping. The pairwise step
//! is a two-pointer sweep, O(a + b); N sequences are folded pairwise starting
//! from the whole work window.

use crate::interval::Interval;

/// Intervals present in both `a` and `b`.
///
/// The output is sorted, non-overlapping, and adjacent pieces are coalesced.
pub fn intersect_pair(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out: Vec<Interval> = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if let Some(common) = a[i].intersection(&b[j]) {
            push_coalesced(&mut out, common);
        }
        // Advance whichever interval finishes first; it cannot meet anything later.
        if a[i].end() <= b[j].end() {
            i += 1;
        } else {
            j += 1;
        }
    }

    out
}

/// Intervals free in every sequence and inside `bounds`.
///
/// With no sequences the result is `bounds` itself; with one sequence it is
/// that sequence clipped to `bounds`.
pub fn intersect_all<S>(bounds: &Interval, sequences: &[S]) -> Vec<Interval>
where
    S: AsRef<[Interval]>,
{
    let mut common = vec![*bounds];
    for sequence in sequences {
        if common.is_empty() {
            break;
        }
        common = intersect_pair(&common, sequence.as_ref());
    }
    common
}

fn push_coalesced(out: &mut Vec<Interval>, next: Interval) {
    if let Some(last) = out.last_mut() {
        if next.start() <= last.end() {
            *last = Interval::from_ordered(last.start(), last.end().max(next.end()));
            return;
        }
    }
    out.push(next);
}
