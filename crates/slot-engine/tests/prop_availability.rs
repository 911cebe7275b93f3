//! Property-based tests for the availability laws using proptest.
//!
//! These tests verify invariants that should hold for *any* calendar contents,
//! not just the specific scenarios in the other test files.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use slot_engine::{
    intersect_all, intersect_pair, merge_intervals, resolve_free, validate_slot, Interval,
    WorkWindow,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn window() -> WorkWindow {
    WorkWindow::with_default_hours(NaiveDate::from_ymd_opt(2026, 3, 16).unwrap(), Tz::UTC).unwrap()
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, 9, 0, 0).unwrap()
}

/// Raw busy intervals between 09:00 and ~24:00, some spilling outside the window.
fn arb_raw_busy() -> impl Strategy<Value = Vec<Interval>> {
    prop::collection::vec((0i64..720, 1i64..180), 0..12).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(offset, len)| {
                let start = base() + Duration::minutes(offset);
                Interval::new(start, start + Duration::minutes(len)).unwrap()
            })
            .collect()
    })
}

/// Busy intervals as the extractor hands them on: clipped and merged.
fn arb_busy() -> impl Strategy<Value = Vec<Interval>> {
    arb_raw_busy().prop_map(|raw| {
        let bounds = window().interval();
        merge_intervals(raw.iter().filter_map(|b| b.intersection(&bounds)).collect())
    })
}

fn arb_free() -> impl Strategy<Value = Vec<Interval>> {
    arb_busy().prop_map(|busy| resolve_free(&window(), &busy))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn total_minutes(intervals: &[Interval]) -> i64 {
    intervals.iter().map(|i| i.duration_minutes()).sum()
}

fn is_subset(inner: &[Interval], outer: &[Interval]) -> bool {
    inner
        .iter()
        .all(|i| outer.iter().any(|o| o.contains(i)))
}

fn is_sorted_disjoint(intervals: &[Interval]) -> bool {
    intervals.windows(2).all(|w| w[0].end() < w[1].start())
}

/// Quadratic reference: every overlapping pair, then merged.
fn naive_intersection(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    for x in a {
        for y in b {
            if let Some(common) = x.intersection(y) {
                out.push(common);
            }
        }
    }
    merge_intervals(out)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn free_and_busy_partition_the_window(busy in arb_busy()) {
        let w = window();
        let free = resolve_free(&w, &busy);

        for f in &free {
            for b in &busy {
                prop_assert!(!f.overlaps(b), "free {} overlaps busy {}", f, b);
            }
        }

        prop_assert_eq!(
            total_minutes(&free) + total_minutes(&busy),
            w.interval().duration_minutes()
        );

        let mut union = free.clone();
        union.extend(busy.iter().copied());
        prop_assert_eq!(merge_intervals(union), vec![w.interval()]);
    }

    #[test]
    fn free_sequence_is_sorted_and_disjoint(busy in arb_busy()) {
        let free = resolve_free(&window(), &busy);
        prop_assert!(is_sorted_disjoint(&free));
    }

    #[test]
    fn intersection_is_idempotent(free in arb_free()) {
        prop_assert_eq!(intersect_pair(&free, &free), free);
    }

    #[test]
    fn intersection_is_commutative(a in arb_free(), b in arb_free()) {
        prop_assert_eq!(intersect_pair(&a, &b), intersect_pair(&b, &a));
    }

    #[test]
    fn sweep_matches_quadratic_reference(a in arb_free(), b in arb_free()) {
        prop_assert_eq!(intersect_pair(&a, &b), naive_intersection(&a, &b));
    }

    #[test]
    fn result_is_subset_of_every_input_and_window(
        a in arb_free(),
        b in arb_free(),
        c in arb_free(),
    ) {
        let bounds = window().interval();
        let common = intersect_all(&bounds, &[a.clone(), b.clone(), c.clone()]);

        prop_assert!(is_sorted_disjoint(&common));
        prop_assert!(is_subset(&common, &a));
        prop_assert!(is_subset(&common, &b));
        prop_assert!(is_subset(&common, &c));
        prop_assert!(is_subset(&common, &[bounds]));
    }

    #[test]
    fn adding_an_attendee_never_grows_common_time(
        a in arb_free(),
        b in arb_free(),
        c in arb_free(),
    ) {
        let bounds = window().interval();
        let two = intersect_all(&bounds, &[a.clone(), b.clone()]);
        let three = intersect_all(&bounds, &[a, b, c]);

        prop_assert!(is_subset(&three, &two));
        prop_assert!(total_minutes(&three) <= total_minutes(&two));
    }

    #[test]
    fn request_across_touching_blocks_is_never_satisfied(
        first_len in 1i64..240,
        second_len in 1i64..240,
        before in 0i64..240,
        after in 0i64..240,
    ) {
        let a = base();
        let b = a + Duration::minutes(first_len);
        let c = b + Duration::minutes(second_len);
        let free = vec![Interval::new(a, b).unwrap(), Interval::new(b, c).unwrap()];

        // Starts in the first block, ends in the second.
        let start = b - Duration::minutes(1 + before % first_len);
        let end = b + Duration::minutes(1 + after % second_len);
        let requested = Interval::new(start, end).unwrap();

        prop_assert!(!validate_slot(&free, &requested).is_satisfied());
    }

    #[test]
    fn satisfied_request_always_lies_in_a_free_block(
        free in arb_free(),
        offset in 0i64..540,
        len in 1i64..240,
    ) {
        let start = window().interval().start() + Duration::minutes(offset);
        let requested = Interval::new(start, start + Duration::minutes(len)).unwrap();

        let satisfied = validate_slot(&free, &requested).is_satisfied();
        let expected = free.iter().any(|f| f.contains(&requested));
        prop_assert_eq!(satisfied, expected);
    }
}
