//! Start-frame sanitization.
//!
//! # Algorithm
//!
//! A single forward sweep over the list:
//!
//! 1. Snap the item to its preferred duration (inflexible items follow the
//!    current playlist duration).
//! 2. The first item keeps its start frame. Every later item is chained to
//!    the end of its predecessor if its start frame is flexible.
//! 3. A pinned item that would overlap its predecessor is pushed to the
//!    chained frame; start frames stay non-decreasing.
//! 4. A pinned item that leaves a gap triggers a backward repair over the
//!    run of preceding items that can absorb it (see [`close_gap`]).
//!
//! # Complexity
//! O(n · r) where r is the longest repair run; O(n) without pinned items.

use std::ops::Range;

use log::{debug, trace};

use crate::models::{ItemHandle, Timecode};

/// Lays out `items` in place.
pub(crate) fn sanitize_items(items: &[ItemHandle]) {
    let mut residual_gaps = 0usize;

    for (index, handle) in items.iter().enumerate() {
        {
            let mut item = handle.borrow_mut();
            let preferred = item.preferred_duration();
            if preferred != item.duration() {
                item.set_duration(preferred);
            }
        }
        if index == 0 {
            continue;
        }

        let chained = items[index - 1].borrow().end_frame();
        let mut item = handle.borrow_mut();
        if item.flexible_start_frame() {
            item.set_start_frame(chained);
            continue;
        }

        let pinned = item.start_frame();
        if pinned < chained {
            trace!(
                "pinned item {index} at {} overlaps, pushed to {}",
                Timecode(pinned),
                Timecode(chained)
            );
            item.set_start_frame(chained);
        } else if pinned > chained {
            drop(item);
            if !close_gap(items, index, pinned, pinned - chained) {
                residual_gaps += 1;
            }
        }
    }

    debug!(
        "sanitized {} schedule items, {} residual gap(s)",
        items.len(),
        residual_gaps
    );
}

/// Start of the run of items before `index` that may absorb a gap.
///
/// Walks backward from `index - 1`. A hard anchor ends the run and is not
/// part of it. An item whose start frame cannot move (pinned, or the first
/// item) is the last one included. `None` if the run is empty.
fn repair_run_start(items: &[ItemHandle], index: usize) -> Option<usize> {
    let mut start = None;
    for j in (0..index).rev() {
        let item = items[j].borrow();
        if item.is_hard_anchor() {
            break;
        }
        start = Some(j);
        if !item.flexible_start_frame() || j == 0 {
            break;
        }
    }
    start
}

/// Number of flexible-duration items in `range`.
pub(crate) fn count_flexible_items_in_range(items: &[ItemHandle], range: Range<usize>) -> usize {
    items[range]
        .iter()
        .filter(|item| item.borrow().flexible_duration())
        .count()
}

/// Closes the gap of `diff` frames before the pinned item at `index`.
///
/// Each flexible-duration item of the run grows by `diff / n`, with `n`
/// counted once up front; the integer remainder is not distributed.
/// Flexible-start items are re-chained, then the trailing flexible-start
/// items are moved up against `pinned`, which leaves any remaining gap
/// at the front of the run.
///
/// Returns whether the item now directly follows its predecessor.
fn close_gap(items: &[ItemHandle], index: usize, pinned: u64, diff: u64) -> bool {
    let Some(run_start) = repair_run_start(items, index) else {
        trace!("gap of {diff} frames before item {index} blocked by hard anchor");
        return false;
    };

    let flexible = count_flexible_items_in_range(items, run_start..index);
    let share = if flexible > 0 { diff / flexible as u64 } else { 0 };
    if share > 0 {
        for j in run_start..index {
            let chained = (j > run_start).then(|| items[j - 1].borrow().end_frame());
            let mut item = items[j].borrow_mut();
            if let Some(chained) = chained {
                item.set_start_frame(chained);
            }
            if item.flexible_duration() {
                let stretched = item.duration() + share;
                item.set_duration(stretched);
            }
        }
    }

    let mut target = pinned;
    for j in (run_start..index).rev() {
        let mut item = items[j].borrow_mut();
        if item.end_frame() == target || !item.flexible_start_frame() || j == 0 {
            break;
        }
        let start = target - item.duration();
        item.set_start_frame(start);
        target = start;
    }

    items[index - 1].borrow().end_frame() == pinned
}
