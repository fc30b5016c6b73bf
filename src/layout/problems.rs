//! Problem ranges.
//!
//! Layout never fails; what it cannot resolve is left visible. A problem
//! range marks frames the UI should flag: a gap no flexible item could
//! absorb, an overlap (only in a schedule that has not been laid out yet),
//! or an item running past the end of the day.

use serde::{Deserialize, Serialize};

use crate::models::{ItemHandle, FRAMES_PER_DAY};

/// Classification of layout problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemKind {
    /// Unscheduled frames between two items.
    Gap,
    /// Two items claim the same frames.
    Overlap,
    /// Frames past the end of the broadcast day.
    PastEndOfDay,
}

/// A frame range `[start_frame, end_frame)` with a layout problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRange {
    pub kind: ProblemKind,
    pub start_frame: u64,
    pub end_frame: u64,
    /// Index of the item the problem was detected at.
    pub index: usize,
}

impl ProblemRange {
    #[inline]
    pub fn duration(&self) -> u64 {
        self.end_frame - self.start_frame
    }
}

/// Scans adjacent items for gaps and overlaps, and the last item for
/// a day overrun.
pub(crate) fn problem_ranges(items: &[ItemHandle]) -> Vec<ProblemRange> {
    let mut problems = Vec::new();

    for (index, pair) in items.windows(2).enumerate() {
        let prev_end = pair[0].borrow().end_frame();
        let next_start = pair[1].borrow().start_frame();
        if next_start > prev_end {
            problems.push(ProblemRange {
                kind: ProblemKind::Gap,
                start_frame: prev_end,
                end_frame: next_start,
                index: index + 1,
            });
        } else if next_start < prev_end {
            problems.push(ProblemRange {
                kind: ProblemKind::Overlap,
                start_frame: next_start,
                end_frame: prev_end,
                index: index + 1,
            });
        }
    }

    if let Some(last) = items.last() {
        let end = last.borrow().end_frame();
        if end > FRAMES_PER_DAY {
            problems.push(ProblemRange {
                kind: ProblemKind::PastEndOfDay,
                start_frame: FRAMES_PER_DAY,
                end_frame: end,
                index: items.len() - 1,
            });
        }
    }

    problems
}
