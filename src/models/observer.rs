//! Observer interfaces for views that follow schedule edits.
//!
//! All methods have empty default bodies so observers implement only what
//! they use. Observers are called while the schedule is mutably borrowed;
//! they must not try to reach back into it.

use super::{ItemHandle, ScheduleItem};

/// Receives structural and layout notifications from a [`super::Schedule`].
///
/// Notifications inside a notification block are batched: `items_layouted`
/// fires at most once, when the outermost block finishes.
pub trait ScheduleObserver {
    /// An item was linked into the list at `index`.
    fn item_added(&self, _item: &ItemHandle, _index: usize) {}

    /// An item was unlinked from the list.
    fn item_removed(&self, _item: &ItemHandle) {}

    /// Start frames or durations may have changed; re-layout views.
    fn items_layouted(&self) {}

    /// The outermost notification block started.
    fn notification_block_started(&self) {}

    /// The outermost notification block finished.
    fn notification_block_finished(&self) {}
}

/// Receives field changes of a single [`ScheduleItem`].
pub trait ItemListener {
    fn item_changed(&self, item: &ScheduleItem);
}
