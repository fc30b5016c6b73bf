//! Changing the fields of one schedule item.
//!
//! The command stores the item's fields before and after the edit and
//! applies one snapshot or the other. Only fields in the change mask are
//! written, flexibility flags before the values they govern.
//! Undo also puts back every other item the layout pass moved or
//! stretched while performing.
//!
//! # Drag coalescing
//!
//! Dragging an item issues a stream of small edits. Consecutive
//! drag-originated changes of the same fields of the same item within the
//! combine window merge into one undo step.

use std::time::{Duration, Instant};

use log::debug;

use super::{Command, CommandKind, LayoutSnapshot, ScheduleDocument};
use crate::config::EditorConfig;
use crate::error::{EditError, EditResult};
use crate::models::{repeats_for, snap_to_playlist, ItemHandle, ItemProperties, ScheduleItem};

/// Set of item fields touched by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeMask(u8);

impl ChangeMask {
    pub const NONE: Self = Self(0);
    pub const START_FRAME: Self = Self(1 << 0);
    pub const DURATION: Self = Self(1 << 1);
    pub const REPEATS: Self = Self(1 << 2);
    pub const FLEXIBLE_START_FRAME: Self = Self(1 << 3);
    pub const FLEXIBLE_DURATION: Self = Self(1 << 4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Mask of fields differing between two snapshots.
    ///
    /// Toggling a flexibility flag also marks the field it governs: the
    /// flag change makes that field be recomputed.
    pub fn between(before: &ItemProperties, after: &ItemProperties) -> Self {
        let mut mask = Self::NONE;
        if before.start_frame != after.start_frame {
            mask.insert(Self::START_FRAME);
        }
        if before.duration != after.duration {
            mask.insert(Self::DURATION);
        }
        if before.explicit_repeats != after.explicit_repeats {
            mask.insert(Self::REPEATS);
        }
        if before.flexible_start_frame != after.flexible_start_frame {
            mask.insert(Self::FLEXIBLE_START_FRAME.union(Self::START_FRAME));
        }
        if before.flexible_duration != after.flexible_duration {
            mask.insert(Self::FLEXIBLE_DURATION.union(Self::DURATION));
        }
        mask
    }
}

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeOrigin {
    /// A discrete edit (property panel, menu).
    #[default]
    Direct,
    /// One step of an interactive drag.
    Drag,
}

/// Changes start frame, duration, repeats or flexibility of an item.
#[derive(Debug)]
pub struct ChangeScheduleItemCommand {
    item: ItemHandle,
    before: ItemProperties,
    after: ItemProperties,
    mask: ChangeMask,
    origin: ChangeOrigin,
    timestamp: Instant,
    combine_window: Duration,
    layout: LayoutSnapshot,
}

impl ChangeScheduleItemCommand {
    /// Creates a change of `item` towards `target`.
    ///
    /// For an inflexible playlist item, duration and repeats are kept in
    /// step: a new repeat count sets the duration, otherwise a new duration
    /// is snapped to whole repeats.
    pub fn new(item: &ItemHandle, target: ItemProperties) -> Self {
        let (before, after) = {
            let current = item.borrow();
            let before = current.properties();
            (before, normalize_target(&current, &before, target))
        };
        Self {
            item: item.clone(),
            before,
            after,
            mask: ChangeMask::between(&before, &after),
            origin: ChangeOrigin::Direct,
            timestamp: Instant::now(),
            combine_window: EditorConfig::default().combine_window(),
            layout: LayoutSnapshot::default(),
        }
    }

    /// Moves `item` to `start_frame`.
    pub fn move_to(item: &ItemHandle, start_frame: u64) -> Self {
        let target = item.borrow().properties().with_start_frame(start_frame);
        Self::new(item, target)
    }

    /// Resizes `item` to `duration`.
    pub fn resize(item: &ItemHandle, duration: u64) -> Self {
        let target = item.borrow().properties().with_duration(duration);
        Self::new(item, target)
    }

    /// Marks the change as a drag step.
    pub fn with_origin(mut self, origin: ChangeOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Overrides the issue time.
    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Applies editor configuration (combine window).
    pub fn with_config(mut self, config: &EditorConfig) -> Self {
        self.combine_window = config.combine_window();
        self
    }

    pub fn item(&self) -> &ItemHandle {
        &self.item
    }

    pub fn mask(&self) -> ChangeMask {
        self.mask
    }

    pub fn before(&self) -> &ItemProperties {
        &self.before
    }

    pub fn after(&self) -> &ItemProperties {
        &self.after
    }

    pub fn origin(&self) -> ChangeOrigin {
        self.origin
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn apply(
        &self,
        doc: &mut ScheduleDocument,
        snapshot: ItemProperties,
        layout: Option<&LayoutSnapshot>,
    ) -> EditResult<()> {
        if !doc.schedule.has_item(&self.item) {
            return Err(EditError::MismatchedValues(
                "changed item is not part of the schedule".into(),
            ));
        }

        let mut block = doc.schedule.start_notification_block();
        {
            let mut item = self.item.borrow_mut();
            let mask = self.mask;
            if mask.contains(ChangeMask::FLEXIBLE_START_FRAME) {
                item.set_flexible_start_frame(snapshot.flexible_start_frame);
            }
            if mask.contains(ChangeMask::START_FRAME) {
                let start_frame = item.filter_start_frame(snapshot.start_frame);
                item.set_start_frame(start_frame);
            }
            if mask.contains(ChangeMask::FLEXIBLE_DURATION) {
                item.set_flexible_duration(snapshot.flexible_duration);
            }
            if mask.contains(ChangeMask::REPEATS) {
                item.set_explicit_repeats(snapshot.explicit_repeats);
            }
            if mask.contains(ChangeMask::DURATION) {
                let duration = item.filter_duration(snapshot.duration);
                item.set_duration(duration);
            }
        }
        if let Some(layout) = layout {
            layout.restore();
        }
        block.sanitize_start_frames();
        Ok(())
    }
}

fn normalize_target(
    item: &ScheduleItem,
    before: &ItemProperties,
    mut target: ItemProperties,
) -> ItemProperties {
    let playlist_duration = item.playlist_duration();
    if target.flexible_duration || playlist_duration == 0 {
        return target;
    }
    if target.explicit_repeats != before.explicit_repeats {
        target.duration = u64::from(target.explicit_repeats) * playlist_duration;
    } else {
        target.duration = snap_to_playlist(target.duration, playlist_duration);
        target.explicit_repeats = repeats_for(target.duration, playlist_duration);
    }
    target
}

impl Command for ChangeScheduleItemCommand {
    fn init_check(&self) -> EditResult<()> {
        if self.mask.is_empty() {
            return Err(EditError::InitCheck("no field of the item changes".into()));
        }
        Ok(())
    }

    fn perform(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        debug!("perform '{}'", self.name());
        self.layout = LayoutSnapshot::capture(&doc.schedule);
        self.apply(doc, self.after, None)
    }

    fn undo(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        debug!("undo '{}'", self.name());
        self.apply(doc, self.before, Some(&self.layout))
    }

    fn name(&self) -> String {
        let m = self.mask;
        let name = if m == ChangeMask::START_FRAME {
            "Move Schedule Item"
        } else if m == ChangeMask::DURATION || m == ChangeMask::DURATION.union(ChangeMask::REPEATS) {
            "Change Duration"
        } else if m == ChangeMask::REPEATS {
            "Change Repeats"
        } else if m == ChangeMask::FLEXIBLE_START_FRAME.union(ChangeMask::START_FRAME) {
            "Toggle Flexible Start"
        } else if m.contains(ChangeMask::FLEXIBLE_DURATION)
            && !m.contains(ChangeMask::FLEXIBLE_START_FRAME)
            && !m.contains(ChangeMask::START_FRAME)
        {
            "Toggle Flexible Duration"
        } else {
            "Change Schedule Item"
        };
        name.to_string()
    }

    fn kind(&self) -> CommandKind {
        CommandKind::ChangeItem
    }

    fn combine_with_next(&mut self, next: &dyn Command) -> bool {
        let Some(next) = next.as_item_change() else {
            return false;
        };
        if self.origin != ChangeOrigin::Drag
            || next.origin != ChangeOrigin::Drag
            || !self.item.ptr_eq(&next.item)
            || self.mask != next.mask
        {
            return false;
        }
        let elapsed = next.timestamp.saturating_duration_since(self.timestamp);
        if elapsed > self.combine_window {
            return false;
        }
        debug!("combining '{}' after {}ms", self.name(), elapsed.as_millis());
        self.after = next.after;
        self.timestamp = next.timestamp;
        true
    }

    fn as_item_change(&self) -> Option<&ChangeScheduleItemCommand> {
        Some(self)
    }
}
