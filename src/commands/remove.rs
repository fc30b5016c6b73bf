//! Removing items from a schedule.
//!
//! Indices are recorded at removal time, one at a time in list order, so
//! that undo can reinsert in reverse order at exactly the recorded slots.
//! While the items are out of the schedule the command holds the only
//! schedule-side reference to them.

use std::collections::HashSet;

use log::debug;

use super::{Command, CommandKind, LayoutSnapshot, ScheduleDocument};
use crate::error::{EditError, EditResult};
use crate::models::{ItemHandle, Schedule, Selection};

/// Removes a set of items, restoring positions and selection on undo.
#[derive(Debug)]
pub struct RemoveScheduleItemsCommand {
    items: Vec<ItemHandle>,
    indices: Vec<usize>,
    removed: bool,
    layout: LayoutSnapshot,
}

impl RemoveScheduleItemsCommand {
    pub fn new(items: Vec<ItemHandle>) -> Self {
        Self {
            indices: Vec::with_capacity(items.len()),
            items,
            removed: false,
            layout: LayoutSnapshot::default(),
        }
    }

    /// Removes the current selection.
    pub fn for_selection(selection: &Selection) -> Self {
        Self::new(selection.items())
    }

    pub fn items(&self) -> &[ItemHandle] {
        &self.items
    }

    /// Indices recorded by the last perform.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Whether the items are currently out of the schedule.
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    fn reinsert(
        schedule: &mut Schedule,
        selection: &mut Selection,
        items: &[ItemHandle],
        indices: &[usize],
    ) -> EditResult<()> {
        for (n, (item, &index)) in items.iter().zip(indices).rev().enumerate() {
            schedule.add_item(item.clone(), index)?;
            selection.select(item, n > 0);
        }
        Ok(())
    }
}

impl Command for RemoveScheduleItemsCommand {
    fn init_check(&self) -> EditResult<()> {
        if self.items.is_empty() {
            return Err(EditError::InitCheck("no items to remove".into()));
        }
        let mut seen = HashSet::with_capacity(self.items.len());
        if !self.items.iter().all(|item| seen.insert(item)) {
            return Err(EditError::InitCheck("item removed twice".into()));
        }
        Ok(())
    }

    fn perform(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        if self.removed {
            return Err(EditError::MismatchedValues("items already removed".into()));
        }
        debug!("removing {} schedule item(s)", self.items.len());

        self.layout = LayoutSnapshot::capture(&doc.schedule);
        let mut block = doc.schedule.start_notification_block();
        self.indices.clear();
        for item in &self.items {
            let Some(index) = block.index_of(item) else {
                let done = self.indices.len();
                Self::reinsert(
                    &mut block,
                    &mut doc.selection,
                    &self.items[..done],
                    &self.indices,
                )?;
                self.indices.clear();
                return Err(EditError::MismatchedValues(
                    "removed item is not part of the schedule".into(),
                ));
            };
            block.remove_item_at(index);
            doc.selection.deselect(item);
            self.indices.push(index);
        }
        self.removed = true;
        block.sanitize_start_frames();
        Ok(())
    }

    fn undo(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        if !self.removed {
            return Err(EditError::MismatchedValues("items were not removed".into()));
        }
        debug!("restoring {} schedule item(s)", self.items.len());

        let mut block = doc.schedule.start_notification_block();
        Self::reinsert(&mut block, &mut doc.selection, &self.items, &self.indices)?;
        self.removed = false;
        self.layout.restore();
        block.sanitize_start_frames();
        Ok(())
    }

    fn name(&self) -> String {
        if self.items.len() == 1 {
            "Remove Schedule Item".to_string()
        } else {
            "Remove Schedule Items".to_string()
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RemoveItems
    }
}
