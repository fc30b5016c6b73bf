//! Undoable edit commands.
//!
//! Every mutation of a schedule made on behalf of the user goes through a
//! [`Command`] so it can be undone. Commands capture the state they
//! change themselves, plus the field values of every scheduled item before
//! `perform`. The sanitize pass run by `perform` may move pinned items or
//! stretch flexible ones, and re-deriving the layout after `undo` cannot
//! always reverse that, so `undo` writes the recorded values back before
//! sanitizing again.
//!
//! # Protocol
//!
//! 1. Construct the command against the current document state.
//! 2. [`Command::init_check`]: a failing command is discarded, never
//!    performed and never pushed onto the undo stack.
//! 3. [`Command::perform`], later [`Command::undo`] / [`Command::redo`].
//!
//! [`CommandStack`] drives this protocol and coalesces drag edits.
//!
//! # Usage
//!
//! ```
//! use u_playout::commands::{CommandStack, InsertScheduleItemsAnywhereCommand, ScheduleDocument};
//! use u_playout::models::{Playlist, Schedule, ScheduleItem};
//!
//! let news = Playlist::new("news", "News", 1000).shared();
//! let mut doc = ScheduleDocument::new(Schedule::new());
//! let mut stack = CommandStack::new();
//!
//! let item = ScheduleItem::for_playlist(&news).into_handle();
//! let insert = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![item.clone()], 0);
//! stack.perform(Box::new(insert), &mut doc).unwrap();
//! assert_eq!(doc.schedule.count_items(), 1);
//!
//! stack.undo(&mut doc).unwrap();
//! assert!(doc.schedule.is_empty());
//! ```

mod change;
mod insert;
mod remove;
mod stack;

pub use change::{ChangeMask, ChangeOrigin, ChangeScheduleItemCommand};
pub use insert::{InsertScheduleItemsAnywhereCommand, InsertScheduleItemsCommand, InsertionPlan};
pub use remove::RemoveScheduleItemsCommand;
pub use stack::CommandStack;

use std::fmt::Debug;

use crate::error::EditResult;
use crate::models::{ItemProperties, Schedule, Selection, WeakItemHandle};

/// The state commands operate on: a schedule and its selection.
#[derive(Debug, Default)]
pub struct ScheduleDocument {
    pub schedule: Schedule,
    pub selection: Selection,
}

impl ScheduleDocument {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            selection: Selection::new(),
        }
    }
}

/// Field values of the items of a schedule at one point in time.
///
/// Items are held weakly: one dropped since capture is skipped on restore.
#[derive(Debug, Clone, Default)]
pub(crate) struct LayoutSnapshot {
    entries: Vec<(WeakItemHandle, ItemProperties)>,
}

impl LayoutSnapshot {
    pub(crate) fn capture(schedule: &Schedule) -> Self {
        let entries = schedule
            .items()
            .iter()
            .map(|item| (item.downgrade(), item.borrow().properties()))
            .collect();
        Self { entries }
    }

    /// Writes the recorded values back, unfiltered, whether or not the
    /// items are still scheduled.
    pub(crate) fn restore(&self) {
        for (item, properties) in &self.entries {
            if let Some(item) = item.upgrade() {
                item.borrow_mut().set_properties(*properties);
            }
        }
    }
}

/// Type tag of a command, used instead of downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ChangeItem,
    InsertItems,
    InsertItemsAnywhere,
    RemoveItems,
}

/// An undoable edit.
pub trait Command: Debug {
    /// Validates preconditions. A command failing this must be discarded.
    fn init_check(&self) -> EditResult<()>;

    /// Applies the edit.
    fn perform(&mut self, doc: &mut ScheduleDocument) -> EditResult<()>;

    /// Restores the state from before [`Command::perform`].
    fn undo(&mut self, doc: &mut ScheduleDocument) -> EditResult<()>;

    /// Re-applies the edit after an undo.
    fn redo(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        self.perform(doc)
    }

    /// Label for undo/redo menus.
    fn name(&self) -> String;

    fn kind(&self) -> CommandKind;

    /// Tries to absorb `next`, which was performed right after `self`.
    ///
    /// On success `self` undoes both edits at once and `next` is dropped.
    fn combine_with_next(&mut self, _next: &dyn Command) -> bool {
        false
    }

    /// Access to the item-change payload for [`CommandKind::ChangeItem`].
    fn as_item_change(&self) -> Option<&ChangeScheduleItemCommand> {
        None
    }
}
