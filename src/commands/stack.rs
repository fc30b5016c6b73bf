//! Undo/redo history.

use log::{debug, warn};

use super::{Command, ScheduleDocument};
use crate::config::EditorConfig;
use crate::error::EditResult;

/// Linear undo/redo history of performed commands.
///
/// A performed command first tries to merge into the top of the undo
/// stack, so a drag gesture ends up as one entry. Performing a new command
/// drops the redo history.
#[derive(Debug, Default)]
pub struct CommandStack {
    undo: Vec<Box<dyn Command>>,
    redo: Vec<Box<dyn Command>>,
    limit: usize,
    saved_at: Option<usize>,
}

impl CommandStack {
    /// Creates an unbounded, clean history.
    pub fn new() -> Self {
        Self {
            saved_at: Some(0),
            ..Self::default()
        }
    }

    /// Applies editor configuration (history depth; 0 is unbounded).
    pub fn with_config(mut self, config: &EditorConfig) -> Self {
        self.limit = config.undo_limit;
        self
    }

    /// Checks and performs `command`, then records it.
    ///
    /// A command failing its init check is dropped without touching the
    /// document. A command failing to perform is dropped as well.
    pub fn perform(
        &mut self,
        mut command: Box<dyn Command>,
        doc: &mut ScheduleDocument,
    ) -> EditResult<()> {
        command.init_check()?;
        command.perform(doc)?;

        if self.saved_at.is_some_and(|s| s > self.undo.len()) {
            self.saved_at = None;
        }
        self.redo.clear();

        if let Some(top) = self.undo.last_mut() {
            if top.combine_with_next(&*command) {
                debug!("'{}' merged into previous step", command.name());
                if self.saved_at == Some(self.undo.len()) {
                    self.saved_at = None;
                }
                return Ok(());
            }
        }

        debug!("performed '{}'", command.name());
        self.undo.push(command);
        if self.limit > 0 && self.undo.len() > self.limit {
            let overflow = self.undo.len() - self.limit;
            self.undo.drain(0..overflow);
            self.saved_at = self.saved_at.and_then(|s| s.checked_sub(overflow));
        }
        Ok(())
    }

    /// Undoes the most recent command. Returns `Ok(false)` if there is none.
    ///
    /// A command failing to undo leaves the document in an unknown state
    /// relative to the history, which is then cleared.
    pub fn undo(&mut self, doc: &mut ScheduleDocument) -> EditResult<bool> {
        let Some(mut command) = self.undo.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.undo(doc) {
            warn!("undo of '{}' failed, clearing history: {err}", command.name());
            self.clear();
            return Err(err);
        }
        debug!("undid '{}'", command.name());
        self.redo.push(command);
        Ok(true)
    }

    /// Redoes the most recently undone command. Returns `Ok(false)` if
    /// there is none.
    pub fn redo(&mut self, doc: &mut ScheduleDocument) -> EditResult<bool> {
        let Some(mut command) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.redo(doc) {
            warn!("redo of '{}' failed, clearing history: {err}", command.name());
            self.clear();
            return Err(err);
        }
        debug!("redid '{}'", command.name());
        self.undo.push(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the command [`Self::undo`] would undo.
    pub fn undo_name(&self) -> Option<String> {
        self.undo.last().map(|c| c.name())
    }

    /// Label of the command [`Self::redo`] would redo.
    pub fn redo_name(&self) -> Option<String> {
        self.redo.last().map(|c| c.name())
    }

    /// Number of undoable steps.
    pub fn depth(&self) -> usize {
        self.undo.len()
    }

    /// Drops all history. The current state counts as unsaved.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.saved_at = None;
    }

    /// Marks the current state as saved.
    pub fn save(&mut self) {
        self.saved_at = Some(self.undo.len());
    }

    /// Whether the document matches the last saved state.
    pub fn is_saved(&self) -> bool {
        self.saved_at == Some(self.undo.len())
    }
}
