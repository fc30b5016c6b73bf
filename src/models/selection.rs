//! Selection set.
//!
//! Holds weak references so a selected item that is dropped everywhere
//! else simply disappears from the selection. Membership is mirrored in
//! each item's `selected` flag for cheap lookup by views.

use super::{ItemHandle, WeakItemHandle};

/// The set of selected schedule items, in selection order.
#[derive(Debug, Default)]
pub struct Selection {
    items: Vec<WeakItemHandle>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `item`. Without `extend`, the previous selection is cleared first.
    pub fn select(&mut self, item: &ItemHandle, extend: bool) {
        if !extend {
            self.deselect_all();
        }
        if self.is_selected(item) {
            return;
        }
        self.items.push(item.downgrade());
        item.borrow_mut().set_selected(true);
    }

    /// Removes `item` from the selection.
    pub fn deselect(&mut self, item: &ItemHandle) {
        let before = self.items.len();
        self.items.retain(|w| !w.points_to(item));
        if self.items.len() != before {
            item.borrow_mut().set_selected(false);
        }
    }

    /// Clears the selection.
    pub fn deselect_all(&mut self) {
        for item in self.items.drain(..).filter_map(|w| w.upgrade()) {
            item.borrow_mut().set_selected(false);
        }
    }

    pub fn is_selected(&self, item: &ItemHandle) -> bool {
        self.items.iter().any(|w| w.points_to(item))
    }

    /// Live selected items, in selection order.
    pub fn items(&self) -> Vec<ItemHandle> {
        self.items.iter().filter_map(WeakItemHandle::upgrade).collect()
    }

    /// Number of live selected items.
    pub fn count(&self) -> usize {
        self.items.iter().filter(|w| w.upgrade().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
