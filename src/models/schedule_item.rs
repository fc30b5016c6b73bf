//! Schedule item model.
//!
//! A schedule item is one time-boxed entry on the day timeline: it plays a
//! playlist (or nothing, for a pause/gap) starting at a frame of the day for
//! a number of frames.
//!
//! # Flexibility
//!
//! Two flags control what the layout pass may do with an item:
//! - **Flexible start frame**: the item may be moved to close gaps or
//!   resolve overlaps. When clear, the start frame is pinned by the user.
//! - **Flexible duration**: the item may be stretched to fill a gap. When
//!   clear, the duration is `explicit_repeats × playlist duration`.
//!
//! An item with both flags clear is a *hard anchor*.
//!
//! # Sharing
//!
//! Items are shared between the schedule, the selection and undo commands
//! through [`ItemHandle`]. Equality of handles is identity.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use super::{ItemListener, Playlist};

/// A single entry of a schedule.
#[derive(Debug)]
pub struct ScheduleItem {
    playlist: Option<Weak<Playlist>>,
    start_frame: u64,
    duration: u64,
    explicit_repeats: u16,
    flexible_start_frame: bool,
    flexible_duration: bool,
    selected: bool,
    listeners: Vec<Weak<dyn ItemListener>>,
}

/// Snaps `duration` to the nearest non-zero multiple of `playlist_duration`.
///
/// Identity for zero `playlist_duration`. Zero stays zero.
pub(crate) fn snap_to_playlist(duration: u64, playlist_duration: u64) -> u64 {
    if playlist_duration == 0 || duration == 0 {
        return duration;
    }
    let remainder = duration % playlist_duration;
    let mut repeats = duration / playlist_duration;
    if remainder >= playlist_duration - remainder {
        repeats += 1;
    }
    repeats.max(1).saturating_mul(playlist_duration)
}

/// Repeat count represented by a snapped duration, clamped to `u16`.
pub(crate) fn repeats_for(duration: u64, playlist_duration: u64) -> u16 {
    if playlist_duration == 0 {
        return 0;
    }
    u16::try_from(duration / playlist_duration).unwrap_or(u16::MAX)
}

impl ScheduleItem {
    /// Creates an item playing `playlist` once, or an empty gap item.
    ///
    /// New items have a flexible start frame and an inflexible duration.
    pub fn new(playlist: Option<&Rc<Playlist>>) -> Self {
        Self {
            playlist: playlist.map(Rc::downgrade),
            start_frame: 0,
            duration: playlist.map(|p| p.duration()).unwrap_or(0),
            explicit_repeats: 1,
            flexible_start_frame: true,
            flexible_duration: false,
            selected: false,
            listeners: Vec::new(),
        }
    }

    /// Creates an item playing `playlist` once.
    pub fn for_playlist(playlist: &Rc<Playlist>) -> Self {
        Self::new(Some(playlist))
    }

    /// Creates a gap (pause) item of fixed duration.
    pub fn gap(duration: u64) -> Self {
        Self::new(None).with_duration(duration)
    }

    /// Sets the start frame.
    pub fn with_start_frame(mut self, start_frame: u64) -> Self {
        self.start_frame = start_frame;
        self
    }

    /// Sets the duration as given (unfiltered).
    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the repeat count and derives the duration from it.
    pub fn with_repeats(mut self, repeats: u16) -> Self {
        self.explicit_repeats = repeats;
        let playlist_duration = self.playlist_duration();
        if playlist_duration > 0 {
            self.duration = u64::from(repeats) * playlist_duration;
        }
        self
    }

    /// Sets the start-frame flexibility.
    pub fn with_flexible_start_frame(mut self, flexible: bool) -> Self {
        self.flexible_start_frame = flexible;
        self
    }

    /// Sets the duration flexibility.
    pub fn with_flexible_duration(mut self, flexible: bool) -> Self {
        self.flexible_duration = flexible;
        self
    }

    /// Wraps the item in a shared handle.
    pub fn into_handle(self) -> ItemHandle {
        ItemHandle::new(self)
    }

    /// Copies the item's fields into a new, unselected item without listeners.
    pub fn duplicate(&self) -> Self {
        Self {
            playlist: self.playlist.clone(),
            start_frame: self.start_frame,
            duration: self.duration,
            explicit_repeats: self.explicit_repeats,
            flexible_start_frame: self.flexible_start_frame,
            flexible_duration: self.flexible_duration,
            selected: false,
            listeners: Vec::new(),
        }
    }

    /// The referenced playlist, if any and still alive.
    pub fn playlist(&self) -> Option<Rc<Playlist>> {
        self.playlist.as_ref().and_then(Weak::upgrade)
    }

    /// Duration of the referenced playlist (0 for gap items).
    pub fn playlist_duration(&self) -> u64 {
        self.playlist().map(|p| p.duration()).unwrap_or(0)
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// First frame after the item (`start_frame + duration`, saturating).
    #[inline]
    pub fn end_frame(&self) -> u64 {
        self.start_frame.saturating_add(self.duration)
    }

    pub fn explicit_repeats(&self) -> u16 {
        self.explicit_repeats
    }

    pub fn flexible_start_frame(&self) -> bool {
        self.flexible_start_frame
    }

    pub fn flexible_duration(&self) -> bool {
        self.flexible_duration
    }

    /// Whether neither start frame nor duration may be changed by layout.
    pub fn is_hard_anchor(&self) -> bool {
        !self.flexible_start_frame && !self.flexible_duration
    }

    /// Selection membership, maintained by [`super::Selection`].
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Whether the frame falls within `[start_frame, end_frame)`.
    #[inline]
    pub fn contains_frame(&self, frame: u64) -> bool {
        frame >= self.start_frame && frame < self.end_frame()
    }

    /// Number of playlist repeats.
    ///
    /// For a flexible duration this is fractional (a partial last loop);
    /// otherwise it is the explicit repeat count.
    pub fn repeats(&self) -> f64 {
        let playlist_duration = self.playlist_duration();
        if self.flexible_duration && playlist_duration > 0 {
            self.duration as f64 / playlist_duration as f64
        } else {
            f64::from(self.explicit_repeats)
        }
    }

    /// Duration the item should have given its flags and playlist.
    ///
    /// `explicit_repeats × playlist duration` for an inflexible item with a
    /// playlist, otherwise the current duration.
    pub fn preferred_duration(&self) -> u64 {
        let playlist_duration = self.playlist_duration();
        if self.flexible_duration || playlist_duration == 0 {
            self.duration
        } else {
            u64::from(self.explicit_repeats) * playlist_duration
        }
    }

    /// Snaps a candidate duration to what this item accepts.
    ///
    /// Inflexible items with a playlist only take whole repeats (rounded,
    /// at least one for non-zero input). Does not modify the item.
    pub fn filter_duration(&self, duration: u64) -> u64 {
        if self.flexible_duration {
            return duration;
        }
        snap_to_playlist(duration, self.playlist_duration())
    }

    /// Snaps a candidate start frame to what this item accepts.
    ///
    /// Hook for grid snapping; currently every frame is accepted.
    pub fn filter_start_frame(&self, start_frame: u64) -> u64 {
        start_frame
    }

    /// Current field values.
    pub fn properties(&self) -> ItemProperties {
        ItemProperties {
            start_frame: self.start_frame,
            duration: self.duration,
            explicit_repeats: self.explicit_repeats,
            flexible_start_frame: self.flexible_start_frame,
            flexible_duration: self.flexible_duration,
        }
    }

    pub fn set_start_frame(&mut self, start_frame: u64) {
        if self.start_frame != start_frame {
            self.start_frame = start_frame;
            self.notify_changed();
        }
    }

    pub fn set_duration(&mut self, duration: u64) {
        if self.duration != duration {
            self.duration = duration;
            self.notify_changed();
        }
    }

    pub fn set_explicit_repeats(&mut self, repeats: u16) {
        if self.explicit_repeats != repeats {
            self.explicit_repeats = repeats;
            self.notify_changed();
        }
    }

    pub fn set_flexible_start_frame(&mut self, flexible: bool) {
        if self.flexible_start_frame != flexible {
            self.flexible_start_frame = flexible;
            self.notify_changed();
        }
    }

    /// Changes duration flexibility. Does not resize; the next layout pass does.
    pub fn set_flexible_duration(&mut self, flexible: bool) {
        if self.flexible_duration != flexible {
            self.flexible_duration = flexible;
            self.notify_changed();
        }
    }

    /// Filters and applies a duration, keeping the repeat count in step for
    /// inflexible playlist items so the layout pass does not undo it.
    pub fn resize(&mut self, duration: u64) {
        let duration = self.filter_duration(duration);
        let playlist_duration = self.playlist_duration();
        if !self.flexible_duration && playlist_duration > 0 {
            self.set_explicit_repeats(repeats_for(duration, playlist_duration));
        }
        self.set_duration(duration);
    }

    /// Writes `properties` back unfiltered, flags before values.
    pub fn set_properties(&mut self, properties: ItemProperties) {
        self.set_flexible_start_frame(properties.flexible_start_frame);
        self.set_flexible_duration(properties.flexible_duration);
        self.set_start_frame(properties.start_frame);
        self.set_explicit_repeats(properties.explicit_repeats);
        self.set_duration(properties.duration);
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        if self.selected != selected {
            self.selected = selected;
            self.notify_changed();
        }
    }

    /// Registers a listener. Held weakly; dropped listeners are pruned.
    pub fn add_listener(&mut self, listener: &Rc<dyn ItemListener>) {
        self.listeners.push(Rc::downgrade(listener));
    }

    fn notify_changed(&mut self) {
        self.listeners.retain(|l| l.strong_count() > 0);
        for listener in &self.listeners {
            if let Some(listener) = listener.upgrade() {
                listener.item_changed(self);
            }
        }
    }
}

/// Snapshot of an item's editable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProperties {
    pub start_frame: u64,
    pub duration: u64,
    pub explicit_repeats: u16,
    pub flexible_start_frame: bool,
    pub flexible_duration: bool,
}

impl ItemProperties {
    pub fn with_start_frame(mut self, start_frame: u64) -> Self {
        self.start_frame = start_frame;
        self
    }

    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_explicit_repeats(mut self, repeats: u16) -> Self {
        self.explicit_repeats = repeats;
        self
    }

    pub fn with_flexible_start_frame(mut self, flexible: bool) -> Self {
        self.flexible_start_frame = flexible;
        self
    }

    pub fn with_flexible_duration(mut self, flexible: bool) -> Self {
        self.flexible_duration = flexible;
        self
    }
}

/// Shared, identity-compared reference to a [`ScheduleItem`].
#[derive(Clone)]
pub struct ItemHandle(Rc<RefCell<ScheduleItem>>);

impl ItemHandle {
    pub fn new(item: ScheduleItem) -> Self {
        Self(Rc::new(RefCell::new(item)))
    }

    /// Immutably borrows the item.
    ///
    /// # Panics
    /// If the item is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, ScheduleItem> {
        self.0.borrow()
    }

    /// Mutably borrows the item.
    ///
    /// # Panics
    /// If the item is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, ScheduleItem> {
        self.0.borrow_mut()
    }

    /// Whether both handles refer to the same item.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakItemHandle {
        WeakItemHandle(Rc::downgrade(&self.0))
    }

    /// Number of strong holders (schedule slot, commands, callers).
    pub fn holder_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl PartialEq for ItemHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ItemHandle {}

impl Hash for ItemHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(item) => f
                .debug_struct("ItemHandle")
                .field("start_frame", &item.start_frame)
                .field("duration", &item.duration)
                .finish(),
            Err(_) => f.write_str("ItemHandle(<borrowed>)"),
        }
    }
}

/// Non-owning reference to a [`ScheduleItem`].
#[derive(Debug, Clone)]
pub struct WeakItemHandle(Weak<RefCell<ScheduleItem>>);

impl WeakItemHandle {
    pub fn upgrade(&self) -> Option<ItemHandle> {
        self.0.upgrade().map(ItemHandle)
    }

    /// Whether this refers to the same item as `handle`.
    pub fn points_to(&self, handle: &ItemHandle) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&handle.0))
    }
}
