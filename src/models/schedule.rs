//! Schedule model.
//!
//! A schedule is the ordered list of items that make up one broadcast day.
//! List order is playback order; after a layout pass start frames are
//! non-decreasing along the list, which the frame lookups rely on.
//!
//! # Notification blocks
//!
//! Every mutating operation runs inside a [`NotificationBlock`]. Blocks
//! nest; observers hear `notification_block_started` when the outermost
//! block opens, and `notification_block_finished` followed by at most one
//! `items_layouted` when it closes. A command that inserts three items and
//! re-lays out the schedule therefore triggers a single view re-layout.

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::time::{Duration, Instant};

use jiff::civil::Date;
use log::trace;

use super::{timecode, Activation, ItemHandle, ScheduleObserver};
use crate::config::EditorConfig;
use crate::error::{EditError, EditResult};
use crate::layout::{self, GeneratedPlaylist, ProblemRange};

/// An ordered, layout-managed list of schedule items.
pub struct Schedule {
    name: String,
    activation: Activation,
    items: Vec<ItemHandle>,
    observers: Vec<Rc<dyn ScheduleObserver>>,
    notification_depth: usize,
    layout_dirty: bool,
    current_index_ttl: Duration,
    current_index_cache: Cell<Option<(Instant, Option<usize>)>>,
}

impl Schedule {
    /// Creates an empty schedule active every day.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            activation: Activation::default(),
            items: Vec::new(),
            observers: Vec::new(),
            notification_depth: 0,
            layout_dirty: false,
            current_index_ttl: EditorConfig::default().current_index_ttl(),
            current_index_cache: Cell::new(None),
        }
    }

    /// Sets the schedule name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the activation.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Applies editor configuration.
    pub fn with_config(mut self, config: &EditorConfig) -> Self {
        self.current_index_ttl = config.current_index_ttl();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
    }

    /// Whether the schedule is on air on `date`.
    pub fn is_active_on(&self, date: Date) -> bool {
        self.activation.is_active_on(date)
    }

    /// Registers an observer.
    pub fn add_observer(&mut self, observer: Rc<dyn ScheduleObserver>) {
        self.observers.push(observer);
    }

    /// Unregisters an observer. Returns whether it was registered.
    pub fn remove_observer(&mut self, observer: &Rc<dyn ScheduleObserver>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !Rc::ptr_eq(o, observer));
        self.observers.len() != before
    }

    // ------------------------------------------------------------------
    // Notification blocks
    // ------------------------------------------------------------------

    /// Opens a notification block. Observers are batched until every block
    /// opened on this schedule has been dropped.
    pub fn start_notification_block(&mut self) -> NotificationBlock<'_> {
        if self.notification_depth == 0 {
            self.notify(|o| o.notification_block_started());
        }
        self.notification_depth += 1;
        NotificationBlock { schedule: self }
    }

    /// Current nesting depth of notification blocks.
    pub fn notification_depth(&self) -> usize {
        self.notification_depth
    }

    fn finish_notification_block(&mut self) {
        self.notification_depth -= 1;
        if self.notification_depth > 0 {
            return;
        }
        self.notify(|o| o.notification_block_finished());
        if std::mem::take(&mut self.layout_dirty) {
            self.notify(|o| o.items_layouted());
        }
    }

    fn notify(&self, f: impl Fn(&dyn ScheduleObserver)) {
        for observer in &self.observers {
            f(observer.as_ref());
        }
    }

    fn mark_layout_changed(&mut self) {
        self.layout_dirty = true;
        self.current_index_cache.set(None);
    }

    // ------------------------------------------------------------------
    // List access
    // ------------------------------------------------------------------

    pub fn items(&self) -> &[ItemHandle] {
        &self.items
    }

    pub fn count_items(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_at(&self, index: usize) -> Option<&ItemHandle> {
        self.items.get(index)
    }

    pub fn index_of(&self, item: &ItemHandle) -> Option<usize> {
        self.items.iter().position(|i| i.ptr_eq(item))
    }

    pub fn has_item(&self, item: &ItemHandle) -> bool {
        self.index_of(item).is_some()
    }

    /// End frame of the last item (0 when empty).
    pub fn end_frame(&self) -> u64 {
        self.items
            .last()
            .map(|item| item.borrow().end_frame())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // List mutation
    // ------------------------------------------------------------------

    /// Links `item` into the list at `index` (clamped to the list length).
    ///
    /// On failure the list is unchanged.
    pub fn add_item(&mut self, item: ItemHandle, index: usize) -> EditResult<()> {
        if self.has_item(&item) {
            return Err(EditError::ItemAlreadyInSchedule);
        }
        self.items
            .try_reserve(1)
            .map_err(|_| EditError::NoMemory {
                context: "add schedule item",
            })?;

        let mut block = self.start_notification_block();
        let index = index.min(block.items.len());
        block.items.insert(index, item.clone());
        trace!("schedule item added at index {index}");
        block.notify(|o| o.item_added(&item, index));
        block.mark_layout_changed();
        Ok(())
    }

    /// Appends `item` at the end of the list.
    pub fn append_item(&mut self, item: ItemHandle) -> EditResult<()> {
        let index = self.items.len();
        self.add_item(item, index)
    }

    /// Unlinks `item`. The caller receives the schedule's reference.
    pub fn remove_item(&mut self, item: &ItemHandle) -> Option<ItemHandle> {
        let index = self.index_of(item)?;
        self.remove_item_at(index)
    }

    /// Unlinks the item at `index`.
    pub fn remove_item_at(&mut self, index: usize) -> Option<ItemHandle> {
        if index >= self.items.len() {
            return None;
        }
        let mut block = self.start_notification_block();
        let item = block.items.remove(index);
        trace!("schedule item removed from index {index}");
        block.notify(|o| o.item_removed(&item));
        block.mark_layout_changed();
        Some(item)
    }

    /// Removes every item.
    pub fn make_empty(&mut self) -> Vec<ItemHandle> {
        let mut block = self.start_notification_block();
        let mut removed = Vec::with_capacity(block.items.len());
        while let Some(item) = block.items.pop() {
            block.notify(|o| o.item_removed(&item));
            removed.push(item);
        }
        removed.reverse();
        block.mark_layout_changed();
        removed
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    /// Re-derives start frames and durations so items chain without
    /// overlap, honoring pinned start frames where possible.
    ///
    /// See [`crate::layout`] for the algorithm.
    pub fn sanitize_start_frames(&mut self) {
        let mut block = self.start_notification_block();
        layout::sanitize_items(&block.items);
        block.mark_layout_changed();
    }

    /// Gaps, overlaps and day overruns in the current layout.
    pub fn problem_ranges(&self) -> Vec<ProblemRange> {
        layout::problem_ranges(&self.items)
    }

    /// Flattens `[start_frame, end_frame)` into playable entries.
    ///
    /// With `offset_to_zero`, entry start frames are relative to `start_frame`.
    pub fn generate_playlist(
        &self,
        start_frame: u64,
        end_frame: u64,
        offset_to_zero: bool,
    ) -> EditResult<GeneratedPlaylist> {
        if end_frame < start_frame {
            return Err(EditError::InvalidRange {
                start_frame,
                end_frame,
            });
        }
        let first = self
            .index_at_frame(start_frame)
            .unwrap_or_else(|| self.insert_index_at_frame(start_frame));
        layout::generate_playlist(&self.items[first..], start_frame, end_frame, offset_to_zero)
    }

    // ------------------------------------------------------------------
    // Frame lookup
    // ------------------------------------------------------------------

    /// First index whose start frame is `>= frame` (binary search).
    ///
    /// Assumes non-decreasing start frames, i.e. a laid-out schedule.
    pub fn insert_index_at_frame(&self, frame: u64) -> usize {
        self.items
            .partition_point(|item| item.borrow().start_frame() < frame)
    }

    /// Index of the item playing at `frame`, if any.
    ///
    /// Returns `None` before the first item and in the gap after an item
    /// whose end lies before `frame`.
    pub fn index_at_frame(&self, frame: u64) -> Option<usize> {
        let index = self.insert_index_at_frame(frame.saturating_add(1)).checked_sub(1)?;
        let item = self.items[index].borrow();
        if item.end_frame() < frame {
            None
        } else {
            Some(index)
        }
    }

    /// Index of the item playing now, by local wall-clock time of day.
    pub fn index_at_current_time(&self) -> Option<usize> {
        let frame = timecode::frame_of_day(jiff::Zoned::now().time());
        self.index_at_frame_cached(frame, Instant::now())
    }

    /// Memoized [`Self::index_at_frame`]: a result younger than the cache
    /// TTL is returned regardless of `frame`.
    pub fn index_at_frame_cached(&self, frame: u64, now: Instant) -> Option<usize> {
        if let Some((stamp, index)) = self.current_index_cache.get() {
            if now.saturating_duration_since(stamp) < self.current_index_ttl {
                return index;
            }
        }
        let index = self.index_at_frame(frame);
        self.current_index_cache.set(Some((now, index)));
        index
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("name", &self.name)
            .field("activation", &self.activation)
            .field("items", &self.items)
            .field("observers", &self.observers.len())
            .field("notification_depth", &self.notification_depth)
            .finish()
    }
}

/// Scope guard for a notification block.
///
/// Dereferences to the schedule so nested operations run through it.
/// Dropping the guard closes the block.
pub struct NotificationBlock<'a> {
    schedule: &'a mut Schedule,
}

impl Deref for NotificationBlock<'_> {
    type Target = Schedule;

    fn deref(&self) -> &Schedule {
        self.schedule
    }
}

impl DerefMut for NotificationBlock<'_> {
    fn deref_mut(&mut self) -> &mut Schedule {
        self.schedule
    }
}

impl Drop for NotificationBlock<'_> {
    fn drop(&mut self) {
        self.schedule.finish_notification_block();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Playlist, ScheduleItem};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.borrow_mut())
        }
    }

    impl ScheduleObserver for Recorder {
        fn item_added(&self, _item: &ItemHandle, index: usize) {
            self.events.borrow_mut().push(format!("added {index}"));
        }
        fn item_removed(&self, _item: &ItemHandle) {
            self.events.borrow_mut().push("removed".into());
        }
        fn items_layouted(&self) {
            self.events.borrow_mut().push("layouted".into());
        }
        fn notification_block_started(&self) {
            self.events.borrow_mut().push("started".into());
        }
        fn notification_block_finished(&self) {
            self.events.borrow_mut().push("finished".into());
        }
    }

    fn gap(start: u64, duration: u64) -> ItemHandle {
        ScheduleItem::gap(duration)
            .with_start_frame(start)
            .into_handle()
    }

    /// Items at [0,1000), [1000,1500), [2000,2500).
    fn laid_out() -> Schedule {
        let mut s = Schedule::new();
        s.append_item(gap(0, 1000)).unwrap();
        s.append_item(gap(1000, 500)).unwrap();
        s.append_item(gap(2000, 500)).unwrap();
        s
    }

    #[test]
    fn test_add_and_remove() {
        let mut s = Schedule::new();
        let a = gap(0, 10);
        let b = gap(10, 10);
        s.append_item(a.clone()).unwrap();
        s.add_item(b.clone(), 0).unwrap();
        assert_eq!(s.count_items(), 2);
        assert_eq!(s.index_of(&b), Some(0));
        assert_eq!(s.index_of(&a), Some(1));

        let removed = s.remove_item(&b).unwrap();
        assert_eq!(removed, b);
        assert!(!s.has_item(&b));
        assert!(s.remove_item(&b).is_none());
        assert!(s.remove_item_at(5).is_none());
    }

    #[test]
    fn test_add_index_clamped() {
        let mut s = Schedule::new();
        s.add_item(gap(0, 10), 42).unwrap();
        assert_eq!(s.count_items(), 1);
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut s = Schedule::new();
        let a = gap(0, 10);
        s.append_item(a.clone()).unwrap();
        let err = s.append_item(a).unwrap_err();
        assert!(matches!(err, EditError::ItemAlreadyInSchedule));
        assert_eq!(s.count_items(), 1);
    }

    #[test]
    fn test_make_empty_returns_in_order() {
        let mut s = laid_out();
        let first = s.item_at(0).unwrap().clone();
        let removed = s.make_empty();
        assert!(s.is_empty());
        assert_eq!(removed.len(), 3);
        assert_eq!(removed[0], first);
    }

    #[test]
    fn test_single_mutation_notifications() {
        let rec = Rc::new(Recorder::default());
        let mut s = Schedule::new();
        s.add_observer(rec.clone());

        s.append_item(gap(0, 10)).unwrap();
        assert_eq!(rec.take(), vec!["started", "added 0", "finished", "layouted"]);
    }

    #[test]
    fn test_nested_blocks_batch_layout() {
        let rec = Rc::new(Recorder::default());
        let mut s = Schedule::new();
        s.add_observer(rec.clone());

        {
            let mut block = s.start_notification_block();
            block.append_item(gap(0, 10)).unwrap();
            block.append_item(gap(10, 10)).unwrap();
            block.sanitize_start_frames();
            assert_eq!(block.notification_depth(), 1);
        }
        assert_eq!(s.notification_depth(), 0);

        let events = rec.take();
        assert_eq!(
            events,
            vec!["started", "added 0", "added 1", "finished", "layouted"]
        );
    }

    #[test]
    fn test_empty_block_does_not_layout() {
        let rec = Rc::new(Recorder::default());
        let mut s = Schedule::new();
        s.add_observer(rec.clone());
        drop(s.start_notification_block());
        assert_eq!(rec.take(), vec!["started", "finished"]);
    }

    #[test]
    fn test_remove_observer() {
        let rec = Rc::new(Recorder::default());
        let observer: Rc<dyn ScheduleObserver> = rec.clone();
        let mut s = Schedule::new();
        s.add_observer(observer.clone());
        assert!(s.remove_observer(&observer));
        assert!(!s.remove_observer(&observer));
        s.append_item(gap(0, 10)).unwrap();
        assert!(rec.take().is_empty());
    }

    #[test]
    fn test_insert_index_at_frame() {
        let s = laid_out();
        assert_eq!(s.insert_index_at_frame(0), 0);
        assert_eq!(s.insert_index_at_frame(1), 1);
        assert_eq!(s.insert_index_at_frame(1000), 1);
        assert_eq!(s.insert_index_at_frame(1001), 2);
        assert_eq!(s.insert_index_at_frame(5000), 3);
    }

    #[test]
    fn test_index_at_frame() {
        let s = laid_out();
        assert_eq!(s.index_at_frame(0), Some(0));
        assert_eq!(s.index_at_frame(999), Some(0));
        assert_eq!(s.index_at_frame(1000), Some(1));
        assert_eq!(s.index_at_frame(1499), Some(1));
        // Gap between 1500 and 2000
        assert_eq!(s.index_at_frame(1700), None);
        assert_eq!(s.index_at_frame(2100), Some(2));
        // Past the end of the day's last item
        assert_eq!(s.index_at_frame(9000), None);
    }

    #[test]
    fn test_index_at_frame_before_first_item() {
        let mut s = Schedule::new();
        s.append_item(gap(500, 100)).unwrap();
        assert_eq!(s.index_at_frame(100), None);
        assert_eq!(s.index_at_frame(550), Some(0));
        assert_eq!(Schedule::new().index_at_frame(0), None);
    }

    #[test]
    fn test_index_at_last_frame() {
        let s = laid_out();
        assert_eq!(s.index_at_frame(u64::MAX), None);
        let generated = s.generate_playlist(u64::MAX, u64::MAX, false).unwrap();
        assert!(generated.entries.is_empty());

        let mut open_ended = Schedule::new();
        open_ended.append_item(gap(10, u64::MAX)).unwrap();
        assert_eq!(open_ended.index_at_frame(u64::MAX), Some(0));
    }

    #[test]
    fn test_end_frame() {
        assert_eq!(Schedule::new().end_frame(), 0);
        assert_eq!(laid_out().end_frame(), 2500);
    }

    #[test]
    fn test_current_index_cache_ttl() {
        let s = laid_out();
        let t0 = Instant::now();
        assert_eq!(s.index_at_frame_cached(500, t0), Some(0));
        // Within TTL: cached answer regardless of frame
        assert_eq!(
            s.index_at_frame_cached(1200, t0 + Duration::from_millis(100)),
            Some(0)
        );
        // Expired
        assert_eq!(
            s.index_at_frame_cached(1200, t0 + Duration::from_millis(300)),
            Some(1)
        );
    }

    #[test]
    fn test_current_index_cache_invalidated_by_mutation() {
        let mut s = laid_out();
        let t0 = Instant::now();
        assert_eq!(s.index_at_frame_cached(500, t0), Some(0));
        s.remove_item_at(0);
        assert_eq!(s.index_at_frame_cached(500, t0), None);
    }

    #[test]
    fn test_current_index_ttl_from_config() {
        let config = EditorConfig::default().with_current_index_ttl_ms(0);
        let s = laid_out().with_config(&config);
        let t0 = Instant::now();
        assert_eq!(s.index_at_frame_cached(500, t0), Some(0));
        assert_eq!(s.index_at_frame_cached(1200, t0), Some(1));
    }

    #[test]
    fn test_index_at_current_time_is_consistent() {
        let mut s = Schedule::new();
        let whole_day = ScheduleItem::gap(timecode::FRAMES_PER_DAY).into_handle();
        s.append_item(whole_day).unwrap();
        assert_eq!(s.index_at_current_time(), Some(0));
    }

    #[test]
    fn test_metadata() {
        let mut s = Schedule::new().with_name("Weekdays");
        assert_eq!(s.name(), "Weekdays");
        assert!(s.is_active_on(jiff::civil::date(2024, 6, 1)));
        s.set_activation(Activation::Date {
            date: jiff::civil::date(2024, 6, 2),
        });
        assert!(!s.is_active_on(jiff::civil::date(2024, 6, 1)));
        s.set_name("Special");
        assert_eq!(s.name(), "Special");
    }

    #[test]
    fn test_generate_playlist_rejects_reversed_range() {
        let s = laid_out();
        let err = s.generate_playlist(100, 50, false).unwrap_err();
        assert!(matches!(
            err,
            EditError::InvalidRange {
                start_frame: 100,
                end_frame: 50
            }
        ));
    }

    #[test]
    fn test_schedule_keeps_playlist_items() {
        let p = Playlist::new("P1", "News", 250).shared();
        let mut s = Schedule::new();
        let item = ScheduleItem::for_playlist(&p).with_repeats(4).into_handle();
        s.append_item(item.clone()).unwrap();
        assert_eq!(s.end_frame(), 1000);
        // Schedule slot + local handle
        assert_eq!(item.holder_count(), 2);
    }
}
