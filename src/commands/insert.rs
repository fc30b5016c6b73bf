//! Inserting items into a schedule.
//!
//! [`InsertScheduleItemsCommand`] links a batch of items at a list index,
//! chaining their start frames from a cursor. The "anywhere" variant takes
//! a frame instead and prepares the batch with an [`InsertionPlan`]:
//!
//! - A frame strictly inside an item splits it. The item keeps the head,
//!   a copy filtered to the remaining frames is appended to the batch.
//! - A frame past the end of a non-empty schedule gets a leading filler
//!   gap so the new items keep their place on the timeline.

use std::collections::HashSet;

use log::{debug, warn};

use super::{Command, CommandKind, LayoutSnapshot, ScheduleDocument};
use crate::error::{EditError, EditResult};
use crate::models::{ItemHandle, Schedule, ScheduleItem, Selection};

fn batch_name(count: usize) -> String {
    if count == 1 {
        "Insert Schedule Item".to_string()
    } else {
        "Insert Schedule Items".to_string()
    }
}

/// Links `items` at `index..`, starting at `start_frame`.
///
/// On failure every item linked so far is unlinked again.
fn link_items(
    schedule: &mut Schedule,
    selection: &mut Selection,
    items: &[ItemHandle],
    index: usize,
    start_frame: u64,
) -> EditResult<()> {
    let mut cursor = start_frame;
    for (k, handle) in items.iter().enumerate() {
        {
            let mut item = handle.borrow_mut();
            let start = item.filter_start_frame(cursor);
            item.set_start_frame(start);
        }
        if let Err(err) = schedule.add_item(handle.clone(), index + k) {
            warn!("cannot insert schedule item {k} of {}: {err}", items.len());
            for inserted in items[..k].iter().rev() {
                schedule.remove_item(inserted);
                selection.deselect(inserted);
            }
            return Err(err);
        }
        cursor = handle.borrow().end_frame();
        selection.select(handle, k > 0);
    }
    Ok(())
}

/// Unlinks `items` in reverse order.
fn unlink_items(
    schedule: &mut Schedule,
    selection: &mut Selection,
    items: &[ItemHandle],
) -> EditResult<()> {
    for item in items.iter().rev() {
        if schedule.remove_item(item).is_none() {
            return Err(EditError::MismatchedValues(
                "inserted item is no longer part of the schedule".into(),
            ));
        }
        selection.deselect(item);
    }
    Ok(())
}

fn check_batch(items: &[ItemHandle]) -> EditResult<()> {
    if items.is_empty() {
        return Err(EditError::InitCheck("no items to insert".into()));
    }
    let mut seen = HashSet::with_capacity(items.len());
    if !items.iter().all(|item| seen.insert(item)) {
        return Err(EditError::InitCheck("item inserted twice".into()));
    }
    Ok(())
}

/// Inserts a batch of items at a list index.
#[derive(Debug)]
pub struct InsertScheduleItemsCommand {
    items: Vec<ItemHandle>,
    index: usize,
    start_frame: u64,
    layout: LayoutSnapshot,
}

impl InsertScheduleItemsCommand {
    /// Creates a command inserting `items` at `index`, the first starting at
    /// `start_frame` and each following one where its predecessor ends.
    pub fn new(items: Vec<ItemHandle>, index: usize, start_frame: u64) -> Self {
        Self {
            items,
            index,
            start_frame,
            layout: LayoutSnapshot::default(),
        }
    }

    pub fn items(&self) -> &[ItemHandle] {
        &self.items
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }
}

impl Command for InsertScheduleItemsCommand {
    fn init_check(&self) -> EditResult<()> {
        check_batch(&self.items)
    }

    fn perform(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        debug!(
            "inserting {} item(s) at index {}",
            self.items.len(),
            self.index
        );
        self.layout = LayoutSnapshot::capture(&doc.schedule);
        let mut block = doc.schedule.start_notification_block();
        link_items(
            &mut block,
            &mut doc.selection,
            &self.items,
            self.index,
            self.start_frame,
        )?;
        block.sanitize_start_frames();
        Ok(())
    }

    fn undo(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        let mut block = doc.schedule.start_notification_block();
        let result = unlink_items(&mut block, &mut doc.selection, &self.items);
        self.layout.restore();
        block.sanitize_start_frames();
        result
    }

    fn name(&self) -> String {
        batch_name(self.items.len())
    }

    fn kind(&self) -> CommandKind {
        CommandKind::InsertItems
    }
}

/// The item an insertion point falls inside of.
#[derive(Debug, Clone)]
struct Split {
    item: ItemHandle,
    head_duration: u64,
    original_duration: u64,
    original_repeats: u16,
}

/// A finalized insertion batch: where it goes and which items it holds,
/// including a synthesized filler gap or split tail.
#[derive(Debug, Clone)]
pub struct InsertionPlan {
    items: Vec<ItemHandle>,
    index: usize,
    start_frame: u64,
    requested: usize,
    filler: Option<ItemHandle>,
    split: Option<Split>,
}

impl InsertionPlan {
    /// Plans inserting `items` at `frame` of `schedule`.
    pub fn new(schedule: &Schedule, items: Vec<ItemHandle>, frame: u64) -> Self {
        let requested = items.len();
        let end = schedule.end_frame();

        if !schedule.is_empty() && frame > end {
            let filler = ScheduleItem::gap(frame - end)
                .with_flexible_duration(true)
                .into_handle();
            let mut batch = Vec::with_capacity(requested + 1);
            batch.push(filler.clone());
            batch.extend(items);
            return Self {
                items: batch,
                index: schedule.count_items(),
                start_frame: end,
                requested,
                filler: Some(filler),
                split: None,
            };
        }

        if let Some(index) = schedule.index_at_frame(frame) {
            let target = &schedule.items()[index];
            let inside = {
                let item = target.borrow();
                item.start_frame() < frame && frame < item.end_frame()
            };
            if inside {
                let (split, tail) = Self::split_at(target, frame);
                let mut batch = items;
                batch.push(tail);
                return Self {
                    items: batch,
                    index: index + 1,
                    start_frame: frame,
                    requested,
                    filler: None,
                    split: Some(split),
                };
            }
        }

        Self {
            items,
            index: schedule.insert_index_at_frame(frame),
            start_frame: frame,
            requested,
            filler: None,
            split: None,
        }
    }

    fn split_at(target: &ItemHandle, frame: u64) -> (Split, ItemHandle) {
        let item = target.borrow();
        let split = Split {
            item: target.clone(),
            head_duration: frame - item.start_frame(),
            original_duration: item.duration(),
            original_repeats: item.explicit_repeats(),
        };
        let mut tail = item.duplicate();
        tail.resize(item.end_frame() - frame);
        (split, tail.into_handle())
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[ItemHandle] {
        &self.items
    }

    /// List index of the first inserted item.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Start frame of the first inserted item.
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// The synthesized leading gap, if the frame lay past the schedule end.
    pub fn filler(&self) -> Option<&ItemHandle> {
        self.filler.as_ref()
    }

    /// The item being split, if the frame lay inside one.
    pub fn split_item(&self) -> Option<&ItemHandle> {
        self.split.as_ref().map(|s| &s.item)
    }

    /// The synthesized trailing part of a split item.
    pub fn split_tail(&self) -> Option<&ItemHandle> {
        self.split.as_ref().and_then(|_| self.items.last())
    }
}

/// Inserts items at a frame, splitting an item or adding a filler gap as
/// needed.
#[derive(Debug)]
pub struct InsertScheduleItemsAnywhereCommand {
    plan: InsertionPlan,
    layout: LayoutSnapshot,
}

impl InsertScheduleItemsAnywhereCommand {
    /// Creates a command inserting `items` at `frame` of `schedule`.
    pub fn new(schedule: &Schedule, items: Vec<ItemHandle>, frame: u64) -> Self {
        Self::from_plan(InsertionPlan::new(schedule, items, frame))
    }

    pub fn from_plan(plan: InsertionPlan) -> Self {
        Self {
            plan,
            layout: LayoutSnapshot::default(),
        }
    }

    pub fn plan(&self) -> &InsertionPlan {
        &self.plan
    }

    fn restore_split(&self) {
        if let Some(split) = &self.plan.split {
            let mut item = split.item.borrow_mut();
            item.set_explicit_repeats(split.original_repeats);
            item.set_duration(split.original_duration);
        }
    }
}

impl Command for InsertScheduleItemsAnywhereCommand {
    fn init_check(&self) -> EditResult<()> {
        if self.plan.requested == 0 {
            return Err(EditError::InitCheck("no items to insert".into()));
        }
        check_batch(&self.plan.items)
    }

    fn perform(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        let plan = &self.plan;
        debug!(
            "inserting {} item(s) at frame {} (index {}, split: {}, filler: {})",
            plan.requested,
            plan.start_frame,
            plan.index,
            plan.split.is_some(),
            plan.filler.is_some()
        );

        self.layout = LayoutSnapshot::capture(&doc.schedule);
        let mut block = doc.schedule.start_notification_block();
        if let Some(split) = &plan.split {
            if !block.has_item(&split.item) {
                return Err(EditError::MismatchedValues(
                    "split item is not part of the schedule".into(),
                ));
            }
            split.item.borrow_mut().resize(split.head_duration);
        }
        if let Err(err) = link_items(
            &mut block,
            &mut doc.selection,
            &plan.items,
            plan.index,
            plan.start_frame,
        ) {
            self.restore_split();
            return Err(err);
        }
        block.sanitize_start_frames();
        Ok(())
    }

    fn undo(&mut self, doc: &mut ScheduleDocument) -> EditResult<()> {
        let mut block = doc.schedule.start_notification_block();
        let result = unlink_items(&mut block, &mut doc.selection, &self.plan.items);
        // Covers the split head as well
        self.layout.restore();
        block.sanitize_start_frames();
        result
    }

    fn name(&self) -> String {
        batch_name(self.plan.requested)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::InsertItemsAnywhere
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Playlist, ScheduleObserver};
    use std::cell::RefCell;
    use std::rc::Rc;

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

    fn frames(s: &Schedule) -> Vec<(u64, u64)> {
        s.items()
            .iter()
            .map(|i| {
                let i = i.borrow();
                (i.start_frame(), i.duration())
            })
            .collect()
    }

    fn playlist(duration: u64) -> Rc<Playlist> {
        Playlist::new("P", "P", duration).shared()
    }

    #[test]
    fn test_insert_at_index_chains_and_selects() {
        let mut doc = ScheduleDocument::default();
        let a = ScheduleItem::gap(100).into_handle();
        let b = ScheduleItem::gap(200).into_handle();
        let mut cmd = InsertScheduleItemsCommand::new(vec![a.clone(), b.clone()], 0, 50);
        cmd.init_check().unwrap();
        cmd.perform(&mut doc).unwrap();

        assert_eq!(frames(&doc.schedule), vec![(50, 100), (150, 200)]);
        assert_eq!(doc.selection.items(), vec![a.clone(), b.clone()]);
        assert_eq!(cmd.name(), "Insert Schedule Items");

        cmd.undo(&mut doc).unwrap();
        assert!(doc.schedule.is_empty());
        assert!(doc.selection.is_empty());
        assert!(!a.borrow().is_selected());
    }

    #[test]
    fn test_insert_init_check() {
        let cmd = InsertScheduleItemsCommand::new(Vec::new(), 0, 0);
        assert!(matches!(cmd.init_check(), Err(EditError::InitCheck(_))));

        let a = ScheduleItem::gap(1).into_handle();
        let cmd = InsertScheduleItemsCommand::new(vec![a.clone(), a], 0, 0);
        assert!(matches!(cmd.init_check(), Err(EditError::InitCheck(_))));
    }

    #[test]
    fn test_failed_insert_rolls_back() {
        let mut doc = ScheduleDocument::default();
        let existing = ScheduleItem::gap(100).into_handle();
        doc.schedule.append_item(existing.clone()).unwrap();

        let fresh = ScheduleItem::gap(10).into_handle();
        let mut cmd = InsertScheduleItemsCommand::new(vec![fresh.clone(), existing.clone()], 1, 0);
        cmd.init_check().unwrap();
        let err = cmd.perform(&mut doc).unwrap_err();

        assert!(matches!(err, EditError::ItemAlreadyInSchedule));
        assert_eq!(doc.schedule.items(), &[existing]);
        assert!(!doc.selection.is_selected(&fresh));
    }

    #[test]
    fn test_undo_of_missing_item_is_mismatch() {
        let mut doc = ScheduleDocument::default();
        let a = ScheduleItem::gap(10).into_handle();
        let mut cmd = InsertScheduleItemsCommand::new(vec![a.clone()], 0, 0);
        cmd.perform(&mut doc).unwrap();
        doc.schedule.remove_item(&a);
        let err = cmd.undo(&mut doc).unwrap_err();
        assert!(matches!(err, EditError::MismatchedValues(_)));
    }

    #[test]
    fn test_anywhere_into_empty_schedule() {
        let p = playlist(1000);
        let mut doc = ScheduleDocument::default();
        let a = ScheduleItem::for_playlist(&p).into_handle();
        let mut cmd = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![a.clone()], 0);
        assert!(cmd.plan().filler().is_none());
        assert!(cmd.plan().split_item().is_none());
        cmd.perform(&mut doc).unwrap();
        assert_eq!(frames(&doc.schedule), vec![(0, 1000)]);
        assert_eq!(cmd.name(), "Insert Schedule Item");
    }

    #[test]
    fn test_anywhere_past_end_adds_filler() {
        let p = playlist(1000);
        let mut doc = ScheduleDocument::default();
        let a = ScheduleItem::for_playlist(&p).into_handle();
        InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![a.clone()], 0)
            .perform(&mut doc)
            .unwrap();

        let b = ScheduleItem::gap(500).into_handle();
        let mut cmd = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![b.clone()], 2000);
        let filler = cmd.plan().filler().cloned().unwrap();
        assert_eq!(cmd.plan().index(), 1);
        assert_eq!(cmd.plan().start_frame(), 1000);
        cmd.init_check().unwrap();
        cmd.perform(&mut doc).unwrap();

        assert_eq!(
            frames(&doc.schedule),
            vec![(0, 1000), (1000, 1000), (2000, 500)]
        );
        assert_eq!(doc.schedule.items()[1], filler);
        assert!(filler.borrow().playlist().is_none());
        assert!(doc.schedule.problem_ranges().is_empty());
        // The filler is selected along with the requested item
        assert_eq!(doc.selection.items(), vec![filler, b]);

        cmd.undo(&mut doc).unwrap();
        assert_eq!(doc.schedule.items(), &[a]);
    }

    #[test]
    fn test_anywhere_splits_gap_item() {
        let mut doc = ScheduleDocument::default();
        let long = ScheduleItem::gap(1000).into_handle();
        doc.schedule.append_item(long.clone()).unwrap();

        let b = ScheduleItem::gap(200).into_handle();
        let mut cmd = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![b.clone()], 400);
        assert_eq!(cmd.plan().split_item(), Some(&long));
        let tail = cmd.plan().split_tail().cloned().unwrap();
        assert_eq!(tail.borrow().duration(), 600);

        cmd.perform(&mut doc).unwrap();
        assert_eq!(
            frames(&doc.schedule),
            vec![(0, 400), (400, 200), (600, 600)]
        );
        assert_eq!(doc.schedule.items(), &[long.clone(), b, tail]);

        cmd.undo(&mut doc).unwrap();
        assert_eq!(doc.schedule.items(), &[long.clone()]);
        assert_eq!(frames(&doc.schedule), vec![(0, 1000)]);
    }

    #[test]
    fn test_anywhere_split_round_trip_restores_repeats() {
        let p = playlist(1000);
        let mut doc = ScheduleDocument::default();
        let item = ScheduleItem::for_playlist(&p).with_repeats(3).into_handle();
        doc.schedule.append_item(item.clone()).unwrap();
        let before = item.borrow().properties();

        let b = ScheduleItem::gap(250).into_handle();
        let mut cmd = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![b], 1000);
        cmd.perform(&mut doc).unwrap();
        assert_eq!(
            frames(&doc.schedule),
            vec![(0, 1000), (1000, 250), (1250, 2000)]
        );
        assert_eq!(item.borrow().explicit_repeats(), 1);
        assert_eq!(doc.schedule.items()[2].borrow().explicit_repeats(), 2);

        cmd.undo(&mut doc).unwrap();
        assert_eq!(doc.schedule.count_items(), 1);
        assert_eq!(item.borrow().properties(), before);

        // Redo re-applies the same split
        cmd.redo(&mut doc).unwrap();
        assert_eq!(doc.schedule.count_items(), 3);
        assert_eq!(item.borrow().duration(), 1000);
    }

    #[test]
    fn test_anywhere_at_item_boundary_does_not_split() {
        let mut doc = ScheduleDocument::default();
        let a = ScheduleItem::gap(1000).into_handle();
        let c = ScheduleItem::gap(1000).into_handle();
        doc.schedule.append_item(a.clone()).unwrap();
        doc.schedule.append_item(c.clone()).unwrap();
        doc.schedule.sanitize_start_frames();

        let b = ScheduleItem::gap(10).into_handle();
        let mut cmd = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![b.clone()], 1000);
        assert!(cmd.plan().split_item().is_none());
        assert_eq!(cmd.plan().index(), 1);
        cmd.perform(&mut doc).unwrap();
        assert_eq!(doc.schedule.items(), &[a, b, c]);
    }

    #[test]
    fn test_anywhere_init_check_requires_items() {
        let doc = ScheduleDocument::default();
        let cmd = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, Vec::new(), 0);
        assert!(cmd.init_check().is_err());
    }

    #[test]
    fn test_batch_insert_lays_out_once() {
        let rec = Rc::new(Recorder::default());
        let mut doc = ScheduleDocument::default();
        doc.schedule.add_observer(rec.clone());

        let items: Vec<_> = (1..=3)
            .map(|n| ScheduleItem::gap(100 * n).into_handle())
            .collect();
        let mut cmd = InsertScheduleItemsCommand::new(items, 0, 0);
        cmd.perform(&mut doc).unwrap();
        assert_eq!(
            rec.take(),
            vec!["started", "added 0", "added 1", "added 2", "finished", "layouted"]
        );

        cmd.undo(&mut doc).unwrap();
        assert_eq!(
            rec.take(),
            vec!["started", "removed", "removed", "removed", "finished", "layouted"]
        );
    }

    #[test]
    fn test_split_insert_lays_out_once() {
        let rec = Rc::new(Recorder::default());
        let mut doc = ScheduleDocument::default();
        doc.schedule
            .append_item(ScheduleItem::gap(1000).into_handle())
            .unwrap();
        doc.schedule.add_observer(rec.clone());

        let b = ScheduleItem::gap(200).into_handle();
        let mut cmd = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![b], 400);
        cmd.perform(&mut doc).unwrap();
        let events = rec.take();
        assert_eq!(events.iter().filter(|e| *e == "layouted").count(), 1);
        assert_eq!(events.iter().filter(|e| *e == "started").count(), 1);
        assert_eq!(events.last().map(String::as_str), Some("layouted"));

        cmd.undo(&mut doc).unwrap();
        let events = rec.take();
        assert_eq!(events.iter().filter(|e| *e == "layouted").count(), 1);
        assert_eq!(events.iter().filter(|e| *e == "removed").count(), 2);
    }

    #[test]
    fn test_anywhere_undo_returns_pushed_pinned_item() {
        let mut doc = ScheduleDocument::default();
        let anchor = ScheduleItem::gap(1000)
            .with_flexible_start_frame(false)
            .into_handle();
        let pinned = ScheduleItem::gap(500)
            .with_start_frame(2000)
            .with_flexible_start_frame(false)
            .into_handle();
        doc.schedule.append_item(anchor.clone()).unwrap();
        doc.schedule.append_item(pinned.clone()).unwrap();
        doc.schedule.sanitize_start_frames();
        assert_eq!(frames(&doc.schedule), vec![(0, 1000), (2000, 500)]);
        let before = pinned.borrow().properties();

        let filler = ScheduleItem::gap(1500).into_handle();
        let mut cmd = InsertScheduleItemsAnywhereCommand::new(&doc.schedule, vec![filler], 1000);
        cmd.perform(&mut doc).unwrap();
        // Overlapped by the new item, the pinned one moves down
        assert_eq!(
            frames(&doc.schedule),
            vec![(0, 1000), (1000, 1500), (2500, 500)]
        );

        cmd.undo(&mut doc).unwrap();
        assert_eq!(frames(&doc.schedule), vec![(0, 1000), (2000, 500)]);
        assert_eq!(pinned.borrow().properties(), before);

        cmd.redo(&mut doc).unwrap();
        assert_eq!(pinned.borrow().start_frame(), 2500);
    }

    #[test]
    fn test_insert_undo_keeps_flexible_neighbour_size() {
        let mut doc = ScheduleDocument::default();
        let stretchy = ScheduleItem::gap(100)
            .with_flexible_duration(true)
            .into_handle();
        let pinned = ScheduleItem::gap(100)
            .with_start_frame(1000)
            .with_flexible_start_frame(false)
            .into_handle();
        doc.schedule.append_item(stretchy.clone()).unwrap();
        doc.schedule.append_item(pinned.clone()).unwrap();
        doc.schedule.sanitize_start_frames();
        assert_eq!(frames(&doc.schedule), vec![(0, 1000), (1000, 100)]);

        let middle = ScheduleItem::gap(300).into_handle();
        let mut cmd = InsertScheduleItemsCommand::new(vec![middle], 1, 1000);
        cmd.perform(&mut doc).unwrap();
        assert_eq!(
            frames(&doc.schedule),
            vec![(0, 1000), (1000, 300), (1300, 100)]
        );

        // The pin returns to 1000 instead of the flexible item growing
        // into the gap the removed item leaves
        cmd.undo(&mut doc).unwrap();
        assert_eq!(frames(&doc.schedule), vec![(0, 1000), (1000, 100)]);
        assert_eq!(stretchy.borrow().duration(), 1000);
    }
}
