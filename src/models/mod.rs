//! Schedule domain models.
//!
//! Provides the data types of a broadcast day: playlists, schedule items
//! with their flexibility flags, the schedule container itself, selection
//! and the observer interfaces views attach through.
//!
//! # Time Representation
//!
//! All times are integer frames of the day at 25 frames per second,
//! `0..FRAMES_PER_DAY`. Wall-clock dates only appear in [`Activation`].

mod activation;
mod observer;
mod playlist;
mod schedule;
mod schedule_item;
mod selection;
mod timecode;

pub use activation::{Activation, WeekDays};
pub use observer::{ItemListener, ScheduleObserver};
pub use playlist::{Playlist, PlaylistLibrary};
pub use schedule::{NotificationBlock, Schedule};
pub use schedule_item::{ItemHandle, ItemProperties, ScheduleItem, WeakItemHandle};
pub use selection::Selection;
pub use timecode::{frame_of_day, frames_from_seconds, Timecode, FRAMES_PER_DAY, FRAMES_PER_SECOND};

pub(crate) use schedule_item::{repeats_for, snap_to_playlist};
