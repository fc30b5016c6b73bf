//! Broadcast schedule layout engine.
//!
//! Models one broadcast day as an ordered list of time-boxed items, each
//! playing a playlist (or a pause) from a start frame for a duration.
//! Whenever an item changes, the schedule re-derives a consistent layout:
//! items chain without overlap, pinned start frames are honored, and gaps
//! before pinned items are closed by stretching or moving flexible items.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Playlist`, `ScheduleItem`, `Schedule`,
//!   `Selection`, `Activation`, observer interfaces, timecode helpers
//! - **`layout`**: Sanitization, problem ranges, playlist generation
//! - **`commands`**: Undoable edits (change, insert, remove) and the
//!   `CommandStack` that records them
//! - **`archive`**: Versioned JSON persistence
//! - **`validation`**: Integrity checks for archived schedules
//! - **`config`**: Editor tuning (drag coalescing window, cache TTL, undo depth)
//!
//! # Architecture
//!
//! The crate is a single-threaded library consumed by an editor. Items are
//! shared through reference-counted handles between the schedule, the
//! selection and undo history; callers serialize access to a schedule the
//! way they serialize access to the rest of the document.
//!
//! # References
//!
//! - SMPTE ST 12-1, "Time and Control Code" (frame-based timecode)
//! - Gamma et al. (1994), "Design Patterns", Command and Observer

pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod layout;
pub mod models;
pub mod validation;
