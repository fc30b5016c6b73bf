//! Schedule layout.
//!
//! Derives consistent start frames and durations from a list of items
//! with partial flexibility, flattens schedule ranges into playable
//! playlists, and reports what could not be made consistent.
//!
//! # Sanitization
//!
//! Layout is a derived property: it is recomputed after every edit rather
//! than stored. The pass guarantees non-decreasing start frames and no
//! overlaps; it closes gaps before pinned items by stretching
//! flexible-duration items and moving flexible-start items, up to the
//! nearest hard anchor. Gaps it cannot close are reported as
//! [`ProblemRange`]s and are a normal condition, not an error.

mod generate;
mod problems;
mod sanitize;

pub use generate::{GeneratedPlaylist, PlaylistEntry};
pub use problems::{ProblemKind, ProblemRange};

pub(crate) use generate::generate_playlist;
pub(crate) use problems::problem_ranges;
pub(crate) use sanitize::sanitize_items;
