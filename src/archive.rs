//! Versioned JSON archive of a schedule.
//!
//! Items reference playlists by id; the playlists themselves live in a
//! [`PlaylistLibrary`] supplied when the archive is loaded. Layout is not
//! trusted: a loaded schedule is sanitized before it is returned.
//!
//! ```
//! use u_playout::archive::ScheduleArchive;
//! use u_playout::models::{Playlist, PlaylistLibrary, Schedule, ScheduleItem};
//!
//! let mut library = PlaylistLibrary::new();
//! let news = library.add(Playlist::new("news", "News", 1000));
//!
//! let mut schedule = Schedule::new().with_name("Weekdays");
//! schedule.append_item(ScheduleItem::for_playlist(&news).into_handle()).unwrap();
//!
//! let json = ScheduleArchive::from_schedule(&schedule).to_json().unwrap();
//! let restored = ScheduleArchive::from_json(&json).unwrap().into_schedule(&library).unwrap();
//! assert_eq!(restored.name(), "Weekdays");
//! assert_eq!(restored.count_items(), 1);
//! ```

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};
use crate::models::{Activation, PlaylistLibrary, Schedule, ScheduleItem};
use crate::validation::validate_archive;

/// Current archive format version.
pub const ARCHIVE_VERSION: u32 = 1;

/// Serialized form of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleArchive {
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub activation: Activation,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

/// Serialized form of one schedule item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Playlist id, `None` for a gap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<String>,
    pub start_frame: u64,
    pub duration: u64,
    pub repeats: u16,
    pub flexible_start_frame: bool,
    pub flexible_duration: bool,
}

impl ScheduleArchive {
    /// Captures the current state of `schedule`.
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let items = schedule
            .items()
            .iter()
            .map(|handle| {
                let item = handle.borrow();
                ItemRecord {
                    playlist: item.playlist().map(|p| p.id().to_string()),
                    start_frame: item.start_frame(),
                    duration: item.duration(),
                    repeats: item.explicit_repeats(),
                    flexible_start_frame: item.flexible_start_frame(),
                    flexible_duration: item.flexible_duration(),
                }
            })
            .collect();
        Self {
            version: ARCHIVE_VERSION,
            name: schedule.name().to_string(),
            activation: schedule.activation().clone(),
            items,
        }
    }

    pub fn to_json(&self) -> EditResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> EditResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuilds the schedule, resolving playlists in `library`.
    ///
    /// Fails with [`EditError::Validation`] listing every problem found.
    pub fn into_schedule(self, library: &PlaylistLibrary) -> EditResult<Schedule> {
        validate_archive(&self, library).map_err(EditError::Validation)?;

        let mut schedule = Schedule::new()
            .with_name(self.name)
            .with_activation(self.activation);
        for record in self.items {
            let playlist = record.playlist.as_deref().and_then(|id| library.get(id));
            let item = ScheduleItem::new(playlist.as_ref())
                .with_flexible_start_frame(record.flexible_start_frame)
                .with_flexible_duration(record.flexible_duration)
                .with_repeats(record.repeats)
                .with_duration(record.duration)
                .with_start_frame(record.start_frame);
            schedule.append_item(item.into_handle())?;
        }
        schedule.sanitize_start_frames();

        info!(
            "loaded schedule '{}' with {} item(s)",
            schedule.name(),
            schedule.count_items()
        );
        Ok(schedule)
    }
}
