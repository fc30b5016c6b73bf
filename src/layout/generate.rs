//! Playlist generation.
//!
//! Flattens a frame range of a laid-out schedule into a linear list of
//! entries a player can consume. A schedule item that repeats its playlist
//! becomes one entry per loop; the first entry may start mid-loop.

use std::rc::Rc;

use log::trace;

use crate::error::{EditError, EditResult};
use crate::models::{ItemHandle, Playlist};

/// One playable entry of a generated playlist.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    /// Start frame (relative to the range start when offset to zero).
    pub start_frame: u64,
    /// Length in frames; never longer than one playlist loop.
    pub duration: u64,
    /// Frames to skip at the start of the playlist.
    pub clip_offset: u64,
    /// Playlist to play, `None` for a pause.
    pub playlist: Option<Rc<Playlist>>,
}

impl PlaylistEntry {
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.duration
    }

    /// Whether this entry is a pause placeholder.
    pub fn is_gap(&self) -> bool {
        self.playlist.is_none()
    }
}

/// Flattened schedule range.
#[derive(Debug, Clone, Default)]
pub struct GeneratedPlaylist {
    pub entries: Vec<PlaylistEntry>,
}

impl GeneratedPlaylist {
    /// Sum of entry durations.
    pub fn duration(&self) -> u64 {
        self.entries.iter().map(|e| e.duration).sum()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Emits entries for `items` overlapping `[start_frame, end_frame)`.
///
/// `items` starts at the first candidate item; iteration stops at the
/// first item starting at or after `end_frame`.
pub(crate) fn generate_playlist(
    items: &[ItemHandle],
    start_frame: u64,
    end_frame: u64,
    offset_to_zero: bool,
) -> EditResult<GeneratedPlaylist> {
    let base = if offset_to_zero { start_frame } else { 0 };
    let mut generated = GeneratedPlaylist::default();

    for handle in items {
        let item = handle.borrow();
        if item.start_frame() >= end_frame {
            break;
        }
        if item.end_frame() <= start_frame {
            continue;
        }
        let clip_start = item.start_frame().max(start_frame);
        let clip_end = item.end_frame().min(end_frame);
        if clip_start >= clip_end {
            continue;
        }

        match item.playlist().filter(|p| p.duration() > 0) {
            Some(playlist) => {
                let loop_duration = playlist.duration();
                let mut offset = (clip_start - item.start_frame()) % loop_duration;
                let loops = (clip_end - clip_start + offset).div_ceil(loop_duration);
                reserve(&mut generated, loops as usize)?;

                let mut cursor = clip_start;
                while cursor < clip_end {
                    let duration = (loop_duration - offset).min(clip_end - cursor);
                    generated.entries.push(PlaylistEntry {
                        start_frame: cursor - base,
                        duration,
                        clip_offset: offset,
                        playlist: Some(Rc::clone(&playlist)),
                    });
                    cursor += duration;
                    offset = 0;
                }
            }
            None => {
                reserve(&mut generated, 1)?;
                generated.entries.push(PlaylistEntry {
                    start_frame: clip_start - base,
                    duration: clip_end - clip_start,
                    clip_offset: 0,
                    playlist: None,
                });
            }
        }
    }

    trace!(
        "generated {} playlist entries for frames {start_frame}..{end_frame}",
        generated.entries.len()
    );
    Ok(generated)
}

fn reserve(generated: &mut GeneratedPlaylist, additional: usize) -> EditResult<()> {
    generated
        .entries
        .try_reserve(additional)
        .map_err(|_| EditError::NoMemory {
            context: "generate playlist",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Schedule, ScheduleItem};

    fn durations(p: &GeneratedPlaylist) -> Vec<u64> {
        p.entries.iter().map(|e| e.duration).collect()
    }

    /// One flexible item at [1000, 3000) looping an 800-frame playlist.
    fn looping_schedule(playlist: &Rc<Playlist>) -> Schedule {
        let mut s = Schedule::new();
        let item = ScheduleItem::for_playlist(playlist)
            .with_flexible_duration(true)
            .with_duration(2000)
            .with_start_frame(1000);
        s.append_item(item.into_handle()).unwrap();
        s
    }

    #[test]
    fn test_loops_clipped_to_playlist_duration() {
        let p = Playlist::new("P", "Loop", 800).shared();
        let s = looping_schedule(&p);

        let generated = s.generate_playlist(1000, 3000, false).unwrap();
        assert_eq!(durations(&generated), vec![800, 800, 400]);
        assert_eq!(generated.entries[0].clip_offset, 0);
        assert_eq!(generated.entries[0].start_frame, 1000);
        assert_eq!(generated.entries[2].start_frame, 2600);
        assert!(generated
            .entries
            .iter()
            .all(|e| Rc::ptr_eq(e.playlist.as_ref().unwrap(), &p)));
        assert_eq!(generated.duration(), 2000);
    }

    #[test]
    fn test_start_mid_loop() {
        let p = Playlist::new("P", "Loop", 800).shared();
        let s = looping_schedule(&p);

        // 1900 is 100 frames into the second loop
        let generated = s.generate_playlist(1900, 3000, true).unwrap();
        assert_eq!(durations(&generated), vec![700, 400]);
        assert_eq!(generated.entries[0].clip_offset, 100);
        assert_eq!(generated.entries[0].start_frame, 0);
        assert_eq!(generated.entries[1].clip_offset, 0);
        assert_eq!(generated.entries[1].start_frame, 700);
    }

    #[test]
    fn test_range_end_clips_last_item() {
        let p = Playlist::new("P", "Loop", 800).shared();
        let s = looping_schedule(&p);
        let generated = s.generate_playlist(0, 1500, false).unwrap();
        assert_eq!(durations(&generated), vec![500]);
    }

    #[test]
    fn test_gap_items_emit_placeholder() {
        let p = Playlist::new("P", "Clip", 300).shared();
        let mut s = Schedule::new();
        s.append_item(ScheduleItem::for_playlist(&p).into_handle())
            .unwrap();
        s.append_item(ScheduleItem::gap(1000).with_start_frame(300).into_handle())
            .unwrap();

        let generated = s.generate_playlist(0, 5000, false).unwrap();
        assert_eq!(generated.entry_count(), 2);
        assert!(!generated.entries[0].is_gap());
        assert!(generated.entries[1].is_gap());
        assert_eq!(generated.entries[1].duration, 1000);
        assert_eq!(generated.entries[1].end_frame(), 1300);
    }

    #[test]
    fn test_zero_length_playlist_is_gap() {
        let p = Playlist::new("P", "Empty", 0).shared();
        let mut s = Schedule::new();
        s.append_item(
            ScheduleItem::for_playlist(&p)
                .with_duration(250)
                .into_handle(),
        )
        .unwrap();
        let generated = s.generate_playlist(0, 1000, false).unwrap();
        assert_eq!(generated.entry_count(), 1);
        assert!(generated.entries[0].is_gap());
        assert_eq!(generated.entries[0].duration, 250);
    }

    #[test]
    fn test_empty_range() {
        let p = Playlist::new("P", "Loop", 800).shared();
        let s = looping_schedule(&p);
        assert!(s.generate_playlist(1200, 1200, false).unwrap().is_empty());
        assert!(s.generate_playlist(5000, 6000, false).unwrap().is_empty());
    }
}
