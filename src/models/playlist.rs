//! Playlist collaborator.
//!
//! Playlist content editing lives elsewhere. The schedule only needs a
//! playlist's identity, name and duration in frames. Duration may change
//! underneath the schedule (the playlist was edited), which is why it sits
//! in a `Cell` and why sanitization re-snaps inflexible items every pass.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// A playlist referenced by schedule items.
#[derive(Debug)]
pub struct Playlist {
    id: String,
    name: String,
    duration: Cell<u64>,
}

impl Playlist {
    /// Creates a playlist with the given duration in frames.
    pub fn new(id: impl Into<String>, name: impl Into<String>, duration: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration: Cell::new(duration),
        }
    }

    /// Wraps the playlist for sharing between items and a library.
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Duration in frames.
    pub fn duration(&self) -> u64 {
        self.duration.get()
    }

    /// Changes the duration (the playlist was edited).
    pub fn set_duration(&self, duration: u64) {
        self.duration.set(duration);
    }
}

/// Registry of playlists by ID.
///
/// Owns the strong references; schedule items only hold weak ones.
#[derive(Debug, Default)]
pub struct PlaylistLibrary {
    playlists: HashMap<String, Rc<Playlist>>,
}

impl PlaylistLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a playlist, replacing any previous one with the same ID.
    pub fn add(&mut self, playlist: Playlist) -> Rc<Playlist> {
        let playlist = playlist.shared();
        self.playlists
            .insert(playlist.id().to_string(), Rc::clone(&playlist));
        playlist
    }

    /// Looks up a playlist by ID.
    pub fn get(&self, id: &str) -> Option<Rc<Playlist>> {
        self.playlists.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.playlists.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }
}
