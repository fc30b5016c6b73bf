//! Editor tuning knobs.
//!
//! All fields have defaults, so an empty TOML document is a valid config.
//!
//! ```
//! use u_playout::config::EditorConfig;
//!
//! let config = EditorConfig::from_toml_str("combine_window_ms = 300").unwrap();
//! assert_eq!(config.combine_window_ms, 300);
//! assert_eq!(config.current_index_ttl_ms, 250);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EditResult;

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Window within which consecutive drag edits of one item coalesce (ms).
    pub combine_window_ms: u64,
    /// Time-to-live of the "currently playing item" cache (ms).
    pub current_index_ttl_ms: u64,
    /// Maximum undo depth. 0 = unlimited.
    pub undo_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            combine_window_ms: 500,
            current_index_ttl_ms: 250,
            undo_limit: 0,
        }
    }
}

impl EditorConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(src: &str) -> EditResult<Self> {
        Ok(toml::from_str(src)?)
    }

    /// Sets the drag-coalescing window.
    pub fn with_combine_window_ms(mut self, ms: u64) -> Self {
        self.combine_window_ms = ms;
        self
    }

    /// Sets the current-item cache TTL.
    pub fn with_current_index_ttl_ms(mut self, ms: u64) -> Self {
        self.current_index_ttl_ms = ms;
        self
    }

    /// Sets the undo depth limit.
    pub fn with_undo_limit(mut self, limit: usize) -> Self {
        self.undo_limit = limit;
        self
    }

    pub fn combine_window(&self) -> Duration {
        Duration::from_millis(self.combine_window_ms)
    }

    pub fn current_index_ttl(&self) -> Duration {
        Duration::from_millis(self.current_index_ttl_ms)
    }
}
