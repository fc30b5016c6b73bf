//! Error types shared by the schedule model and the command layer.
//!
//! Layout degeneracy (gaps, overlaps) is never an error: it is reported as
//! problem ranges by [`crate::layout`]. Errors here describe operations
//! that could not be carried out.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type EditResult<T> = Result<T, EditError>;

/// Failure of a schedule operation or command.
#[derive(Debug, Error)]
pub enum EditError {
    /// Storage for the operation could not be reserved. Nothing was changed.
    #[error("no memory to {context}")]
    NoMemory { context: &'static str },

    /// A command failed its precondition check and must not be performed.
    #[error("command precondition failed: {0}")]
    InitCheck(String),

    /// The live schedule no longer matches the state a command recorded.
    #[error("mismatched values: {0}")]
    MismatchedValues(String),

    /// The item is already linked into the schedule.
    #[error("item is already part of the schedule")]
    ItemAlreadyInSchedule,

    /// A frame range whose end lies before its start.
    #[error("invalid frame range {start_frame}..{end_frame}")]
    InvalidRange { start_frame: u64, end_frame: u64 },

    /// An archive failed validation.
    #[error("archive validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}
