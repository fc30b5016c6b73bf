//! Input validation for schedule archives.
//!
//! Checks structural integrity of an archived schedule before it is
//! rebuilt against a playlist library. Detects:
//! - Unsupported archive versions
//! - References to playlists missing from the library
//! - Start frames outside the broadcast day
//! - Durations longer than a day
//! - Zero repeat counts on fixed-duration playlist items

use crate::archive::{ScheduleArchive, ARCHIVE_VERSION};
use crate::models::{PlaylistLibrary, FRAMES_PER_DAY};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The archive was written by an unknown format version.
    UnsupportedVersion,
    /// An item references a playlist that doesn't exist.
    UnknownPlaylist,
    /// An item starts at or after the end of the day.
    StartFrameOutOfDay,
    /// An item lasts longer than a day.
    DurationOutOfDay,
    /// A fixed-duration playlist item repeats zero times.
    InvalidRepeats,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates an archived schedule against `library`.
///
/// Checks:
/// 1. The archive version is supported
/// 2. Every playlist reference resolves in the library
/// 3. Every start frame lies within the day
/// 4. No item lasts longer than a day
/// 5. Fixed-duration playlist items repeat at least once
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_archive(archive: &ScheduleArchive, library: &PlaylistLibrary) -> ValidationResult {
    let mut errors = Vec::new();

    if archive.version != ARCHIVE_VERSION {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnsupportedVersion,
            format!(
                "Archive version {} is not supported (expected {ARCHIVE_VERSION})",
                archive.version
            ),
        ));
    }

    for (index, record) in archive.items.iter().enumerate() {
        if let Some(id) = &record.playlist {
            if !library.contains(id) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownPlaylist,
                    format!("Item {index} references unknown playlist '{id}'"),
                ));
            } else if !record.flexible_duration && record.repeats == 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRepeats,
                    format!("Item {index} plays playlist '{id}' zero times"),
                ));
            }
        }

        if record.start_frame >= FRAMES_PER_DAY {
            errors.push(ValidationError::new(
                ValidationErrorKind::StartFrameOutOfDay,
                format!(
                    "Item {index} starts at frame {} past the end of the day",
                    record.start_frame
                ),
            ));
        }

        let end = record.start_frame.checked_add(record.duration);
        if record.duration > FRAMES_PER_DAY || end.is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::DurationOutOfDay,
                format!(
                    "Item {index} lasts {} frames, longer than a day",
                    record.duration
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
