//! Frame arithmetic.
//!
//! All schedule math is integer frames at a fixed 25 frames per second.
//! A schedule covers one day: frames `0..FRAMES_PER_DAY`.

use std::fmt;

use jiff::civil::Time;

/// Frames per second.
pub const FRAMES_PER_SECOND: u64 = 25;

/// Frames in one day (24h × 60m × 60s × 25).
pub const FRAMES_PER_DAY: u64 = 24 * 60 * 60 * FRAMES_PER_SECOND;

/// Converts whole seconds to frames.
#[inline]
pub fn frames_from_seconds(seconds: u64) -> u64 {
    seconds * FRAMES_PER_SECOND
}

/// Frame of the day at which `time` falls.
pub fn frame_of_day(time: Time) -> u64 {
    let seconds =
        time.hour() as u64 * 3600 + time.minute() as u64 * 60 + time.second() as u64;
    let frame_nanos = 1_000_000_000 / FRAMES_PER_SECOND;
    frames_from_seconds(seconds) + time.subsec_nanosecond() as u64 / frame_nanos
}

/// A frame position displayed as `HH:MM:SS:FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timecode(pub u64);

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frames = self.0 % FRAMES_PER_SECOND;
        let seconds = self.0 / FRAMES_PER_SECOND;
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60,
            frames
        )
    }
}
