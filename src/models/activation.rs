//! Schedule activation: when a schedule is on air.
//!
//! A schedule either recurs on a set of week days or applies to one date.
//! This is metadata for the surrounding application; layout ignores it.

use jiff::civil::{Date, Weekday};
use serde::{Deserialize, Serialize};

/// Set of week days, bit 0 = Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekDays(u8);

impl WeekDays {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b0111_1111);
    pub const WORKDAYS: Self = Self(0b0001_1111);
    pub const WEEKEND: Self = Self(0b0110_0000);

    fn bit(day: Weekday) -> u8 {
        1 << day.to_monday_zero_offset()
    }

    /// Adds a day.
    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | Self::bit(day))
    }

    /// Removes a day.
    pub fn without(self, day: Weekday) -> Self {
        Self(self.0 & !Self::bit(day))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for WeekDays {
    fn default() -> Self {
        Self::ALL
    }
}

/// When a schedule applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Activation {
    /// Recurs every week on the given days.
    Weekly { days: WeekDays },
    /// Applies to a single calendar date.
    Date { date: Date },
}

impl Activation {
    /// Whether the schedule is on air on `date`.
    pub fn is_active_on(&self, date: Date) -> bool {
        match self {
            Activation::Weekly { days } => days.contains(date.weekday()),
            Activation::Date { date: d } => *d == date,
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        Activation::Weekly {
            days: WeekDays::ALL,
        }
    }
}
