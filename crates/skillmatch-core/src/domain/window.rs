//! Time windows on the schedulable axis.
//!
//! Two shapes are used:
//! - [`ScheduleWindow`]: half-open `[start, end)`, occupied by a Task or Assignment.
//! - [`AvailabilityWindow`]: closed `[start, end]`, when a Resource can be booked.
//!
//! A schedule window fits an availability window iff
//! `avail.start <= sched.start && sched.end <= avail.end`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::EngineError;

/// Display format used by the `schedule` field ("from - to").
pub const SCHEDULE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Half-open interval `[start, end)` during which a Resource is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScheduleWindow {
    /// `[start, start + hours)`. Fails if the end is not representable.
    pub fn starting_at(start: DateTime<Utc>, hours: u32) -> Result<Self, EngineError> {
        let end = start
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .filter(|end| *end <= horizon_end())
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "duration of {hours}h starting at {start} runs past the schedulable horizon"
                ))
            })?;
        Ok(Self { start, end })
    }

    /// Whether two windows share any instant.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }
}

impl fmt::Display for ScheduleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(SCHEDULE_FORMAT),
            self.end.format(SCHEDULE_FORMAT)
        )
    }
}

/// Closed interval `[start, end]` during which a Resource is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AvailabilityWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EngineError> {
        if start > end {
            return Err(EngineError::Validation(format!(
                "availability window starts after it ends ({start} > {end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// The whole schedulable horizon (no time restriction).
    pub fn full_horizon() -> Self {
        Self {
            start: horizon_start(),
            end: horizon_end(),
        }
    }

    pub fn covers(&self, window: &ScheduleWindow) -> bool {
        self.start <= window.start && window.end <= self.end
    }
}

pub fn horizon_start() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub fn horizon_end() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
