//! Resource, Skill and Project models.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::ids::{ProjectId, ResourceId};
use super::window::{AvailabilityWindow, ScheduleWindow};

/// A skill name. Compared exactly (case-sensitive) after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skill(String);

impl Skill {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EngineError::Validation("skill name must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

/// A person who can be booked for tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    /// Never empty.
    pub skills: BTreeSet<Skill>,
    /// Never empty.
    pub availability: Vec<AvailabilityWindow>,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    pub fn has_skill(&self, skill: &Skill) -> bool {
        self.skills.contains(skill)
    }

    /// Whether some availability window contains the whole schedule window.
    /// Existing bookings are not considered here.
    pub fn is_available_for(&self, window: &ScheduleWindow) -> bool {
        self.availability.iter().any(|a| a.covers(window))
    }

    /// Merge skills and windows. Returns whether anything changed.
    pub fn grow(&mut self, skills: &BTreeSet<Skill>, windows: &[AvailabilityWindow]) -> bool {
        let before = (self.skills.len(), self.availability.len());
        self.skills.extend(skills.iter().cloned());
        for window in windows {
            if !self.availability.contains(window) {
                self.availability.push(*window);
            }
        }
        before != (self.skills.len(), self.availability.len())
    }
}
