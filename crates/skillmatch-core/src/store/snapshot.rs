//! Serializable image of the catalogue.

use serde::{Deserialize, Serialize};

use crate::domain::{Assignment, CompletionRecord, IdSequence, Project, Resource, TaskRecord};

/// Whole-catalogue document written by snapshot stores.
///
/// Entities are kept as flat lists (ordered by id) so the file stays readable
/// and diffable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub ids: IdSequence,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub history: Vec<CompletionRecord>,
}

impl Snapshot {
    pub const VERSION: u32 = 1;
}
