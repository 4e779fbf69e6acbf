//! Assignment (active booking) and completion history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AssignmentId, ProjectId, ResourceId, TaskId};
use super::window::ScheduleWindow;

/// An active booking of one Resource for one Task.
///
/// Exists only while the Task is Assigned; removed when the Task completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub task_id: TaskId,
    pub resource_id: ResourceId,
    /// Copied from the task at commit time.
    pub window: ScheduleWindow,
    pub duration_hours: u32,
    pub assigned_at: DateTime<Utc>,
}

/// What remains after a task completes. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub resource_id: ResourceId,
    pub window: ScheduleWindow,
    pub duration_hours: u32,
    pub completion_date: DateTime<Utc>,
}
