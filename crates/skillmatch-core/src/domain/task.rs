//! Task record and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::ids::{ProjectId, ResourceId, TaskId};
use super::resource::Skill;
use super::window::ScheduleWindow;

/// Task state.
///
/// State transitions:
/// - Pending -> Assigned -> Completed
///
/// Assigned happens exactly once (no re-allocation), Completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for a resource.
    Pending,

    /// Holds exactly one active assignment.
    Assigned,

    /// Finished; the resource has been released.
    Completed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed)
    }
}

/// Single source of truth for a task. All state transitions happen here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    pub required_skill: Skill,
    pub duration_hours: u32,
    pub state: TaskState,

    /// Set when the task becomes Assigned.
    pub schedule: Option<ScheduleWindow>,

    pub completed_by: Option<ResourceId>,
    pub completion_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(
        id: TaskId,
        project_id: ProjectId,
        name: String,
        required_skill: Skill,
        duration_hours: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            project_id,
            name,
            required_skill,
            duration_hours,
            state: TaskState::Pending,
            schedule: None,
            completed_by: None,
            completion_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The window this task would occupy if allocated at `now`.
    pub fn prospective_window(&self, now: DateTime<Utc>) -> Result<ScheduleWindow, EngineError> {
        ScheduleWindow::starting_at(now, self.duration_hours)
    }

    /// Pending -> Assigned.
    pub fn mark_assigned(&mut self, window: ScheduleWindow, now: DateTime<Utc>) -> Result<(), EngineError> {
        match self.state {
            TaskState::Pending => {
                self.state = TaskState::Assigned;
                self.schedule = Some(window);
                self.updated_at = now;
                Ok(())
            }
            TaskState::Assigned => Err(EngineError::DuplicateAssignment(self.id.to_string())),
            TaskState::Completed => Err(EngineError::InvalidState(format!(
                "task {} is already completed",
                self.id
            ))),
        }
    }

    /// Assigned -> Completed.
    pub fn mark_completed(&mut self, by: ResourceId, now: DateTime<Utc>) -> Result<(), EngineError> {
        match self.state {
            TaskState::Assigned => {
                self.state = TaskState::Completed;
                self.completed_by = Some(by);
                self.completion_date = Some(now);
                self.updated_at = now;
                Ok(())
            }
            TaskState::Pending => Err(EngineError::InvalidState(format!(
                "task {} is pending and has no assignment to complete",
                self.id
            ))),
            TaskState::Completed => Err(EngineError::InvalidState(format!(
                "task {} is already completed",
                self.id
            ))),
        }
    }
}
