//! Domain model (IDs, windows, entities, errors).
//!
//! - ids: 連番 ID（Phantom type）
//! - window: ScheduleWindow（半開区間）/ AvailabilityWindow（閉区間）
//! - resource: Resource / Skill / Project
//! - task: TaskRecord と状態遷移
//! - assignment: Assignment と完了履歴
//! - errors: EngineError / ErrorKind

pub mod assignment;
pub mod errors;
pub mod ids;
pub mod resource;
pub mod task;
pub mod window;

pub use assignment::{Assignment, CompletionRecord};
pub use errors::{EngineError, ErrorKind};
pub use ids::{AssignmentId, Id, IdSequence, ProjectId, ResourceId, TaskId};
pub use resource::{Project, Resource, Skill};
pub use task::{TaskRecord, TaskState};
pub use window::{AvailabilityWindow, ScheduleWindow};
