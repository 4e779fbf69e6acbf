//! Completion handler: Assigned -> Completed, releasing the resource.

use chrono::{DateTime, Utc};

use crate::domain::{CompletionRecord, EngineError, TaskId};
use crate::store::Catalogue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub record: CompletionRecord,
    pub task_name: String,
    pub resource_name: String,
}

/// Runs inside a transaction. The window is free again as soon as this commits.
pub fn complete(
    catalogue: &mut Catalogue,
    task_id: TaskId,
    now: DateTime<Utc>,
) -> Result<Completion, EngineError> {
    let record = catalogue.release_assignment(task_id, now)?;
    let task_name = catalogue.task(task_id)?.name.clone();
    let resource_name = catalogue.resource(record.resource_id)?.name.clone();
    Ok(Completion {
        record,
        task_name,
        resource_name,
    })
}
