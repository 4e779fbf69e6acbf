//! Read-only views over the ledger: counts, active bookings, history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ProjectId, ResourceId, TaskId};
use crate::store::Catalogue;

/// Format of `completion_date` in history rows.
pub const COMPLETION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCounts {
    pub pending: usize,
    pub assigned: usize,
    pub completed: usize,
    pub resources: usize,
    pub active_assignments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub id: ProjectId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: TaskId,
    pub task_name: String,
    pub project_name: String,
    pub schedule: String,
}

/// Active bookings of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAssignments {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub tasks: Vec<ScheduledTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub project_name: String,
    pub task_name: String,
    pub completed_by: String,
    pub completion_date: String,
}

pub fn projects_view(catalogue: &Catalogue) -> Vec<ProjectEntry> {
    catalogue
        .projects()
        .map(|p| ProjectEntry {
            id: p.id,
            name: p.name.clone(),
        })
        .collect()
}

/// Distinct skill names held by any resource, sorted.
pub fn skills_view(catalogue: &Catalogue) -> Vec<String> {
    catalogue.skills().into_iter().map(|s| s.to_string()).collect()
}

/// Resources with at least one active assignment, by resource id; their
/// tasks by window start.
pub fn assignments_view(catalogue: &Catalogue) -> Vec<ResourceAssignments> {
    let mut grouped: BTreeMap<ResourceId, Vec<(chrono::DateTime<chrono::Utc>, ScheduledTask)>> =
        BTreeMap::new();
    for assignment in catalogue.active_assignments() {
        let Ok(task) = catalogue.task(assignment.task_id) else {
            continue;
        };
        let project_name = catalogue
            .project(task.project_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        grouped.entry(assignment.resource_id).or_default().push((
            assignment.window.start,
            ScheduledTask {
                task_id: task.id,
                task_name: task.name.clone(),
                project_name,
                schedule: assignment.window.to_string(),
            },
        ));
    }

    grouped
        .into_iter()
        .filter_map(|(resource_id, mut tasks)| {
            let resource = catalogue.resource(resource_id).ok()?;
            tasks.sort_by_key(|(start, t)| (*start, t.task_id));
            Some(ResourceAssignments {
                resource_id,
                resource_name: resource.name.clone(),
                tasks: tasks.into_iter().map(|(_, t)| t).collect(),
            })
        })
        .collect()
}

/// Completion history, newest first.
pub fn history_view(catalogue: &Catalogue) -> Vec<HistoryEntry> {
    catalogue
        .history()
        .into_iter()
        .map(|record| HistoryEntry {
            project_name: catalogue
                .project(record.project_id)
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            task_name: catalogue
                .task(record.task_id)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            completed_by: catalogue
                .resource(record.resource_id)
                .map(|r| r.name.clone())
                .unwrap_or_default(),
            completion_date: record
                .completion_date
                .format(COMPLETION_DATE_FORMAT)
                .to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AvailabilityWindow, Skill};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn ledger() -> (Catalogue, Vec<TaskId>) {
        let mut cat = Catalogue::new();
        let sql = Skill::parse("SQL").unwrap();
        let ram = cat
            .insert_resource("Ram", [sql.clone()].into_iter().collect(), vec![AvailabilityWindow::full_horizon()], t(0))
            .unwrap();
        let p = cat.resolve_project("E-commerce Website");
        let ids: Vec<TaskId> = ["Setup Database", "Tune Indexes", "Backups"]
            .iter()
            .map(|name| cat.insert_task(p, name, sql.clone(), 2, t(0)).unwrap())
            .collect();
        cat.commit_assignment(ids[1], ram, t(4)).unwrap();
        cat.commit_assignment(ids[0], ram, t(0)).unwrap();
        cat.commit_assignment(ids[2], ram, t(8)).unwrap();
        cat.release_assignment(ids[2], t(9)).unwrap();
        (cat, ids)
    }

    #[test]
    fn assignments_are_grouped_and_ordered_by_start() {
        let (cat, ids) = ledger();
        let view = assignments_view(&cat);

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].resource_name, "Ram");
        let order: Vec<TaskId> = view[0].tasks.iter().map(|t| t.task_id).collect();
        assert_eq!(order, vec![ids[0], ids[1]]);
        assert_eq!(view[0].tasks[0].schedule, "2025-08-01 00:00 - 2025-08-01 02:00");
        assert_eq!(view[0].tasks[0].project_name, "E-commerce Website");
    }

    #[test]
    fn history_rows_use_names() {
        let (cat, _) = ledger();
        let rows = history_view(&cat);
        assert_eq!(
            rows,
            vec![HistoryEntry {
                project_name: "E-commerce Website".into(),
                task_name: "Backups".into(),
                completed_by: "Ram".into(),
                completion_date: "2025-08-01 09:00:00".into(),
            }]
        );
    }

    #[test]
    fn history_entry_field_names() {
        let (cat, _) = ledger();
        let json = serde_json::to_value(&history_view(&cat)[0]).unwrap();
        for key in ["project_name", "task_name", "completed_by", "completion_date"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
