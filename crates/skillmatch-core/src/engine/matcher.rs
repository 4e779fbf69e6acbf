//! Candidate matcher: which resources could take each pending task right now.
//!
//! Read-only. Listing candidates reserves nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::availability::AvailabilityIndex;
use crate::domain::{EngineError, ProjectId, ResourceId, ScheduleWindow, Skill, TaskId, TaskState};
use crate::store::Catalogue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub name: String,
}

/// One pending task with the resources that qualify for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMatch {
    pub task_id: TaskId,
    pub task_name: String,
    pub required_skill: Skill,
    /// Prospective window if allocated at `now`. `None` once the task can no
    /// longer fit before the end of the horizon.
    pub schedule: Option<ScheduleWindow>,
    /// Ordered by name, then id. May be empty.
    pub matched: Vec<ResourceRef>,
}

impl TaskMatch {
    pub fn has_match(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// One entry per pending task of `project_id`, ordered by task id.
pub fn find_candidates(
    catalogue: &Catalogue,
    project_id: ProjectId,
    now: DateTime<Utc>,
) -> Result<Vec<TaskMatch>, EngineError> {
    catalogue.project(project_id)?;
    let index = AvailabilityIndex::build(catalogue);

    let matches = catalogue
        .tasks_of(project_id, TaskState::Pending)
        .map(|task| {
            let schedule = task
                .prospective_window(now)
                .inspect_err(|e| {
                    tracing::warn!(task = %task.id, error = %e, "task cannot be scheduled from now");
                })
                .ok();
            let mut matched: Vec<ResourceRef> = schedule
                .map(|window| index.qualified(&task.required_skill, &window))
                .unwrap_or_default()
                .into_iter()
                .map(|c| ResourceRef {
                    id: c.resource_id,
                    name: c.name,
                })
                .collect();
            matched.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

            tracing::debug!(
                task = %task.id,
                skill = %task.required_skill,
                candidates = matched.len(),
                "matched"
            );
            TaskMatch {
                task_id: task.id,
                task_name: task.name.clone(),
                required_skill: task.required_skill.clone(),
                schedule,
                matched,
            }
        })
        .collect();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AvailabilityWindow;
    use chrono::{Duration, TimeZone};

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn skill(s: &str) -> Skill {
        Skill::parse(s).unwrap()
    }

    fn add(cat: &mut Catalogue, name: &str, skills: &[&str]) -> ResourceId {
        cat.insert_resource(
            name,
            skills.iter().map(|s| skill(s)).collect(),
            vec![AvailabilityWindow::full_horizon()],
            t(0),
        )
        .unwrap()
    }

    #[test]
    fn candidates_are_ordered_by_name_then_id() {
        let mut cat = Catalogue::new();
        let shyam = add(&mut cat, "Shyam", &["SQL"]);
        let ram = add(&mut cat, "Ram", &["SQL"]);
        let ram2 = add(&mut cat, "Ram", &["SQL"]);
        add(&mut cat, "Kiran", &["Node.JS"]);
        let p = cat.resolve_project("E-commerce Website");
        cat.insert_task(p, "Setup Database", skill("SQL"), 4, t(0)).unwrap();

        let matches = find_candidates(&cat, p, t(1)).unwrap();

        assert_eq!(matches.len(), 1);
        let ids: Vec<ResourceId> = matches[0].matched.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![ram, ram2, shyam]);
        assert_eq!(matches[0].schedule, Some(ScheduleWindow::starting_at(t(1), 4).unwrap()));
    }

    #[test]
    fn only_pending_tasks_are_listed_and_empty_sets_are_kept() {
        let mut cat = Catalogue::new();
        let ram = add(&mut cat, "Ram", &["SQL"]);
        let p = cat.resolve_project("P");
        let done = cat.insert_task(p, "assigned", skill("SQL"), 1, t(0)).unwrap();
        cat.commit_assignment(done, ram, t(0)).unwrap();
        let rust = cat.insert_task(p, "needs rust", skill("Rust"), 1, t(0)).unwrap();

        let matches = find_candidates(&cat, p, t(0)).unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].task_id, rust);
        assert!(!matches[0].has_match());
    }

    #[test]
    fn busy_resources_are_not_candidates() {
        let mut cat = Catalogue::new();
        let ram = add(&mut cat, "Ram", &["SQL"]);
        let p = cat.resolve_project("P");
        let first = cat.insert_task(p, "a", skill("SQL"), 8, t(0)).unwrap();
        cat.commit_assignment(first, ram, t(0)).unwrap();
        cat.insert_task(p, "b", skill("SQL"), 2, t(0)).unwrap();

        assert!(!find_candidates(&cat, p, t(1)).unwrap()[0].has_match());
        assert!(find_candidates(&cat, p, t(8)).unwrap()[0].has_match());
    }

    #[test]
    fn unknown_project_is_not_found() {
        let cat = Catalogue::new();
        let err = find_candidates(&cat, ProjectId::new(42), t(0)).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "project", .. }));
    }

    #[test]
    fn matching_reserves_nothing() {
        let mut cat = Catalogue::new();
        add(&mut cat, "Ram", &["SQL"]);
        let p = cat.resolve_project("P");
        cat.insert_task(p, "a", skill("SQL"), 1, t(0)).unwrap();
        let before = cat.clone();

        find_candidates(&cat, p, t(0)).unwrap();
        assert_eq!(cat, before);
    }

    #[test]
    fn task_past_the_horizon_is_listed_without_candidates() {
        use crate::domain::window::horizon_end;

        let mut cat = Catalogue::new();
        let ram = add(&mut cat, "Ram", &["SQL"]);
        let p = cat.resolve_project("P");
        let long = cat.insert_task(p, "long", skill("SQL"), 1_000, t(0)).unwrap();
        let short = cat.insert_task(p, "short", skill("SQL"), 1, t(0)).unwrap();

        let now = horizon_end() - Duration::hours(10);
        let matches = find_candidates(&cat, p, now).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].task_id, long);
        assert_eq!(matches[0].schedule, None);
        assert!(!matches[0].has_match());
        assert_eq!(matches[1].task_id, short);
        assert_eq!(matches[1].matched.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ram]);
    }
}
