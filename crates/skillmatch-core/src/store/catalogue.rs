//! Catalogue: the entity state behind the store.
//!
//! Design:
//! - This is the "single source of truth" for projects, tasks, resources,
//!   active assignments and completion history.
//! - Every mutation validates the invariants it could break, so a closure
//!   running inside a transaction cannot commit an inconsistent ledger.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::snapshot::Snapshot;
use crate::domain::{
    Assignment, AssignmentId, AvailabilityWindow, CompletionRecord, EngineError, IdSequence,
    Project, ProjectId, Resource, ResourceId, Skill, TaskId, TaskRecord, TaskState,
};
use crate::observability::LedgerCounts;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue {
    projects: BTreeMap<ProjectId, Project>,
    tasks: BTreeMap<TaskId, TaskRecord>,
    resources: BTreeMap<ResourceId, Resource>,
    /// Active assignments only.
    assignments: BTreeMap<AssignmentId, Assignment>,
    history: Vec<CompletionRecord>,
    ids: IdSequence,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- projects ----

    pub fn project(&self, id: ProjectId) -> Result<&Project, EngineError> {
        self.projects
            .get(&id)
            .ok_or_else(|| EngineError::not_found("project", id.get()))
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.name == name)
    }

    /// Idempotent by name: the same name always yields the same project.
    pub fn resolve_project(&mut self, name: &str) -> ProjectId {
        if let Some(project) = self.project_by_name(name) {
            return project.id;
        }
        let id = self.ids.project();
        self.projects.insert(
            id,
            Project {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    // ---- tasks ----

    pub fn task(&self, id: TaskId) -> Result<&TaskRecord, EngineError> {
        self.tasks
            .get(&id)
            .ok_or_else(|| EngineError::not_found("task", id.get()))
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.values()
    }

    /// Tasks of a project in the given state, ordered by id.
    pub fn tasks_of(
        &self,
        project_id: ProjectId,
        state: TaskState,
    ) -> impl Iterator<Item = &TaskRecord> {
        self.tasks
            .values()
            .filter(move |t| t.project_id == project_id && t.state == state)
    }

    pub fn insert_task(
        &mut self,
        project_id: ProjectId,
        name: &str,
        required_skill: Skill,
        duration_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<TaskId, EngineError> {
        self.project(project_id)?;
        let id = self.ids.task();
        let record = TaskRecord::new(
            id,
            project_id,
            name.to_string(),
            required_skill,
            duration_hours,
            now,
        );
        self.tasks.insert(id, record);
        Ok(id)
    }

    // ---- resources ----

    pub fn resource(&self, id: ResourceId) -> Result<&Resource, EngineError> {
        self.resources
            .get(&id)
            .ok_or_else(|| EngineError::not_found("resource", id.get()))
    }

    /// Ordered by id.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn resource_by_name(&self, name: &str) -> Option<&Resource> {
        self.resources.values().find(|r| r.name == name)
    }

    pub fn insert_resource(
        &mut self,
        name: &str,
        skills: BTreeSet<Skill>,
        availability: Vec<AvailabilityWindow>,
        now: DateTime<Utc>,
    ) -> Result<ResourceId, EngineError> {
        if skills.is_empty() {
            return Err(EngineError::Validation(
                "a resource needs at least one skill".into(),
            ));
        }
        if availability.is_empty() {
            return Err(EngineError::Validation(
                "a resource needs at least one availability window".into(),
            ));
        }
        let id = self.ids.resource();
        self.resources.insert(
            id,
            Resource {
                id,
                name: name.to_string(),
                skills,
                availability,
                created_at: now,
            },
        );
        Ok(id)
    }

    /// Add skills/windows to an existing resource. Nothing is ever removed.
    pub fn grow_resource(
        &mut self,
        id: ResourceId,
        skills: &BTreeSet<Skill>,
        availability: &[AvailabilityWindow],
    ) -> Result<bool, EngineError> {
        let resource = self
            .resources
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("resource", id.get()))?;
        Ok(resource.grow(skills, availability))
    }

    /// Distinct skills, derived from resource skill sets.
    pub fn skills(&self) -> BTreeSet<&Skill> {
        self.resources.values().flat_map(|r| r.skills.iter()).collect()
    }

    // ---- assignments ----

    pub fn active_assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    pub fn assignments_of(&self, resource_id: ResourceId) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .values()
            .filter(move |a| a.resource_id == resource_id)
    }

    pub fn assignment_for_task(&self, task_id: TaskId) -> Option<&Assignment> {
        self.assignments.values().find(|a| a.task_id == task_id)
    }

    /// Book `resource_id` for `task_id` starting at `now`.
    ///
    /// This is the commit point: skill, availability and the no-overlap rule
    /// are re-checked here against the current ledger. A stale plan fails
    /// with `Conflict`.
    pub fn commit_assignment(
        &mut self,
        task_id: TaskId,
        resource_id: ResourceId,
        now: DateTime<Utc>,
    ) -> Result<Assignment, EngineError> {
        let task = self.task(task_id)?;
        if self.assignment_for_task(task_id).is_some() || task.state == TaskState::Assigned {
            return Err(EngineError::DuplicateAssignment(task_id.to_string()));
        }
        if task.state != TaskState::Pending {
            return Err(EngineError::InvalidState(format!(
                "task {task_id} is {:?} and cannot be assigned",
                task.state
            )));
        }
        let window = task.prospective_window(now)?;
        let duration_hours = task.duration_hours;
        let skill = task.required_skill.clone();

        let resource = self.resource(resource_id)?;
        if !resource.has_skill(&skill) {
            return Err(EngineError::Conflict(format!(
                "{resource_id} does not hold skill '{skill}'"
            )));
        }
        if !resource.is_available_for(&window) {
            return Err(EngineError::Conflict(format!(
                "{resource_id} is not available for {window}"
            )));
        }
        if let Some(clash) = self
            .assignments_of(resource_id)
            .find(|a| a.window.overlaps(&window))
        {
            return Err(EngineError::Conflict(format!(
                "{resource_id} is already booked for {} ({})",
                clash.task_id, clash.window
            )));
        }

        let assignment = Assignment {
            id: self.ids.assignment(),
            task_id,
            resource_id,
            window,
            duration_hours,
            assigned_at: now,
        };
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.mark_assigned(window, now)?;
        }
        self.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    /// Assigned -> Completed: drop the active assignment and append history.
    pub fn release_assignment(
        &mut self,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> Result<CompletionRecord, EngineError> {
        let task = self.task(task_id)?;
        match task.state {
            TaskState::Assigned => {}
            TaskState::Pending => {
                return Err(EngineError::InvalidState(format!(
                    "task {task_id} is pending and has not been assigned"
                )));
            }
            TaskState::Completed => {
                return Err(EngineError::InvalidState(format!(
                    "task {task_id} is already completed"
                )));
            }
        }
        let project_id = task.project_id;
        let assignment = self
            .assignment_for_task(task_id)
            .cloned()
            .ok_or_else(|| {
                EngineError::InvalidState(format!("task {task_id} has no active assignment"))
            })?;

        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.mark_completed(assignment.resource_id, now)?;
        }
        self.assignments.remove(&assignment.id);

        let record = CompletionRecord {
            task_id,
            project_id,
            resource_id: assignment.resource_id,
            window: assignment.window,
            duration_hours: assignment.duration_hours,
            completion_date: now,
        };
        self.history.push(record.clone());
        Ok(record)
    }

    /// Completion history, newest first (ties: higher task id first).
    pub fn history(&self) -> Vec<&CompletionRecord> {
        let mut records: Vec<&CompletionRecord> = self.history.iter().collect();
        records.sort_by(|a, b| {
            b.completion_date
                .cmp(&a.completion_date)
                .then(b.task_id.cmp(&a.task_id))
        });
        records
    }

    pub fn counts(&self) -> LedgerCounts {
        let mut counts = LedgerCounts {
            resources: self.resources.len(),
            active_assignments: self.assignments.len(),
            ..LedgerCounts::default()
        };
        for task in self.tasks.values() {
            match task.state {
                TaskState::Pending => counts.pending += 1,
                TaskState::Assigned => counts.assigned += 1,
                TaskState::Completed => counts.completed += 1,
            }
        }
        counts
    }

    /// Check every ledger invariant. Used when loading a snapshot and in tests.
    pub fn verify_invariants(&self) -> Result<(), EngineError> {
        let broken = |msg: String| Err(EngineError::Persistence(format!("invariant violated: {msg}")));

        for task in self.tasks.values() {
            if !self.projects.contains_key(&task.project_id) {
                return broken(format!("{} references unknown {}", task.id, task.project_id));
            }
            let active = self
                .assignments
                .values()
                .filter(|a| a.task_id == task.id)
                .count();
            let expected = usize::from(task.state == TaskState::Assigned);
            if active != expected {
                return broken(format!(
                    "{} is {:?} with {active} active assignments",
                    task.id, task.state
                ));
            }
        }

        let mut names = BTreeSet::new();
        for project in self.projects.values() {
            if !names.insert(project.name.as_str()) {
                return broken(format!("duplicate project name '{}'", project.name));
            }
        }

        for resource in self.resources.values() {
            if resource.skills.is_empty() || resource.availability.is_empty() {
                return broken(format!("{} has no skills or no availability", resource.id));
            }
            let booked: Vec<&Assignment> = self.assignments_of(resource.id).collect();
            for (i, a) in booked.iter().enumerate() {
                for b in &booked[i + 1..] {
                    if a.window.overlaps(&b.window) {
                        return broken(format!(
                            "{} is double-booked ({} and {})",
                            resource.id, a.task_id, b.task_id
                        ));
                    }
                }
            }
        }

        for assignment in self.assignments.values() {
            if !self.resources.contains_key(&assignment.resource_id) {
                return broken(format!(
                    "{} references unknown {}",
                    assignment.id, assignment.resource_id
                ));
            }
            let Ok(task) = self.task(assignment.task_id) else {
                return broken(format!(
                    "{} references unknown {}",
                    assignment.id, assignment.task_id
                ));
            };
            if task.schedule != Some(assignment.window) {
                return broken(format!("{} window differs from its task", assignment.id));
            }
        }

        if !self.ids.is_ahead_of(
            self.projects.keys().next_back().map_or(0, |id| id.get()),
            self.tasks.keys().next_back().map_or(0, |id| id.get()),
            self.resources.keys().next_back().map_or(0, |id| id.get()),
            self.assignments.keys().next_back().map_or(0, |id| id.get()),
        ) {
            return broken("id sequence is behind issued ids".into());
        }
        Ok(())
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: Snapshot::VERSION,
            ids: self.ids.clone(),
            projects: self.projects.values().cloned().collect(),
            resources: self.resources.values().cloned().collect(),
            tasks: self.tasks.values().cloned().collect(),
            assignments: self.assignments.values().cloned().collect(),
            history: self.history.clone(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, EngineError> {
        if snapshot.version != Snapshot::VERSION {
            return Err(EngineError::Persistence(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version,
                Snapshot::VERSION
            )));
        }
        let catalogue = Self {
            projects: snapshot.projects.into_iter().map(|p| (p.id, p)).collect(),
            tasks: snapshot.tasks.into_iter().map(|t| (t.id, t)).collect(),
            resources: snapshot.resources.into_iter().map(|r| (r.id, r)).collect(),
            assignments: snapshot.assignments.into_iter().map(|a| (a.id, a)).collect(),
            history: snapshot.history,
            ids: snapshot.ids,
        };
        catalogue.verify_invariants()?;
        Ok(catalogue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn sql() -> Skill {
        Skill::parse("SQL").unwrap()
    }

    fn with_resource() -> (Catalogue, ResourceId, ProjectId) {
        let mut cat = Catalogue::new();
        let r = cat
            .insert_resource(
                "Ram",
                [sql()].into_iter().collect(),
                vec![AvailabilityWindow::new(t(0), t(48)).unwrap()],
                t(0),
            )
            .unwrap();
        let p = cat.resolve_project("E-commerce Website");
        (cat, r, p)
    }

    #[test]
    fn resolve_project_is_idempotent_by_name() {
        let mut cat = Catalogue::new();
        let a = cat.resolve_project("Alpha");
        let b = cat.resolve_project("Beta");
        assert_ne!(a, b);
        assert_eq!(cat.resolve_project("Alpha"), a);
        assert_eq!(cat.projects().count(), 2);
    }

    #[test]
    fn insert_resource_requires_skills_and_windows() {
        let mut cat = Catalogue::new();
        let no_skills = cat.insert_resource("x", BTreeSet::new(), vec![AvailabilityWindow::full_horizon()], t(0));
        let no_windows = cat.insert_resource("x", [sql()].into_iter().collect(), vec![], t(0));
        assert!(matches!(no_skills, Err(EngineError::Validation(_))));
        assert!(matches!(no_windows, Err(EngineError::Validation(_))));
        assert_eq!(cat.resources().count(), 0);
    }

    #[test]
    fn commit_books_resource_and_marks_task() {
        let (mut cat, r, p) = with_resource();
        let task = cat.insert_task(p, "Setup Database", sql(), 4, t(0)).unwrap();

        let assignment = cat.commit_assignment(task, r, t(1)).unwrap();

        assert_eq!(assignment.window, crate::domain::ScheduleWindow::starting_at(t(1), 4).unwrap());
        assert_eq!(cat.task(task).unwrap().state, TaskState::Assigned);
        assert_eq!(cat.task(task).unwrap().schedule, Some(assignment.window));
        cat.verify_invariants().unwrap();
    }

    #[test]
    fn second_commit_for_same_task_is_a_duplicate() {
        let (mut cat, r, p) = with_resource();
        let task = cat.insert_task(p, "a", sql(), 1, t(0)).unwrap();
        cat.commit_assignment(task, r, t(0)).unwrap();

        let err = cat.commit_assignment(task, r, t(10)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAssignment(_)));
    }

    #[rstest]
    #[case::overlap(t(2), "already booked")]
    #[case::outside_availability(t(47), "not available")]
    fn stale_plans_fail_with_conflict(#[case] at: DateTime<Utc>, #[case] needle: &str) {
        let (mut cat, r, p) = with_resource();
        let first = cat.insert_task(p, "a", sql(), 4, t(0)).unwrap();
        let second = cat.insert_task(p, "b", sql(), 4, t(0)).unwrap();
        cat.commit_assignment(first, r, t(0)).unwrap();
        let before = cat.clone();

        let err = cat.commit_assignment(second, r, at).unwrap_err();

        assert!(err.is_retryable());
        assert!(err.to_string().contains(needle), "{err}");
        assert_eq!(cat, before);
    }

    #[test]
    fn commit_rejects_resource_without_skill() {
        let (mut cat, r, p) = with_resource();
        let task = cat
            .insert_task(p, "ui", Skill::parse("Node.JS").unwrap(), 1, t(0))
            .unwrap();
        assert!(matches!(
            cat.commit_assignment(task, r, t(0)),
            Err(EngineError::Conflict(_))
        ));
    }

    #[test]
    fn release_moves_task_to_history() {
        let (mut cat, r, p) = with_resource();
        let task = cat.insert_task(p, "a", sql(), 2, t(0)).unwrap();
        cat.commit_assignment(task, r, t(0)).unwrap();

        let record = cat.release_assignment(task, t(3)).unwrap();

        assert_eq!(record.resource_id, r);
        assert_eq!(record.completion_date, t(3));
        assert_eq!(cat.active_assignments().count(), 0);
        let done = cat.task(task).unwrap();
        assert_eq!(done.state, TaskState::Completed);
        assert_eq!(done.completed_by, Some(r));
        cat.verify_invariants().unwrap();
    }

    #[rstest]
    #[case::pending(false)]
    #[case::completed(true)]
    fn release_requires_an_assigned_task(#[case] finish_first: bool) {
        let (mut cat, r, p) = with_resource();
        let task = cat.insert_task(p, "a", sql(), 2, t(0)).unwrap();
        if finish_first {
            cat.commit_assignment(task, r, t(0)).unwrap();
            cat.release_assignment(task, t(1)).unwrap();
        }
        let history = cat.history().len();

        let err = cat.release_assignment(task, t(5)).unwrap_err();

        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(cat.history().len(), history);
    }

    #[test]
    fn history_is_newest_first_with_task_id_tiebreak() {
        let (mut cat, r, p) = with_resource();
        let ids: Vec<TaskId> = (0..3)
            .map(|i| cat.insert_task(p, &format!("t{i}"), sql(), 1, t(0)).unwrap())
            .collect();
        for (i, id) in ids.iter().enumerate() {
            cat.commit_assignment(*id, r, t(i as i64 * 2)).unwrap();
        }
        cat.release_assignment(ids[0], t(10)).unwrap();
        cat.release_assignment(ids[1], t(12)).unwrap();
        cat.release_assignment(ids[2], t(12)).unwrap();

        let order: Vec<TaskId> = cat.history().iter().map(|h| h.task_id).collect();
        assert_eq!(order, vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn counts_track_every_state() {
        let (mut cat, r, p) = with_resource();
        let a = cat.insert_task(p, "a", sql(), 1, t(0)).unwrap();
        let b = cat.insert_task(p, "b", sql(), 1, t(0)).unwrap();
        cat.insert_task(p, "c", sql(), 1, t(0)).unwrap();
        cat.commit_assignment(a, r, t(0)).unwrap();
        cat.commit_assignment(b, r, t(2)).unwrap();
        cat.release_assignment(a, t(1)).unwrap();

        let counts = cat.counts();
        assert_eq!(
            (counts.pending, counts.assigned, counts.completed),
            (1, 1, 1)
        );
        assert_eq!((counts.resources, counts.active_assignments), (1, 1));
    }

    #[test]
    fn snapshot_restores_identical_catalogue() {
        let (mut cat, r, p) = with_resource();
        let a = cat.insert_task(p, "a", sql(), 1, t(0)).unwrap();
        cat.commit_assignment(a, r, t(0)).unwrap();

        let restored = Catalogue::from_snapshot(cat.to_snapshot()).unwrap();
        assert_eq!(restored, cat);
    }

    #[test]
    fn snapshot_with_unknown_version_is_rejected() {
        let mut snapshot = Catalogue::new().to_snapshot();
        snapshot.version = 99;
        assert!(matches!(
            Catalogue::from_snapshot(snapshot),
            Err(EngineError::Persistence(_))
        ));
    }
}
