//! Allocation planner.
//!
//! # 優先ルール（two-tier）
//! 1. Tier A (`idle`): 有資格者のうちアクティブな割り当てが 0 件の人がいれば、id 最小の人
//! 2. Tier B (`least_loaded`): 全員が稼働中なら、割り当て時間の合計が最小の人（同値なら id 最小）
//!
//! 明示的に resource が指定された場合は、その人が有資格かつ空いているかだけを検証する。
//!
//! プランとコミットは同じトランザクション内で行う。コミットが `Conflict` で
//! 弾かれた場合はトランザクションごと捨てて最初から計画し直す（engine 側の retry）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::availability::{AvailabilityIndex, Candidate};
use crate::domain::{Assignment, EngineError, ProjectId, ResourceId, Skill, TaskId};
use crate::store::Catalogue;

/// Raw allocation input as it arrives at the command boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub project_name: String,
    pub task_name: String,
    pub skill: String,
    pub duration_hours: i64,
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
}

/// An `AllocationRequest` that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub project_name: String,
    pub task_name: String,
    pub skill: Skill,
    pub duration_hours: u32,
    pub resource_id: Option<ResourceId>,
}

impl AllocationRequest {
    pub fn validate(&self) -> Result<ValidatedRequest, EngineError> {
        let project_name = required("project name", &self.project_name)?;
        let task_name = required("task name", &self.task_name)?;
        let skill = Skill::parse(&self.skill)?;
        let duration_hours = u32::try_from(self.duration_hours)
            .ok()
            .filter(|h| *h >= 1)
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "duration_hours must be a positive number of hours, got {}",
                    self.duration_hours
                ))
            })?;
        Ok(ValidatedRequest {
            project_name,
            task_name,
            skill,
            duration_hours,
            resource_id: self.resource_id,
        })
    }
}

fn required(what: &str, raw: &str) -> Result<String, EngineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Which rule picked the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Explicit,
    Idle,
    LeastLoaded,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Explicit => "explicit",
            Tier::Idle => "idle",
            Tier::LeastLoaded => "least_loaded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub resource_id: ResourceId,
    pub tier: Tier,
}

/// Two-tier choice over the qualified set. Pure; `None` iff `qualified` is empty.
pub fn select(qualified: &[Candidate]) -> Option<Selection> {
    let idle = qualified
        .iter()
        .filter(|c| c.is_fully_free())
        .min_by_key(|c| c.resource_id);
    if let Some(c) = idle {
        return Some(Selection {
            resource_id: c.resource_id,
            tier: Tier::Idle,
        });
    }
    qualified
        .iter()
        .min_by_key(|c| (c.workload_hours, c.resource_id))
        .map(|c| Selection {
            resource_id: c.resource_id,
            tier: Tier::LeastLoaded,
        })
}

/// A committed allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub project_id: ProjectId,
    pub task_id: TaskId,
    pub resource_name: String,
    pub tier: Tier,
    pub assignment: Assignment,
}

/// Result of one allocation transaction.
///
/// `Rejected` still commits: the task is kept Pending so it shows up in later
/// matches. `reason` is `NoQualifiedResource` or `ResourceUnavailable`.
#[derive(Debug)]
pub enum AllocationOutcome {
    Allocated(Allocation),
    Rejected { task_id: TaskId, reason: EngineError },
}

/// Create the task and, if possible, book it. Runs inside a transaction.
pub fn plan_and_commit(
    catalogue: &mut Catalogue,
    request: &ValidatedRequest,
    now: DateTime<Utc>,
) -> Result<AllocationOutcome, EngineError> {
    let project_id = catalogue.resolve_project(&request.project_name);
    let task_id = catalogue.insert_task(
        project_id,
        &request.task_name,
        request.skill.clone(),
        request.duration_hours,
        now,
    )?;
    let window = catalogue.task(task_id)?.prospective_window(now)?;

    let selection = {
        let index = AvailabilityIndex::build(catalogue);
        match request.resource_id {
            Some(resource_id) => check_explicit(&index, resource_id, &request.skill, &window)
                .map(|()| Selection {
                    resource_id,
                    tier: Tier::Explicit,
                }),
            None => {
                let qualified = index.qualified(&request.skill, &window);
                tracing::debug!(
                    skill = %request.skill,
                    qualified = ?qualified.iter().map(|c| c.resource_id.get()).collect::<Vec<_>>(),
                    "qualified set"
                );
                select(&qualified).ok_or_else(|| EngineError::NoQualifiedResource {
                    skill: request.skill.to_string(),
                })
            }
        }
    };

    let selection = match selection {
        Ok(selection) => selection,
        Err(reason) => return Ok(AllocationOutcome::Rejected { task_id, reason }),
    };

    let assignment = catalogue.commit_assignment(task_id, selection.resource_id, now)?;
    let resource_name = catalogue.resource(selection.resource_id)?.name.clone();
    Ok(AllocationOutcome::Allocated(Allocation {
        project_id,
        task_id,
        resource_name,
        tier: selection.tier,
        assignment,
    }))
}

fn check_explicit(
    index: &AvailabilityIndex<'_>,
    resource_id: ResourceId,
    skill: &Skill,
    window: &crate::domain::ScheduleWindow,
) -> Result<(), EngineError> {
    let resource = index.catalogue().resource(resource_id).map_err(|_| {
        EngineError::ResourceUnavailable(format!("resource {resource_id} does not exist"))
    })?;
    if !resource.has_skill(skill) {
        return Err(EngineError::ResourceUnavailable(format!(
            "{} does not have skill '{skill}'",
            resource.name
        )));
    }
    if !index.is_free(resource, window) {
        return Err(EngineError::ResourceUnavailable(format!(
            "{} is not free for {window}",
            resource.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AvailabilityWindow, TaskState};
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn add(cat: &mut Catalogue, name: &str, skills: &[&str]) -> ResourceId {
        cat.insert_resource(
            name,
            skills.iter().map(|s| Skill::parse(s).unwrap()).collect(),
            vec![AvailabilityWindow::full_horizon()],
            t(0),
        )
        .unwrap()
    }

    fn request(skill: &str, hours: i64) -> ValidatedRequest {
        AllocationRequest {
            project_name: "E-commerce Website".into(),
            task_name: format!("{skill} work"),
            skill: skill.into(),
            duration_hours: hours,
            resource_id: None,
        }
        .validate()
        .unwrap()
    }

    fn allocated(outcome: AllocationOutcome) -> Allocation {
        match outcome {
            AllocationOutcome::Allocated(a) => a,
            AllocationOutcome::Rejected { reason, .. } => panic!("rejected: {reason}"),
        }
    }

    fn candidate(id: u64, active: usize, hours: u64) -> Candidate {
        Candidate {
            resource_id: ResourceId::new(id),
            name: format!("r{id}"),
            active_assignments: active,
            workload_hours: hours,
        }
    }

    #[rstest]
    #[case::empty_project("  ", "t", "SQL", 1)]
    #[case::empty_task("P", "", "SQL", 1)]
    #[case::empty_skill("P", "t", " ", 1)]
    #[case::zero_hours("P", "t", "SQL", 0)]
    #[case::negative_hours("P", "t", "SQL", -3)]
    fn invalid_requests_are_rejected(
        #[case] project: &str,
        #[case] task: &str,
        #[case] skill: &str,
        #[case] hours: i64,
    ) {
        let req = AllocationRequest {
            project_name: project.into(),
            task_name: task.into(),
            skill: skill.into(),
            duration_hours: hours,
            resource_id: None,
        };
        assert!(matches!(req.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn validation_trims_names() {
        let req = AllocationRequest {
            project_name: " P ".into(),
            task_name: " t ".into(),
            skill: " SQL ".into(),
            duration_hours: 2,
            resource_id: None,
        }
        .validate()
        .unwrap();
        assert_eq!((req.project_name.as_str(), req.task_name.as_str()), ("P", "t"));
        assert_eq!(req.skill.as_str(), "SQL");
    }

    #[test]
    fn select_prefers_idle_over_lighter_load() {
        // r1 carries 1h, r3 is idle: idle wins even though r1 has the smaller id.
        let picked = select(&[candidate(1, 1, 1), candidate(3, 0, 0), candidate(2, 2, 9)]).unwrap();
        assert_eq!(picked.resource_id, ResourceId::new(3));
        assert_eq!(picked.tier, Tier::Idle);
    }

    #[rstest]
    #[case::min_workload(vec![candidate(1, 1, 4), candidate(2, 1, 2)], 2)]
    #[case::tie_goes_to_smaller_id(vec![candidate(5, 1, 3), candidate(4, 2, 3)], 4)]
    fn select_least_loaded(#[case] qualified: Vec<Candidate>, #[case] expected: u64) {
        let picked = select(&qualified).unwrap();
        assert_eq!(picked.resource_id, ResourceId::new(expected));
        assert_eq!(picked.tier, Tier::LeastLoaded);
    }

    #[test]
    fn select_on_empty_set_is_none() {
        assert_eq!(select(&[]), None);
    }

    #[test]
    fn scenario_a_both_free_picks_smaller_id() {
        let mut cat = Catalogue::new();
        let r1 = add(&mut cat, "R1", &["SQL"]);
        add(&mut cat, "R2", &["SQL"]);

        let a = allocated(plan_and_commit(&mut cat, &request("SQL", 4), t(0)).unwrap());

        assert_eq!(a.assignment.resource_id, r1);
        assert_eq!(a.tier, Tier::Idle);
        assert_eq!(cat.task(a.task_id).unwrap().state, TaskState::Assigned);
        cat.verify_invariants().unwrap();
    }

    #[test]
    fn scenario_b_free_resource_beats_busy_one() {
        let mut cat = Catalogue::new();
        let r1 = add(&mut cat, "R1", &["SQL"]);
        let r2 = add(&mut cat, "R2", &["SQL"]);
        let first = allocated(plan_and_commit(&mut cat, &request("SQL", 8), t(0)).unwrap());
        assert_eq!(first.assignment.resource_id, r1);

        // R1 is booked until t(8); a request after that still prefers idle R2.
        let second = allocated(plan_and_commit(&mut cat, &request("SQL", 2), t(9)).unwrap());
        assert_eq!(second.assignment.resource_id, r2);
        assert_eq!(second.tier, Tier::Idle);
    }

    #[test]
    fn scenario_c_all_busy_picks_least_workload() {
        let mut cat = Catalogue::new();
        let r1 = add(&mut cat, "R1", &["SQL"]);
        let r2 = add(&mut cat, "R2", &["SQL"]);
        let four = allocated(plan_and_commit(&mut cat, &request("SQL", 4), t(0)).unwrap());
        let two = allocated(plan_and_commit(&mut cat, &request("SQL", 2), t(0)).unwrap());
        assert_eq!((four.assignment.resource_id, two.assignment.resource_id), (r1, r2));

        // Both windows are over, both resources still carry active work.
        let third = allocated(plan_and_commit(&mut cat, &request("SQL", 1), t(5)).unwrap());
        assert_eq!(third.assignment.resource_id, r2);
        assert_eq!(third.tier, Tier::LeastLoaded);
        cat.verify_invariants().unwrap();
    }

    #[test]
    fn scenario_d_unknown_skill_leaves_task_pending() {
        let mut cat = Catalogue::new();
        add(&mut cat, "R1", &["SQL"]);

        let outcome = plan_and_commit(&mut cat, &request("Rust", 3), t(0)).unwrap();

        let AllocationOutcome::Rejected { task_id, reason } = outcome else {
            panic!("expected rejection");
        };
        assert!(matches!(reason, EngineError::NoQualifiedResource { .. }));
        assert_eq!(cat.task(task_id).unwrap().state, TaskState::Pending);
        assert_eq!(cat.active_assignments().count(), 0);
    }

    #[test]
    fn project_is_created_once_per_name() {
        let mut cat = Catalogue::new();
        add(&mut cat, "R1", &["SQL"]);
        let a = allocated(plan_and_commit(&mut cat, &request("SQL", 1), t(0)).unwrap());
        let b = plan_and_commit(&mut cat, &request("SQL", 1), t(0)).unwrap();
        let AllocationOutcome::Rejected { task_id, .. } = b else {
            panic!("R1 is busy");
        };
        assert_eq!(cat.task(task_id).unwrap().project_id, a.project_id);
        assert_eq!(cat.projects().count(), 1);
    }

    #[test]
    fn explicit_resource_is_used_when_valid() {
        let mut cat = Catalogue::new();
        add(&mut cat, "R1", &["SQL"]);
        let r2 = add(&mut cat, "R2", &["SQL"]);
        let mut req = request("SQL", 2);
        req.resource_id = Some(r2);

        let a = allocated(plan_and_commit(&mut cat, &req, t(0)).unwrap());
        assert_eq!(a.assignment.resource_id, r2);
        assert_eq!(a.tier, Tier::Explicit);
        assert_eq!(a.resource_name, "R2");
    }

    #[rstest]
    #[case::unknown_resource(99, "SQL")]
    #[case::missing_skill(1, "C#")]
    #[case::busy(2, "SQL")]
    fn explicit_resource_that_cannot_take_the_task(#[case] id: u64, #[case] skill: &str) {
        let mut cat = Catalogue::new();
        add(&mut cat, "R1", &["SQL"]);
        let r2 = add(&mut cat, "R2", &["SQL"]);
        let mut busy = request("SQL", 8);
        busy.resource_id = Some(r2);
        allocated(plan_and_commit(&mut cat, &busy, t(0)).unwrap());

        let mut req = request(skill, 1);
        req.resource_id = Some(ResourceId::new(id));
        let outcome = plan_and_commit(&mut cat, &req, t(1)).unwrap();

        let AllocationOutcome::Rejected { task_id, reason } = outcome else {
            panic!("expected rejection");
        };
        assert!(matches!(reason, EngineError::ResourceUnavailable(_)), "{reason}");
        assert_eq!(cat.task(task_id).unwrap().state, TaskState::Pending);
    }

    #[test]
    fn identical_state_gives_identical_choice() {
        let mut base = Catalogue::new();
        add(&mut base, "R1", &["SQL"]);
        add(&mut base, "R2", &["SQL"]);
        add(&mut base, "R3", &["SQL"]);
        allocated(plan_and_commit(&mut base, &request("SQL", 3), t(0)).unwrap());

        let picks: Vec<ResourceId> = (0..5)
            .map(|_| {
                let mut cat = base.clone();
                allocated(plan_and_commit(&mut cat, &request("SQL", 1), t(1)).unwrap())
                    .assignment
                    .resource_id
            })
            .collect();
        assert!(picks.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(picks[0], ResourceId::new(2));
    }
}
