//! Engine - コマンド単位のファサード
//!
//! # 責務
//! - 時刻を Clock から 1 回だけ読み、トランザクションに渡す
//! - コマンドごとに RequestId 付きの span を張る
//! - allocate の Conflict を RetryPolicy に従って再計画する
//!
//! ドメインのルールそのものは `engine` モジュールにあります。

use std::sync::Arc;

use tracing::Instrument;

use crate::domain::{EngineError, ProjectId, TaskId};
use crate::engine::{
    self, retry_on_conflict, AllocationOutcome, AllocationRequest, Completion, NewResource,
    Onboarded, RetryPolicy, TaskMatch,
};
use crate::observability::{
    self, HistoryEntry, LedgerCounts, ProjectEntry, ResourceAssignments,
};
use crate::ports::{Clock, IdGenerator};
use crate::store::EntityStore;

/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct Engine {
    store: EntityStore,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    retry: RetryPolicy,
}

impl Engine {
    pub fn new(
        store: EntityStore,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            retry,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn span(&self, command: &'static str) -> tracing::Span {
        let request_id = self.ids.request_id();
        tracing::info_span!("command", command, request_id = %request_id)
    }

    /// Pending tasks of the project with their current candidates. Read-only.
    pub async fn find_candidates(&self, project_id: ProjectId) -> Result<Vec<TaskMatch>, EngineError> {
        let now = self.clock.now();
        async move {
            self.store
                .read(move |cat| engine::find_candidates(cat, project_id, now))
                .await?
        }
        .instrument(self.span("match"))
        .await
    }

    /// Create the task and book a resource for it.
    ///
    /// `Err` is reserved for invalid input and store failures; "nobody can
    /// take it" is an `AllocationOutcome::Rejected` with the task kept Pending.
    pub async fn allocate(&self, request: &AllocationRequest) -> Result<AllocationOutcome, EngineError> {
        async move {
            let validated = request.validate().inspect_err(|e| {
                tracing::warn!(error = %e, "allocation request rejected");
            })?;

            let outcome = retry_on_conflict(&self.retry, |_attempt| {
                let request = validated.clone();
                let now = self.clock.now();
                async move {
                    self.store
                        .transaction(move |cat| engine::plan_and_commit(cat, &request, now))
                        .await
                }
            })
            .await?;

            match &outcome {
                AllocationOutcome::Allocated(a) => tracing::info!(
                    task = %a.task_id,
                    resource = %a.assignment.resource_id,
                    tier = a.tier.as_str(),
                    window = %a.assignment.window,
                    "task allocated"
                ),
                AllocationOutcome::Rejected { task_id, reason } => tracing::warn!(
                    task = %task_id,
                    reason = %reason,
                    "task left pending"
                ),
            }
            Ok(outcome)
        }
        .instrument(self.span("allocate"))
        .await
    }

    pub async fn complete(&self, task_id: TaskId) -> Result<Completion, EngineError> {
        async move {
            let now = self.clock.now();
            let done = self
                .store
                .transaction(move |cat| engine::complete(cat, task_id, now))
                .await
                .inspect_err(|e| tracing::warn!(task = %task_id, error = %e, "completion rejected"))?;
            tracing::info!(
                task = %task_id,
                resource = %done.record.resource_id,
                "task completed"
            );
            Ok(done)
        }
        .instrument(self.span("complete"))
        .await
    }

    pub async fn add_resource(&self, input: &NewResource) -> Result<Onboarded, EngineError> {
        async move {
            let now = self.clock.now();
            let onboarded = self
                .store
                .transaction(move |cat| engine::onboard(cat, input, now))
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "onboarding rejected"))?;
            tracing::info!(
                resource = %onboarded.resource_id,
                created = onboarded.created,
                changed = onboarded.changed,
                "resource onboarded"
            );
            Ok(onboarded)
        }
        .instrument(self.span("add_resource"))
        .await
    }

    pub async fn projects(&self) -> Result<Vec<ProjectEntry>, EngineError> {
        self.store
            .read(observability::projects_view)
            .instrument(self.span("projects"))
            .await
    }

    pub async fn skills(&self) -> Result<Vec<String>, EngineError> {
        self.store
            .read(observability::skills_view)
            .instrument(self.span("skills"))
            .await
    }

    pub async fn assignments(&self) -> Result<Vec<ResourceAssignments>, EngineError> {
        self.store
            .read(observability::assignments_view)
            .instrument(self.span("assignments"))
            .await
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, EngineError> {
        self.store
            .read(observability::history_view)
            .instrument(self.span("history"))
            .await
    }

    pub async fn status(&self) -> Result<LedgerCounts, EngineError> {
        self.store
            .read(|cat| cat.counts())
            .instrument(self.span("status"))
            .await
    }
}
