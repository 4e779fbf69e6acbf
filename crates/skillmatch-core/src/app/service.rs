//! Typed command surface.
//!
//! `Command` is what a caller sends, `Response` is what it gets back. Field
//! names of the responses are a fixed wire contract:
//!
//! | command        | success                                              | failure                     |
//! |----------------|------------------------------------------------------|-----------------------------|
//! | `match`        | `[{task_name, required_skill, schedule, matched_resources: [{id, name}]}]` | `{success: false, message}` |
//! | `allocate`     | `{success: true, message, allocated_to}`             | `{success: false, message}` |
//! | `add_resource` | `{success: true, message}`                           | `{success: false, message}` |
//! | `complete`     | `{success: true, message}`                           | `{success: false, message}` |

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::engine::Engine;
use crate::domain::{EngineError, ErrorKind, ProjectId, TaskId};
use crate::engine::{AllocationOutcome, AllocationRequest, NewResource, ResourceRef, TaskMatch};
use crate::observability::{HistoryEntry, LedgerCounts, ProjectEntry, ResourceAssignments};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Match { project_id: ProjectId },
    Allocate(AllocationRequest),
    AddResource(NewResource),
    Complete { task_id: TaskId },
    Projects,
    Skills,
    Assignments,
    History,
    Status,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Match { .. } => "match",
            Command::Allocate(_) => "allocate",
            Command::AddResource(_) => "add_resource",
            Command::Complete { .. } => "complete",
            Command::Projects => "projects",
            Command::Skills => "skills",
            Command::Assignments => "assignments",
            Command::History => "history",
            Command::Status => "status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub task_name: String,
    pub required_skill: String,
    pub schedule: String,
    pub matched_resources: Vec<ResourceRef>,
}

impl From<TaskMatch> for MatchEntry {
    fn from(m: TaskMatch) -> Self {
        Self {
            task_name: m.task_name,
            required_skill: m.required_skill.to_string(),
            schedule: m
                .schedule
                .map_or_else(|| "unschedulable".to_string(), |w| w.to_string()),
            matched_resources: m.matched,
        }
    }
}

/// Result of a state-changing command.
///
/// Serialized as `{success, message, allocated_to?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded {
        message: String,
        allocated_to: Option<String>,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Outcome::Succeeded {
            message: message.into(),
            allocated_to: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Succeeded { message, .. } | Outcome::Failed { message, .. } => message,
        }
    }
}

impl From<EngineError> for Outcome {
    fn from(err: EngineError) -> Self {
        Outcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct OutcomeWire<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    allocated_to: Option<&'a str>,
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Outcome::Succeeded {
                message,
                allocated_to,
            } => OutcomeWire {
                success: true,
                message,
                allocated_to: allocated_to.as_deref(),
            },
            Outcome::Failed { message, .. } => OutcomeWire {
                success: false,
                message,
                allocated_to: None,
            },
        };
        wire.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Matches(Vec<MatchEntry>),
    Projects(Vec<ProjectEntry>),
    Skills(Vec<String>),
    Assignments(Vec<ResourceAssignments>),
    History(Vec<HistoryEntry>),
    Status(LedgerCounts),
    Outcome(Outcome),
}

impl Response {
    /// The failure message, if this response reports one.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Response::Outcome(outcome) if !outcome.is_success() => Some(outcome.message()),
            _ => None,
        }
    }
}

impl From<EngineError> for Response {
    fn from(err: EngineError) -> Self {
        Response::Outcome(err.into())
    }
}

/// Run one command. Errors never escape: every failure becomes
/// `{success: false, message}`.
pub async fn execute(engine: &Engine, command: &Command) -> Response {
    match run(engine, command).await {
        Ok(response) => response,
        Err(err) => err.into(),
    }
}

async fn run(engine: &Engine, command: &Command) -> Result<Response, EngineError> {
    Ok(match command {
        Command::Match { project_id } => Response::Matches(
            engine
                .find_candidates(*project_id)
                .await?
                .into_iter()
                .map(MatchEntry::from)
                .collect(),
        ),
        Command::Allocate(request) => Response::Outcome(match engine.allocate(request).await? {
            AllocationOutcome::Allocated(a) => Outcome::Succeeded {
                message: format!(
                    "Task '{}' allocated to {} ({}, {} rule)",
                    request.task_name.trim(),
                    a.resource_name,
                    a.assignment.window,
                    a.tier.as_str()
                ),
                allocated_to: Some(a.resource_name),
            },
            AllocationOutcome::Rejected { task_id, reason } => Outcome::Failed {
                kind: reason.kind(),
                message: format!("{reason}; {task_id} remains pending"),
            },
        }),
        Command::AddResource(input) => {
            let onboarded = engine.add_resource(input).await?;
            let message = match (onboarded.created, onboarded.changed) {
                (true, _) => format!("Resource '{}' added ({})", onboarded.name, onboarded.resource_id),
                (false, true) => format!("Resource '{}' updated ({})", onboarded.name, onboarded.resource_id),
                (false, false) => format!(
                    "Resource '{}' already has these skills ({})",
                    onboarded.name, onboarded.resource_id
                ),
            };
            Response::Outcome(Outcome::ok(message))
        }
        Command::Complete { task_id } => {
            let done = engine.complete(*task_id).await?;
            Response::Outcome(Outcome::ok(format!(
                "Task '{}' completed by {}",
                done.task_name, done.resource_name
            )))
        }
        Command::Projects => Response::Projects(engine.projects().await?),
        Command::Skills => Response::Skills(engine.skills().await?),
        Command::Assignments => Response::Assignments(engine.assignments().await?),
        Command::History => Response::History(engine.history().await?),
        Command::Status => Response::Status(engine.status().await?),
    })
}
