use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use skillmatch_core::domain::{AvailabilityWindow, ProjectId, ResourceId, TaskId};
use skillmatch_core::engine::{AllocationRequest, NewResource};
use skillmatch_core::Command;

/// Top-level CLI parser for the `skillmatch` binary.
#[derive(Debug, Parser)]
#[command(
    name = "skillmatch",
    version,
    about = "Skill-based resource matching and allocation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./skillmatch.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store file, overrides `store.path`
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    pub compact: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the store file
    Init(InitArgs),

    /// List pending tasks of a project with the resources that could take them
    Match {
        project_id: u64,
    },

    /// Create a task and book a resource for it
    Allocate(AllocateArgs),

    /// Onboard a resource (or add skills to an existing one)
    AddResource(AddResourceArgs),

    /// Mark an assigned task as completed
    Complete {
        task_id: u64,
    },

    /// List projects
    Projects,

    /// List skills held by any resource
    Skills,

    /// Active assignments grouped by resource
    Assignments,

    /// Completion history, newest first
    History,

    /// Task and assignment counts
    Status,

    /// Read JSON commands from stdin, one per line
    Serve,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Seed the demo projects, resources and tasks
    #[arg(long)]
    pub demo: bool,

    /// Replace an existing store
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct AllocateArgs {
    #[arg(long = "project")]
    pub project_name: String,

    #[arg(long = "task")]
    pub task_name: String,

    #[arg(long)]
    pub skill: String,

    /// Duration in hours
    #[arg(long = "hours", allow_negative_numbers = true)]
    pub duration_hours: i64,

    /// Book this resource instead of letting the planner choose
    #[arg(long = "resource")]
    pub resource_id: Option<u64>,
}

#[derive(Debug, Args)]
pub struct AddResourceArgs {
    pub name: String,

    /// Comma separated skill names
    #[arg(long, value_delimiter = ',', required = true)]
    pub skills: Vec<String>,

    /// Availability window `START,END` (RFC 3339); repeatable. Default: always available
    #[arg(long = "window", value_parser = parse_window)]
    pub windows: Vec<AvailabilityWindow>,
}

fn parse_window(raw: &str) -> Result<AvailabilityWindow, String> {
    let (start, end) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected START,END but got '{raw}'"))?;
    let parse = |s: &str| {
        DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp '{}': {e}", s.trim()))
    };
    AvailabilityWindow::new(parse(start)?, parse(end)?).map_err(|e| e.to_string())
}

impl Commands {
    /// The engine command for one-shot subcommands. `None` for `init` and `serve`.
    pub fn to_command(&self) -> Option<Command> {
        Some(match self {
            Commands::Init(_) | Commands::Serve => return None,
            Commands::Match { project_id } => Command::Match {
                project_id: ProjectId::new(*project_id),
            },
            Commands::Allocate(args) => Command::Allocate(AllocationRequest {
                project_name: args.project_name.clone(),
                task_name: args.task_name.clone(),
                skill: args.skill.clone(),
                duration_hours: args.duration_hours,
                resource_id: args.resource_id.map(ResourceId::new),
            }),
            Commands::AddResource(args) => Command::AddResource(NewResource {
                name: args.name.clone(),
                skills: args.skills.clone(),
                availability: args.windows.clone(),
            }),
            Commands::Complete { task_id } => Command::Complete {
                task_id: TaskId::new(*task_id),
            },
            Commands::Projects => Command::Projects,
            Commands::Skills => Command::Skills,
            Commands::Assignments => Command::Assignments,
            Commands::History => Command::History,
            Commands::Status => Command::Status,
        })
    }
}
