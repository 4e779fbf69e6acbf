//! Demo catalogue for `init --demo`.

use chrono::{DateTime, Utc};
use skillmatch_core::domain::{EngineError, Skill};
use skillmatch_core::engine::{onboard, NewResource};
use skillmatch_core::store::Catalogue;

const RESOURCES: &[(&str, &[&str])] = &[
    ("Ram", &["SQL", "C#"]),
    ("Shyam", &["C#", "Web Services/Rest API"]),
    ("Kiran", &["Mongo DB", "Node.JS"]),
    ("Dhina", &["SQL", "Node.JS"]),
];

/// (project, task, skill, hours)
const TASKS: &[(&str, &str, &str, u32)] = &[
    ("E-commerce Website", "Setup Database", "SQL", 32),
    ("E-commerce Website", "Develop Backend API", "C#", 72),
    ("E-commerce Website", "Create UI Components", "Web Services/Rest API", 80),
    ("Mobile Banking App", "Design Database Schema", "Mongo DB", 32),
    ("Mobile Banking App", "Implement Core Logic", "Node.JS", 112),
];

pub fn catalogue(now: DateTime<Utc>) -> Result<Catalogue, EngineError> {
    let mut catalogue = Catalogue::new();
    for (name, skills) in RESOURCES {
        onboard(&mut catalogue, &NewResource::new(*name, skills), now)?;
    }
    for (project, task, skill, hours) in TASKS {
        let project_id = catalogue.resolve_project(project);
        catalogue.insert_task(project_id, task, Skill::parse(skill)?, *hours, now)?;
    }
    Ok(catalogue)
}
