//! Onboarding: add a resource, or grow an existing one with the same name.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AvailabilityWindow, EngineError, ResourceId, Skill};
use crate::store::Catalogue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResource {
    pub name: String,
    pub skills: Vec<String>,
    /// Empty means "available over the whole horizon".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub availability: Vec<AvailabilityWindow>,
}

impl NewResource {
    pub fn new(name: impl Into<String>, skills: &[&str]) -> Self {
        Self {
            name: name.into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            availability: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onboarded {
    pub resource_id: ResourceId,
    pub name: String,
    /// false when an existing resource was grown.
    pub created: bool,
    /// false when nothing new was added to an existing resource.
    pub changed: bool,
}

struct Checked {
    name: String,
    skills: BTreeSet<Skill>,
    availability: Vec<AvailabilityWindow>,
}

fn validate(input: &NewResource) -> Result<Checked, EngineError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("resource name must not be empty".into()));
    }
    if input.skills.is_empty() {
        return Err(EngineError::Validation(format!(
            "resource '{name}' needs at least one skill"
        )));
    }
    let skills = input
        .skills
        .iter()
        .map(|raw| Skill::parse(raw))
        .collect::<Result<BTreeSet<_>, _>>()?;

    let availability = if input.availability.is_empty() {
        vec![AvailabilityWindow::full_horizon()]
    } else {
        input
            .availability
            .iter()
            .map(|w| AvailabilityWindow::new(w.start, w.end))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(Checked {
        name: name.to_string(),
        skills,
        availability,
    })
}

/// Runs inside a transaction.
pub fn onboard(
    catalogue: &mut Catalogue,
    input: &NewResource,
    now: DateTime<Utc>,
) -> Result<Onboarded, EngineError> {
    let checked = validate(input)?;

    if let Some(existing) = catalogue.resource_by_name(&checked.name).map(|r| r.id) {
        // Explicit windows only; the default horizon would swallow everything.
        let windows: &[AvailabilityWindow] = if input.availability.is_empty() {
            &[]
        } else {
            &checked.availability
        };
        let changed = catalogue.grow_resource(existing, &checked.skills, windows)?;
        return Ok(Onboarded {
            resource_id: existing,
            name: checked.name,
            created: false,
            changed,
        });
    }

    let resource_id =
        catalogue.insert_resource(&checked.name, checked.skills, checked.availability, now)?;
    Ok(Onboarded {
        resource_id,
        name: checked.name,
        created: true,
        changed: true,
    })
}
