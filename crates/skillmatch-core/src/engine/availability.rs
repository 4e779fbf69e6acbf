//! Availability index: "which resources hold skill S and are free for [from, to)".
//!
//! Effective free time of a resource = its availability windows minus the
//! windows of its active assignments. The index is built from one catalogue
//! state and must not outlive the transaction that built it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{Resource, ResourceId, ScheduleWindow, Skill};
use crate::store::Catalogue;

/// One contiguous piece of effective free time.
///
/// `end` is exclusive when the piece stops at a booking and inclusive when it
/// stops at the end of an availability window; in both cases a schedule
/// window fits iff `start <= w.start && w.end <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeSpan {
    pub fn covers(&self, window: &ScheduleWindow) -> bool {
        self.start <= window.start && window.end <= self.end
    }
}

/// A qualified resource together with its current load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub resource_id: ResourceId,
    pub name: String,
    pub active_assignments: usize,
    pub workload_hours: u64,
}

impl Candidate {
    pub fn is_fully_free(&self) -> bool {
        self.active_assignments == 0
    }
}

#[derive(Debug, Default)]
struct Bookings {
    /// Sorted by start.
    windows: Vec<ScheduleWindow>,
    workload_hours: u64,
}

pub struct AvailabilityIndex<'a> {
    catalogue: &'a Catalogue,
    by_skill: HashMap<&'a Skill, Vec<&'a Resource>>,
    bookings: HashMap<ResourceId, Bookings>,
}

impl<'a> AvailabilityIndex<'a> {
    pub fn build(catalogue: &'a Catalogue) -> Self {
        let mut by_skill: HashMap<&Skill, Vec<&Resource>> = HashMap::new();
        for resource in catalogue.resources() {
            for skill in &resource.skills {
                by_skill.entry(skill).or_default().push(resource);
            }
        }

        let mut bookings: HashMap<ResourceId, Bookings> = HashMap::new();
        for assignment in catalogue.active_assignments() {
            let entry = bookings.entry(assignment.resource_id).or_default();
            entry.windows.push(assignment.window);
            entry.workload_hours += u64::from(assignment.duration_hours);
        }
        for entry in bookings.values_mut() {
            entry.windows.sort_by_key(|w| w.start);
        }

        Self {
            catalogue,
            by_skill,
            bookings,
        }
    }

    /// Availability minus active bookings, in window order.
    pub fn free_time(&self, resource: &Resource) -> Vec<FreeSpan> {
        let booked = self
            .bookings
            .get(&resource.id)
            .map(|b| b.windows.as_slice())
            .unwrap_or_default();

        let mut spans = Vec::new();
        for avail in &resource.availability {
            let mut cursor = avail.start;
            for w in booked {
                if w.end <= cursor || w.start > avail.end {
                    continue;
                }
                if w.start > cursor {
                    spans.push(FreeSpan {
                        start: cursor,
                        end: w.start.min(avail.end),
                    });
                }
                cursor = cursor.max(w.end);
            }
            if cursor < avail.end {
                spans.push(FreeSpan {
                    start: cursor,
                    end: avail.end,
                });
            }
        }
        spans
    }

    pub fn is_free(&self, resource: &Resource, window: &ScheduleWindow) -> bool {
        self.free_time(resource).iter().any(|span| span.covers(window))
    }

    pub fn candidate(&self, resource: &Resource) -> Candidate {
        let (active_assignments, workload_hours) = self
            .bookings
            .get(&resource.id)
            .map_or((0, 0), |b| (b.windows.len(), b.workload_hours));
        Candidate {
            resource_id: resource.id,
            name: resource.name.clone(),
            active_assignments,
            workload_hours,
        }
    }

    /// Resources holding `skill` whose free time covers `window`, ordered by id.
    pub fn qualified(&self, skill: &Skill, window: &ScheduleWindow) -> Vec<Candidate> {
        self.by_skill
            .get(skill)
            .into_iter()
            .flatten()
            .filter(|resource| self.is_free(resource, window))
            .map(|resource| self.candidate(resource))
            .collect()
    }

    pub fn catalogue(&self) -> &'a Catalogue {
        self.catalogue
    }
}
