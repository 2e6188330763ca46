//! Resource feasibility checking.
//!
//! Two independent checks run per resource after every recompute:
//!
//! - **Quantity**: milestones consume a resource's `amount` in date order.
//!   A milestone with a positive allocation that drives the remaining amount
//!   below zero is flagged.
//! - **Concurrency**: for resources with a concurrency cap, each milestone
//!   holding a positive allocation occupies one slot from its start to its
//!   end. A milestone that starts while no slot is free is flagged.
//!
//! Findings are reported, never corrected: no date or allocation changes.

use crate::domain::{MilestoneId, ResourceId};
use crate::schedule::Schedule;
use crate::store::GraphStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Kind of resource violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Cumulative allocation exceeds the resource amount
    Quantity,
    /// More simultaneous users than the concurrency cap
    Concurrency,
}

impl ViolationKind {
    /// Machine-readable name used by the UI layer
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quantity => "quantity",
            Self::Concurrency => "concurrency",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A milestone/resource pair that breaks a resource limit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Infeasibility {
    /// Offending milestone
    pub milestone: MilestoneId,
    /// Resource whose limit is exceeded
    pub resource: ResourceId,
    /// Which limit
    pub kind: ViolationKind,
}

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Milestone {} exceeds the {} limit of resource {}",
            self.milestone, self.kind, self.resource
        )
    }
}

/// All findings of one feasibility run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feasibility {
    findings: BTreeSet<Infeasibility>,
}

impl Feasibility {
    /// Every finding, ordered by milestone, resource and kind
    pub fn findings(&self) -> impl Iterator<Item = &Infeasibility> {
        self.findings.iter()
    }

    /// Whether no limit is exceeded anywhere
    pub fn is_feasible(&self) -> bool {
        self.findings.is_empty()
    }

    /// Whether the pair is flagged with the given kind
    pub fn is_flagged(
        &self,
        milestone: &MilestoneId,
        resource: &ResourceId,
        kind: ViolationKind,
    ) -> bool {
        self.findings.contains(&Infeasibility {
            milestone: milestone.clone(),
            resource: resource.clone(),
            kind,
        })
    }

    /// Findings for one milestone
    pub fn for_milestone<'a>(
        &'a self,
        milestone: &'a MilestoneId,
    ) -> impl Iterator<Item = &'a Infeasibility> + 'a {
        self.findings
            .iter()
            .filter(move |finding| &finding.milestone == milestone)
    }

    /// Number of findings
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Whether there are no findings
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Run both checks over the current graph.
///
/// `levels` supplies the topological depth used to break ties between
/// concurrency events (see [`crate::cost::levels`]).
pub fn check(
    store: &GraphStore,
    schedule: &Schedule,
    levels: &BTreeMap<MilestoneId, usize>,
) -> Feasibility {
    let mut findings = BTreeSet::new();
    check_quantity(store, &mut findings);
    check_concurrency(store, schedule, levels, &mut findings);

    debug!(findings = findings.len(), "checked resource feasibility");
    Feasibility { findings }
}

fn check_quantity(store: &GraphStore, findings: &mut BTreeSet<Infeasibility>) {
    // Milestones without any pinned date sort first; the sort is stable so
    // ties keep ID order.
    let mut ordered: Vec<_> = store.milestones().iter().collect();
    ordered.sort_by_key(|(_, milestone)| milestone.effective_date());

    let mut remaining: BTreeMap<&ResourceId, f64> = store
        .resources()
        .iter()
        .filter_map(|(id, resource)| resource.amount.map(|amount| (id, amount)))
        .collect();

    for (milestone_id, _) in ordered {
        for (resource_id, quantity) in store.allocation(milestone_id) {
            // Unlimited resources have no entry
            let Some(left) = remaining.get_mut(resource_id) else {
                continue;
            };
            *left -= quantity;
            if quantity > 0.0 && *left < 0.0 {
                findings.insert(Infeasibility {
                    milestone: milestone_id.clone(),
                    resource: resource_id.clone(),
                    kind: ViolationKind::Quantity,
                });
            }
        }
    }
}

/// A milestone starting or releasing a resource slot.
#[derive(Debug)]
struct Event<'a> {
    /// `None` sorts before every date (start events with no known date)
    time: Option<NaiveDate>,
    start: bool,
    critical: bool,
    level: usize,
    milestone: &'a MilestoneId,
    resource: &'a ResourceId,
}

impl Event<'_> {
    fn order(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            // Releases before acquisitions on the same day
            .then(self.start.cmp(&other.start))
            // Critical milestones get the free slots first
            .then(other.critical.cmp(&self.critical))
            .then(self.level.cmp(&other.level))
            .then(self.milestone.cmp(other.milestone))
    }
}

fn check_concurrency(
    store: &GraphStore,
    schedule: &Schedule,
    levels: &BTreeMap<MilestoneId, usize>,
    findings: &mut BTreeSet<Infeasibility>,
) {
    let mut slots: BTreeMap<&ResourceId, i64> = store
        .resources()
        .iter()
        .filter_map(|(id, resource)| {
            resource
                .concurrency_cap()
                .map(|cap| (id, i64::from(cap)))
        })
        .collect();
    if slots.is_empty() {
        return;
    }

    let mut events = Vec::new();
    for (milestone_id, milestone) in store.milestones() {
        let bounds = schedule.bounds(milestone_id).copied().unwrap_or_default();
        let level = levels.get(milestone_id).copied().unwrap_or_default();

        for (resource_id, quantity) in store.allocation(milestone_id) {
            if quantity <= 0.0 || !slots.contains_key(resource_id) {
                continue;
            }
            let event = |time, start| Event {
                time,
                start,
                critical: milestone.critical,
                level,
                milestone: milestone_id,
                resource: resource_id,
            };
            events.push(event(milestone.start.or(bounds.start.min), true));
            events.push(event(
                Some(milestone.end.or(bounds.end.max).unwrap_or(NaiveDate::MAX)),
                false,
            ));
        }
    }
    events.sort_by(Event::order);

    for event in events {
        let Some(free) = slots.get_mut(event.resource) else {
            continue;
        };
        if event.start {
            *free -= 1;
            if *free < 0 {
                findings.insert(Infeasibility {
                    milestone: event.milestone.clone(),
                    resource: event.resource.clone(),
                    kind: ViolationKind::Concurrency,
                });
            }
        } else {
            *free += 1;
        }
    }
}
