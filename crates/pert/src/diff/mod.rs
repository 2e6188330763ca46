//! Requirement-change differ.
//!
//! Compares a [`Baseline`] committed when the project was started against the
//! live graph and produces a [`ChangeReport`]:
//!
//! - **Project**: envelope date changes and the net allocation change per
//!   resource
//! - **Resources**: added, deleted, renamed, amount and concurrency changes
//! - **Milestones**: added, deleted, renamed, critical flag, date changes,
//!   allocation changes and the dependencies the milestone originates
//!
//! # Date changes
//!
//! Offsets are whole days and are only computed when a date is pinned on both
//! sides. With `duration = end offset - start offset`:
//!
//! 1. A zero duration with a non-zero start offset is a pure shift.
//! 2. Otherwise start and end are reported separately, in the past tense
//!    ("started", "finished") once today is after the new date.
//! 3. A non-zero duration is reported as "completed" once the new end has
//!    passed, otherwise as a duration change.

pub mod report;

pub use report::{Change, ChangeReport, MilestoneChanges, ResourceChanges};

use crate::domain::dates::{self, days_between};
use crate::domain::{Edge, EdgeId, Milestone, MilestoneId, ProjectDates, Resource, ResourceId};
use crate::store::GraphStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Immutable copy of the plan taken when the project is started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Resources at commit time
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, Resource>,

    /// Milestones at commit time
    #[serde(default)]
    pub nodes: BTreeMap<MilestoneId, Milestone>,

    /// Edges at commit time
    #[serde(default)]
    pub edges: BTreeMap<EdgeId, Edge>,

    /// Pinned project start at commit time
    #[serde(default, with = "dates::optional")]
    pub start: Option<NaiveDate>,

    /// Pinned project end at commit time
    #[serde(default, with = "dates::optional")]
    pub end: Option<NaiveDate>,
}

impl Baseline {
    /// Deep-copy the current plan.
    pub fn capture(store: &GraphStore, dates: &ProjectDates) -> Self {
        Self {
            resources: store.resources().clone(),
            nodes: store.milestones().clone(),
            edges: store.edges().clone(),
            start: dates.start,
            end: dates.end,
        }
    }

    /// Baseline allocations of a milestone, restricted to baseline resources
    fn allocation(&self, milestone: &Milestone) -> BTreeMap<ResourceId, f64> {
        milestone
            .resources
            .iter()
            .filter(|(resource, _)| self.resources.contains_key(*resource))
            .map(|(resource, quantity)| (resource.clone(), *quantity))
            .collect()
    }
}

/// Build the change report for the current plan.
pub fn diff(
    baseline: &Baseline,
    store: &GraphStore,
    dates: &ProjectDates,
    today: NaiveDate,
    plan_message: &str,
) -> ChangeReport {
    let mut totals: BTreeMap<ResourceId, f64> = BTreeMap::new();
    let milestones = diff_milestones(baseline, store, today, &mut totals);

    let mut project = date_changes(
        (baseline.start, baseline.end),
        (dates.start, dates.end),
        today,
    );
    for (resource, delta) in totals {
        if delta == 0.0 {
            continue;
        }
        let name = resource_name(baseline, store, &resource);
        project.push(Change::TotalAllocation {
            resource,
            name,
            delta,
        });
    }

    let report = ChangeReport {
        project,
        resources: diff_resources(baseline, store),
        milestones,
        plan_message: plan_message.to_string(),
    };
    debug!(
        project = report.project.len(),
        resources = report.resources.len(),
        milestones = report.milestones.len(),
        "built change report"
    );
    report
}

fn resource_name(baseline: &Baseline, store: &GraphStore, id: &ResourceId) -> String {
    store
        .resource(id)
        .or_else(|| baseline.resources.get(id))
        .map(|resource| resource.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn diff_resources(baseline: &Baseline, store: &GraphStore) -> Vec<ResourceChanges> {
    let ids: BTreeSet<&ResourceId> = baseline
        .resources
        .keys()
        .chain(store.resources().keys())
        .collect();

    let mut entries = Vec::new();
    for id in ids {
        let (name, changes) = match (baseline.resources.get(id), store.resource(id)) {
            (Some(old), None) => (old.name.clone(), vec![Change::Deleted]),
            (None, Some(new)) => (new.name.clone(), vec![Change::Added]),
            (Some(old), Some(new)) => {
                let mut changes = Vec::new();
                if old.name != new.name {
                    changes.push(Change::Renamed {
                        from: old.name.clone(),
                        to: new.name.clone(),
                    });
                }
                if old.amount != new.amount {
                    changes.push(Change::AmountChanged {
                        from: old.amount,
                        to: new.amount,
                    });
                }
                if old.concurrency_cap() != new.concurrency_cap() {
                    changes.push(Change::ConcurrencyChanged {
                        from: old.concurrency_cap(),
                        to: new.concurrency_cap(),
                    });
                }
                (new.name.clone(), changes)
            }
            (None, None) => continue,
        };
        if !changes.is_empty() {
            entries.push(ResourceChanges {
                id: id.clone(),
                name,
                changes,
            });
        }
    }
    entries
}

fn diff_milestones(
    baseline: &Baseline,
    store: &GraphStore,
    today: NaiveDate,
    totals: &mut BTreeMap<ResourceId, f64>,
) -> Vec<MilestoneChanges> {
    let ids: BTreeSet<&MilestoneId> = baseline
        .nodes
        .keys()
        .chain(store.milestones().keys())
        .collect();
    let mut edge_changes = diff_edges(baseline, store);

    let mut entries = Vec::new();
    for id in ids {
        let (name, mut changes) = match (baseline.nodes.get(id), store.milestone(id)) {
            (Some(old), None) => (old.name.clone(), vec![Change::Deleted]),
            (None, Some(new)) => (new.name.clone(), vec![Change::Added]),
            (Some(old), Some(new)) => {
                let mut changes = Vec::new();
                if old.name != new.name {
                    changes.push(Change::Renamed {
                        from: old.name.clone(),
                        to: new.name.clone(),
                    });
                }
                match (old.critical, new.critical) {
                    (false, true) => changes.push(Change::MarkedCritical),
                    (true, false) => changes.push(Change::UnmarkedCritical),
                    _ => {}
                }
                changes.extend(date_changes(
                    (old.start, old.end),
                    (new.start, new.end),
                    today,
                ));
                changes.extend(allocation_changes(baseline, store, id, old, totals));
                (new.name.clone(), changes)
            }
            (None, None) => continue,
        };
        changes.extend(edge_changes.remove(id).unwrap_or_default());

        if !changes.is_empty() {
            entries.push(MilestoneChanges {
                id: id.clone(),
                name,
                changes,
            });
        }
    }
    entries
}

fn allocation_changes(
    baseline: &Baseline,
    store: &GraphStore,
    id: &MilestoneId,
    old: &Milestone,
    totals: &mut BTreeMap<ResourceId, f64>,
) -> Vec<Change> {
    let before = baseline.allocation(old);
    let after: BTreeMap<&ResourceId, f64> = store.allocation(id).collect();
    let resources: BTreeSet<&ResourceId> = before.keys().chain(after.keys().copied()).collect();

    let mut changes = Vec::new();
    for resource in resources {
        let from = before.get(resource).copied().unwrap_or_default();
        let to = after.get(resource).copied().unwrap_or_default();
        if from == to {
            continue;
        }
        *totals.entry(resource.clone()).or_default() += to - from;
        changes.push(Change::Allocation {
            resource: resource.clone(),
            name: resource_name(baseline, store, resource),
            from,
            to,
        });
    }
    changes
}

/// Dependency changes keyed by the originating milestone.
fn diff_edges(baseline: &Baseline, store: &GraphStore) -> BTreeMap<MilestoneId, Vec<Change>> {
    let pairs = |edges: &BTreeMap<EdgeId, Edge>| -> BTreeSet<(MilestoneId, MilestoneId)> {
        edges
            .values()
            .map(|edge| (edge.from.clone(), edge.to.clone()))
            .collect()
    };
    let before = pairs(&baseline.edges);
    let after = pairs(store.edges());
    let name = |id: &MilestoneId| {
        store
            .milestone(id)
            .or_else(|| baseline.nodes.get(id))
            .map(|milestone| milestone.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let mut changes: BTreeMap<MilestoneId, Vec<Change>> = BTreeMap::new();
    for (from, to) in before.difference(&after) {
        // Edges that vanished with a deleted endpoint are covered by the deletion
        if store.milestone(from).is_none() || store.milestone(to).is_none() {
            continue;
        }
        changes.entry(from.clone()).or_default().push(Change::Severed {
            to: to.clone(),
            name: name(to),
        });
    }
    for (from, to) in after.difference(&before) {
        changes.entry(from.clone()).or_default().push(Change::Connected {
            to: to.clone(),
            name: name(to),
        });
    }
    changes
}

fn date_changes(
    old: (Option<NaiveDate>, Option<NaiveDate>),
    new: (Option<NaiveDate>, Option<NaiveDate>),
    today: NaiveDate,
) -> Vec<Change> {
    let mut changes = Vec::new();
    let offset = |old: Option<NaiveDate>, new: Option<NaiveDate>| match (old, new) {
        (Some(old), Some(new)) => Some((days_between(old, new), new)),
        _ => None,
    };
    let start = offset(old.0, new.0);
    let end = offset(old.1, new.1);
    let duration = match (start, end) {
        (Some((start_days, _)), Some((end_days, new_end))) => {
            Some((end_days - start_days, new_end))
        }
        _ => None,
    };

    if let (Some((0, _)), Some((start_days, _))) = (duration, start)
        && start_days != 0
    {
        changes.push(Change::Shifted { days: start_days });
    } else {
        if let Some((days, date)) = start
            && days != 0
        {
            changes.push(if today > date {
                Change::Started { days }
            } else {
                Change::StartShifted { days }
            });
        }
        if let Some((days, date)) = end
            && days != 0
        {
            changes.push(if today > date {
                Change::Finished { days }
            } else {
                Change::EndShifted { days }
            });
        }
        if let Some((days, date)) = duration
            && days != 0
        {
            changes.push(if today > date {
                Change::Completed { days }
            } else {
                Change::DurationChanged { days }
            });
        }
    }

    match (old.0, new.0) {
        (None, Some(date)) => changes.push(Change::StartSet { date }),
        (Some(_), None) => changes.push(Change::StartCleared),
        _ => {}
    }
    match (old.1, new.1) {
        (None, Some(date)) => changes.push(Change::EndSet { date }),
        (Some(_), None) => changes.push(Change::EndCleared),
        _ => {}
    }
    changes
}

/// Progress of a milestone relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advancement {
    /// Not part of the baseline
    Unplanned,
    /// Pinned end earlier than in the baseline
    Ahead,
    /// Pinned end later than in the baseline
    Behind,
    /// Same pinned end, or no end to compare
    OnSchedule,
}

/// Classify every current milestone against the baseline.
pub fn advancement(baseline: &Baseline, store: &GraphStore) -> BTreeMap<MilestoneId, Advancement> {
    store
        .milestones()
        .iter()
        .map(|(id, milestone)| {
            let status = match baseline.nodes.get(id) {
                None => Advancement::Unplanned,
                Some(planned) => match (planned.end, milestone.end) {
                    (Some(planned), Some(current)) if current > planned => Advancement::Behind,
                    (Some(planned), Some(current)) if current < planned => Advancement::Ahead,
                    _ => Advancement::OnSchedule,
                },
            };
            (id.clone(), status)
        })
        .collect()
}
