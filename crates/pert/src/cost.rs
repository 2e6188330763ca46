//! Cost aggregation, critical edges and milestone levels.
//!
//! Costs are reported as one [`CostRow`] per existing resource, in resource
//! ID order, so a UI can render a stable table even when nothing has been
//! allocated yet.
//!
//! Note that a "critical" edge here is only a display derivation: an edge is
//! critical when both of its endpoints carry the user's critical flag. It is
//! not a longest-path computation.

use crate::domain::{EdgeId, MilestoneId, ResourceId};
use crate::error::{Error, Result};
use crate::schedule::Schedule;
use crate::store::GraphStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated consumption of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRow {
    /// Resource ID
    pub resource: ResourceId,
    /// Resource name at the time of the aggregation
    pub name: String,
    /// Summed allocation
    pub value: f64,
}

/// Sum the allocations of every milestone starting on or before `date`.
///
/// A milestone is keyed by its effective date (pinned start, else pinned
/// end), falling back to its computed earliest start. Milestones with no
/// date at all are always included, and a `date` of `None` includes every
/// milestone.
pub fn cost_until(
    store: &GraphStore,
    schedule: &Schedule,
    date: Option<NaiveDate>,
) -> Vec<CostRow> {
    let included = store.milestones().iter().filter(|(id, milestone)| {
        let key = milestone
            .effective_date()
            .or_else(|| schedule.bounds(id).and_then(|bounds| bounds.start.min));
        match (key, date) {
            (Some(key), Some(date)) => key <= date,
            _ => true,
        }
    });
    sum(store, included.map(|(id, _)| id))
}

/// Sum the allocations of a milestone and of its whole predecessor closure.
///
/// Every ancestor contributes once, however many paths lead to it.
///
/// # Errors
///
/// Returns `Error::MilestoneNotFound` if the milestone doesn't exist.
pub fn cost_up_to(store: &GraphStore, id: &MilestoneId) -> Result<Vec<CostRow>> {
    let mut closure = store.predecessor_closure(id)?;
    closure.insert(id.clone());
    Ok(sum(store, closure.iter()))
}

fn sum<'a>(
    store: &GraphStore,
    milestones: impl Iterator<Item = &'a MilestoneId>,
) -> Vec<CostRow> {
    let mut totals: BTreeMap<&ResourceId, f64> =
        store.resources().keys().map(|id| (id, 0.0)).collect();
    for milestone in milestones {
        for (resource, quantity) in store.allocation(milestone) {
            if let Some(total) = totals.get_mut(resource) {
                *total += quantity;
            }
        }
    }

    totals
        .into_iter()
        .filter_map(|(id, value)| {
            store.resource(id).map(|resource| CostRow {
                resource: id.clone(),
                name: resource.name.clone(),
                value,
            })
        })
        .collect()
}

/// Edges whose two endpoints are both flagged critical.
pub fn critical_edges(store: &GraphStore) -> Vec<EdgeId> {
    let critical = |id: &MilestoneId| store.milestone(id).is_some_and(|m| m.critical);
    store
        .edges()
        .iter()
        .filter(|(_, edge)| critical(&edge.from) && critical(&edge.to))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Depth of every milestone: 0 for a source, otherwise one more than the
/// deepest predecessor.
///
/// # Errors
///
/// Returns `Error::CorruptGraph` if the edge set is cyclic.
pub fn levels(store: &GraphStore) -> Result<BTreeMap<MilestoneId, usize>> {
    let mut levels = BTreeMap::new();
    for id in store.topological_order()? {
        let mut level = 0;
        for predecessor in store.predecessors(&id) {
            let depth = levels
                .get(&predecessor)
                .copied()
                .ok_or_else(|| Error::CorruptGraph(predecessor.clone()))?;
            level = level.max(depth + 1);
        }
        levels.insert(id, level);
    }
    Ok(levels)
}
