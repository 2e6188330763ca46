//! Whole-project snapshot ingest and export.
//!
//! A snapshot is the JSON document the persistence layer keeps per project:
//!
//! ```json
//! {
//!   "resources": {"r1": {"name": "Budget", "amount": 5, "concurrency": null}},
//!   "nodes": {"n1": {"name": "Kickoff", "top": 0, "left": 0, "resources": {"r1": 3},
//!                    "critical": false, "start": "2024-01-01", "end": ""}},
//!   "edges": {"e1": {"from": "n1", "to": "n2"}},
//!   "start": "", "end": "",
//!   "stats": {"createdAt": 1700000000000},
//!   "original": null
//! }
//! ```
//!
//! Import is resilient: edges that the store would refuse are skipped and
//! reported as [`LoadWarning`]s instead of failing the whole load.

use crate::diff::Baseline;
use crate::domain::dates;
use crate::domain::{Edge, EdgeId, Milestone, MilestoneId, ProjectDates, Resource, ResourceId};
use crate::error::{CycleError, Error, Result};
use crate::store::GraphStore;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Epoch-millisecond bookkeeping timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Project creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    /// Last save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<i64>,

    /// Last load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<i64>,
}

impl Stats {
    /// Stats for a project created right now
    pub fn created_now() -> Self {
        Self {
            created_at: Some(now_millis()),
            ..Self::default()
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// The persisted shape of a whole project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Resources by ID
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, Resource>,

    /// Milestones by ID
    #[serde(default)]
    pub nodes: BTreeMap<MilestoneId, Milestone>,

    /// Dependency edges by ID
    #[serde(default)]
    pub edges: BTreeMap<EdgeId, Edge>,

    /// Pinned project start
    #[serde(default, with = "dates::optional")]
    pub start: Option<NaiveDate>,

    /// Pinned project end
    #[serde(default, with = "dates::optional")]
    pub end: Option<NaiveDate>,

    /// Bookkeeping timestamps
    #[serde(default)]
    pub stats: Stats,

    /// Baseline committed when the project was started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Baseline>,

    /// Minutes east of UTC used for "today"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i32>,
}

/// Non-fatal problems found while importing a snapshot.
///
/// Bad edges are skipped with both milestones still loaded. Bad names and
/// quantities are repaired in place.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// Edge references a milestone that isn't in the snapshot
    OrphanedEdge {
        /// Skipped edge
        edge: EdgeId,
        /// Recorded predecessor
        from: MilestoneId,
        /// Recorded successor
        to: MilestoneId,
    },

    /// Edge connects a milestone to itself
    SelfLoop {
        /// Skipped edge
        edge: EdgeId,
        /// Milestone on both ends
        milestone: MilestoneId,
    },

    /// A second edge for an already connected ordered pair
    DuplicateEdge {
        /// Skipped edge
        edge: EdgeId,
        /// Predecessor
        from: MilestoneId,
        /// Successor
        to: MilestoneId,
    },

    /// Edge would close a cycle with the edges loaded before it
    CircularEdge {
        /// Skipped edge
        edge: EdgeId,
        /// Predecessor
        from: MilestoneId,
        /// Successor
        to: MilestoneId,
    },

    /// Milestone had an empty name; its ID is used instead
    UnnamedMilestone {
        /// Renamed milestone
        milestone: MilestoneId,
    },

    /// Resource had an empty name; its ID is used instead
    UnnamedResource {
        /// Renamed resource
        resource: ResourceId,
    },

    /// Resource amount was negative or not finite; clamped to zero
    InvalidAmount {
        /// Affected resource
        resource: ResourceId,
        /// Value found in the snapshot
        amount: f64,
    },

    /// Allocation was negative or not finite; clamped to zero
    InvalidAllocation {
        /// Consuming milestone
        milestone: MilestoneId,
        /// Allocated resource
        resource: ResourceId,
        /// Value found in the snapshot
        quantity: f64,
    },
}

fn is_valid_quantity(quantity: f64) -> bool {
    quantity.is_finite() && quantity >= 0.0
}

fn repair_resource(id: &ResourceId, mut resource: Resource) -> (Resource, Vec<LoadWarning>) {
    let mut warnings = Vec::new();
    if resource.name.is_empty() {
        resource.name = id.to_string();
        warnings.push(LoadWarning::UnnamedResource {
            resource: id.clone(),
        });
    }
    if let Some(amount) = resource.amount
        && !is_valid_quantity(amount)
    {
        resource.amount = Some(0.0);
        warnings.push(LoadWarning::InvalidAmount {
            resource: id.clone(),
            amount,
        });
    }
    (resource, warnings)
}

fn repair_milestone(id: &MilestoneId, mut milestone: Milestone) -> (Milestone, Vec<LoadWarning>) {
    let mut warnings = Vec::new();
    if milestone.name.is_empty() {
        milestone.name = id.to_string();
        warnings.push(LoadWarning::UnnamedMilestone {
            milestone: id.clone(),
        });
    }
    for (resource, quantity) in &mut milestone.resources {
        if !is_valid_quantity(*quantity) {
            warnings.push(LoadWarning::InvalidAllocation {
                milestone: id.clone(),
                resource: resource.clone(),
                quantity: *quantity,
            });
            *quantity = 0.0;
        }
    }
    (milestone, warnings)
}

impl Snapshot {
    /// Build a snapshot from the live graph.
    pub fn capture(
        store: &GraphStore,
        dates: &ProjectDates,
        stats: Stats,
        original: Option<Baseline>,
        timezone: Option<i32>,
    ) -> Self {
        Self {
            resources: store.resources().clone(),
            nodes: store.milestones().clone(),
            edges: store.edges().clone(),
            start: dates.start,
            end: dates.end,
            stats,
            original,
            timezone,
        }
    }

    /// The project's pinned dates
    pub fn dates(&self) -> ProjectDates {
        ProjectDates {
            start: self.start,
            end: self.end,
        }
    }

    /// Rebuild a graph store, skipping edges the store would refuse.
    ///
    /// Edges are inserted in ID order, so when a cycle is present the edge
    /// with the highest ID on it is the one dropped. Empty names and invalid
    /// quantities are repaired and reported. IDs recorded in the baseline
    /// stay reserved even when the entity has since been deleted.
    ///
    /// # Errors
    ///
    /// Only fails on an internal graph error; bad edges become warnings.
    pub fn to_store(&self) -> Result<(GraphStore, Vec<LoadWarning>)> {
        let mut store = GraphStore::new();
        let mut warnings = Vec::new();

        for (id, resource) in &self.resources {
            let (resource, repairs) = repair_resource(id, resource.clone());
            warnings.extend(repairs);
            store.insert_resource(id.clone(), resource);
        }
        for (id, milestone) in &self.nodes {
            let (milestone, repairs) = repair_milestone(id, milestone.clone());
            warnings.extend(repairs);
            store.insert_milestone(id.clone(), milestone);
        }
        for warning in &warnings {
            warn!(?warning, "repaired record while importing snapshot");
        }
        if let Some(original) = &self.original {
            store.reserve_ids(original);
        }

        for (id, edge) in &self.edges {
            let warning = match store.insert_edge(id.clone(), edge.clone()) {
                Ok(()) => continue,
                Err(Error::MilestoneNotFound(_)) => LoadWarning::OrphanedEdge {
                    edge: id.clone(),
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                },
                Err(Error::Cycle(CycleError::SelfLoop(milestone))) => LoadWarning::SelfLoop {
                    edge: id.clone(),
                    milestone,
                },
                Err(Error::Cycle(CycleError::Duplicate { from, to })) => {
                    LoadWarning::DuplicateEdge {
                        edge: id.clone(),
                        from,
                        to,
                    }
                }
                Err(Error::Cycle(CycleError::WouldCycle { from, to })) => {
                    LoadWarning::CircularEdge {
                        edge: id.clone(),
                        from,
                        to,
                    }
                }
                Err(e) => return Err(e),
            };
            warn!(?warning, "skipped edge while importing snapshot");
            warnings.push(warning);
        }

        Ok((store, warnings))
    }
}

/// Read a snapshot from a JSON file.
pub async fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content = fs::read_to_string(path).await?;
    let snapshot: Snapshot = serde_json::from_str(&content)?;
    info!(
        path = %path.display(),
        milestones = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

/// Write a snapshot to a JSON file atomically.
///
/// The document is written to a sibling temporary file first and then
/// renamed over `path`, so an interrupted save leaves the old file intact.
pub async fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(snapshot)?;

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(&json).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await?;
    info!(path = %path.display(), "saved snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_skips_bad_edges() {
        let json = r#"{
            "nodes": {
                "n1": {"name": "A", "start": "", "end": ""},
                "n2": {"name": "B", "start": "", "end": ""}
            },
            "edges": {
                "e1": {"from": "n1", "to": "n2"},
                "e2": {"from": "n2", "to": "n1"},
                "e3": {"from": "n1", "to": "n9"},
                "e4": {"from": "n2", "to": "n2"},
                "e5": {"from": "n1", "to": "n2"}
            }
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let (store, warnings) = snapshot.to_store().unwrap();

        assert_eq!(store.edges().len(), 1);
        assert!(matches!(warnings[0], LoadWarning::CircularEdge { .. }));
        assert!(matches!(warnings[1], LoadWarning::OrphanedEdge { .. }));
        assert!(matches!(warnings[2], LoadWarning::SelfLoop { .. }));
        assert!(matches!(warnings[3], LoadWarning::DuplicateEdge { .. }));
    }

    #[test]
    fn test_import_repairs_names_and_quantities() {
        let json = r#"{
            "resources": {"r1": {"name": "", "amount": -2}},
            "nodes": {"n1": {"name": "", "resources": {"r1": -1}}}
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let (store, warnings) = snapshot.to_store().unwrap();

        let r1 = ResourceId::new("r1");
        let n1 = MilestoneId::new("n1");
        assert_eq!(
            warnings,
            vec![
                LoadWarning::UnnamedResource { resource: r1.clone() },
                LoadWarning::InvalidAmount {
                    resource: r1.clone(),
                    amount: -2.0,
                },
                LoadWarning::UnnamedMilestone { milestone: n1.clone() },
                LoadWarning::InvalidAllocation {
                    milestone: n1.clone(),
                    resource: r1.clone(),
                    quantity: -1.0,
                },
            ]
        );
        assert_eq!(store.resource(&r1).map(|r| r.amount), Some(Some(0.0)));
        assert_eq!(store.milestone(&n1).map(|m| m.name.as_str()), Some("n1"));
        assert_eq!(store.allocation(&n1).collect::<Vec<_>>(), vec![(&r1, 0.0)]);
    }

    #[test]
    fn test_stats_use_camel_case() {
        let stats = Stats {
            created_at: Some(1),
            modified_at: None,
            accessed_at: Some(3),
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"createdAt":1,"accessedAt":3}"#);
    }
}
