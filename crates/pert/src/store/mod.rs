//! Graph store: the single owner of milestones, edges and resources.
//!
//! All mutation of the project graph goes through [`GraphStore`]. The store
//! enforces the structural invariants the analysis components rely on:
//!
//! - The edge set is always acyclic. An insertion that would close a cycle,
//!   a self loop or a duplicate ordered pair is rejected with a
//!   [`CycleError`] and leaves the store untouched.
//! - Removing a milestone first removes every edge touching it.
//! - Milestone names are never empty.
//!
//! # Architecture
//!
//! The implementation uses:
//! - `BTreeMap`s keyed by entity ID for records (deterministic iteration)
//! - `petgraph::StableDiGraph` for the dependency graph, so node and edge
//!   indices stay valid across removals
//! - `HashMap`s from entity IDs to graph indices
//! - One [`IdGenerator`] per entity kind
//!
//! Allocations that reference a deleted resource are kept on the milestone
//! record and dropped lazily: [`GraphStore::allocation`] only yields entries
//! for resources that currently exist.

mod graph;

use crate::diff::Baseline;
use crate::domain::{
    Edge, EdgeId, Milestone, MilestoneId, Resource, ResourceId, ResourceUpdate,
};
use crate::error::{CycleError, Error, Result};
use crate::id_generation::{EDGE_PREFIX, IdGenerator, MILESTONE_PREFIX, RESOURCE_PREFIX};
use chrono::NaiveDate;
use graph::DependencyGraph;
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Owner of the project graph.
#[derive(Debug, Clone)]
pub struct GraphStore {
    /// Milestones indexed by ID
    milestones: BTreeMap<MilestoneId, Milestone>,

    /// Resources indexed by ID
    resources: BTreeMap<ResourceId, Resource>,

    /// Edge records indexed by ID
    edges: BTreeMap<EdgeId, Edge>,

    /// Dependency graph.
    ///
    /// Every milestone in `milestones` has exactly one node; every record
    /// in `edges` has exactly one graph edge.
    graph: DependencyGraph,

    /// Mapping from MilestoneId to graph NodeIndex
    node_map: HashMap<MilestoneId, NodeIndex>,

    /// Mapping from EdgeId to graph EdgeIndex
    edge_map: HashMap<EdgeId, EdgeIndex>,

    milestone_ids: IdGenerator,
    edge_ids: IdGenerator,
    resource_ids: IdGenerator,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            milestones: BTreeMap::new(),
            resources: BTreeMap::new(),
            edges: BTreeMap::new(),
            graph: DependencyGraph::default(),
            node_map: HashMap::new(),
            edge_map: HashMap::new(),
            milestone_ids: IdGenerator::new(MILESTONE_PREFIX),
            edge_ids: IdGenerator::new(EDGE_PREFIX),
            resource_ids: IdGenerator::new(RESOURCE_PREFIX),
        }
    }

    // ========== Milestones ==========

    /// Add a milestone with the given name and no dates or allocations.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyName` if `name` is empty.
    pub fn add_milestone(&mut self, name: impl Into<String>) -> Result<MilestoneId> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName("Milestone"));
        }

        let id = MilestoneId::new(self.milestone_ids.generate());
        self.insert_milestone(id.clone(), Milestone::new(name));
        debug!(milestone = %id, "added milestone");
        Ok(id)
    }

    /// Insert a milestone record under a known ID (used by snapshot import).
    ///
    /// An existing milestone with the same ID is replaced; its edges stay.
    pub(crate) fn insert_milestone(&mut self, id: MilestoneId, milestone: Milestone) {
        self.milestone_ids.register_id(id.as_str());
        if !self.node_map.contains_key(&id) {
            let node = self.graph.add_node(id.clone());
            self.node_map.insert(id.clone(), node);
        }
        self.milestones.insert(id, milestone);
    }

    /// Remove a milestone and every edge that touches it.
    ///
    /// # Errors
    ///
    /// Returns `Error::MilestoneNotFound` if the milestone doesn't exist.
    pub fn remove_milestone(&mut self, id: &MilestoneId) -> Result<Milestone> {
        let node = *self
            .node_map
            .get(id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;

        // Cascade: drop incident edges before the node itself
        let incident: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|(_, edge)| &edge.from == id || &edge.to == id)
            .map(|(edge_id, _)| edge_id.clone())
            .collect();
        for edge_id in &incident {
            self.remove_edge(edge_id)?;
        }

        self.graph.remove_node(node);
        self.node_map.remove(id);
        let milestone = self
            .milestones
            .remove(id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;

        debug!(milestone = %id, edges = incident.len(), "removed milestone");
        Ok(milestone)
    }

    /// Rename a milestone.
    ///
    /// # Errors
    ///
    /// - `Error::EmptyName` if `name` is empty (the old name is kept)
    /// - `Error::MilestoneNotFound` if the milestone doesn't exist
    pub fn rename_milestone(&mut self, id: &MilestoneId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName("Milestone"));
        }
        self.milestone_mut(id)?.name = name;
        Ok(())
    }

    /// Set or clear the pinned start and end dates of a milestone.
    pub fn set_pinned_dates(
        &mut self,
        id: &MilestoneId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<()> {
        let milestone = self.milestone_mut(id)?;
        milestone.start = start;
        milestone.end = end;
        debug!(milestone = %id, ?start, ?end, "pinned dates changed");
        Ok(())
    }

    /// Set the critical flag of a milestone.
    pub fn set_critical(&mut self, id: &MilestoneId, critical: bool) -> Result<()> {
        self.milestone_mut(id)?.critical = critical;
        Ok(())
    }

    /// Flip the critical flag of a milestone, returning the new value.
    pub fn toggle_critical(&mut self, id: &MilestoneId) -> Result<bool> {
        let milestone = self.milestone_mut(id)?;
        milestone.critical = !milestone.critical;
        Ok(milestone.critical)
    }

    /// Set how much of a resource a milestone consumes.
    ///
    /// # Errors
    ///
    /// - `Error::MilestoneNotFound` / `Error::ResourceNotFound` for unknown IDs
    /// - `Error::InvalidQuantity` if `quantity` is negative or not finite
    pub fn set_allocation(
        &mut self,
        milestone: &MilestoneId,
        resource: &ResourceId,
        quantity: f64,
    ) -> Result<()> {
        validate_quantity(quantity)?;
        if !self.resources.contains_key(resource) {
            return Err(Error::ResourceNotFound(resource.clone()));
        }
        self.milestone_mut(milestone)?
            .resources
            .insert(resource.clone(), quantity);
        debug!(%milestone, %resource, quantity, "allocation changed");
        Ok(())
    }

    /// Get a milestone by ID
    pub fn milestone(&self, id: &MilestoneId) -> Option<&Milestone> {
        self.milestones.get(id)
    }

    /// All milestones in ID order
    pub fn milestones(&self) -> &BTreeMap<MilestoneId, Milestone> {
        &self.milestones
    }

    /// Allocations of a milestone, restricted to resources that still exist.
    ///
    /// Returns an empty iterator for an unknown milestone.
    pub fn allocation<'a>(
        &'a self,
        id: &MilestoneId,
    ) -> impl Iterator<Item = (&'a ResourceId, f64)> + use<'a> {
        self.milestones
            .get(id)
            .into_iter()
            .flat_map(|milestone| milestone.resources.iter())
            .filter(move |(resource, _)| self.resources.contains_key(*resource))
            .map(|(resource, quantity)| (resource, *quantity))
    }

    fn milestone_mut(&mut self, id: &MilestoneId) -> Result<&mut Milestone> {
        self.milestones
            .get_mut(id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))
    }

    // ========== Edges ==========

    /// Check whether `from -> to` could be inserted.
    ///
    /// This is the check a UI runs while an edge is being dragged over a
    /// potential target.
    pub fn check_edge(&self, from: &MilestoneId, to: &MilestoneId) -> Result<()> {
        for id in [from, to] {
            if !self.milestones.contains_key(id) {
                return Err(Error::MilestoneNotFound(id.clone()));
            }
        }
        if from == to {
            return Err(CycleError::SelfLoop(from.clone()).into());
        }
        if graph::would_cycle(&self.graph, &self.node_map, from, to)? {
            return Err(CycleError::WouldCycle {
                from: from.clone(),
                to: to.clone(),
            }
            .into());
        }
        if self.edges.values().any(|edge| &edge.from == from && &edge.to == to) {
            return Err(CycleError::Duplicate {
                from: from.clone(),
                to: to.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Add a dependency edge: `to` must not start before `from` ends.
    ///
    /// # Errors
    ///
    /// - `Error::MilestoneNotFound` if either milestone doesn't exist
    /// - `Error::Cycle` if the edge is a self loop, a duplicate, or if `to`
    ///   already reaches `from`
    pub fn add_edge(&mut self, from: &MilestoneId, to: &MilestoneId) -> Result<EdgeId> {
        self.check_edge(from, to)?;
        let id = EdgeId::new(self.edge_ids.generate());
        self.link(id.clone(), from.clone(), to.clone());
        debug!(edge = %id, %from, %to, "added edge");
        Ok(id)
    }

    /// Insert an edge under a known ID (used by snapshot import).
    ///
    /// Runs the same checks as [`GraphStore::add_edge`].
    pub(crate) fn insert_edge(&mut self, id: EdgeId, edge: Edge) -> Result<()> {
        if self.edges.contains_key(&id) {
            return Err(CycleError::Duplicate {
                from: edge.from,
                to: edge.to,
            }
            .into());
        }
        self.check_edge(&edge.from, &edge.to)?;
        self.edge_ids.register_id(id.as_str());
        self.link(id, edge.from, edge.to);
        Ok(())
    }

    fn link(&mut self, id: EdgeId, from: MilestoneId, to: MilestoneId) {
        let index = self
            .graph
            .add_edge(self.node_map[&from], self.node_map[&to], id.clone());
        self.edge_map.insert(id.clone(), index);
        self.edges.insert(id, Edge { from, to });
    }

    /// Remove a dependency edge.
    ///
    /// # Errors
    ///
    /// Returns `Error::EdgeNotFound` if the edge doesn't exist.
    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<Edge> {
        let index = self
            .edge_map
            .remove(id)
            .ok_or_else(|| Error::EdgeNotFound(id.clone()))?;
        self.graph.remove_edge(index);
        let edge = self
            .edges
            .remove(id)
            .ok_or_else(|| Error::EdgeNotFound(id.clone()))?;
        debug!(edge = %id, from = %edge.from, to = %edge.to, "removed edge");
        Ok(edge)
    }

    /// Get an edge by ID
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// All edges in ID order
    pub fn edges(&self) -> &BTreeMap<EdgeId, Edge> {
        &self.edges
    }

    // ========== Resources ==========

    /// Add an unlimited, uncapped resource.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyName` if `name` is empty.
    pub fn add_resource(&mut self, name: impl Into<String>) -> Result<ResourceId> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName("Resource"));
        }
        let id = ResourceId::new(self.resource_ids.generate());

        // A fresh ID may still appear in allocations imported from an older
        // snapshot; those belonged to a different resource.
        for milestone in self.milestones.values_mut() {
            milestone.resources.remove(&id);
        }

        self.resources.insert(id.clone(), Resource::new(name));
        debug!(resource = %id, "added resource");
        Ok(id)
    }

    /// Insert a resource record under a known ID (used by snapshot import).
    pub(crate) fn insert_resource(&mut self, id: ResourceId, resource: Resource) {
        self.resource_ids.register_id(id.as_str());
        self.resources.insert(id, resource);
    }

    /// Change one field of a resource.
    ///
    /// # Errors
    ///
    /// - `Error::ResourceNotFound` if the resource doesn't exist
    /// - `Error::EmptyName` when renaming to an empty name; use
    ///   [`GraphStore::remove_resource`] to delete
    /// - `Error::InvalidQuantity` for a negative or non-finite amount
    pub fn update_resource(&mut self, id: &ResourceId, update: ResourceUpdate) -> Result<()> {
        let resource = self
            .resources
            .get_mut(id)
            .ok_or_else(|| Error::ResourceNotFound(id.clone()))?;

        match update {
            ResourceUpdate::Name(name) => {
                if name.is_empty() {
                    return Err(Error::EmptyName("Resource"));
                }
                resource.name = name;
            }
            ResourceUpdate::Amount(amount) => {
                if let Some(amount) = amount {
                    validate_quantity(amount)?;
                }
                resource.amount = amount;
            }
            ResourceUpdate::Concurrency(concurrency) => {
                resource.concurrency = concurrency;
            }
        }
        debug!(resource = %id, "resource updated");
        Ok(())
    }

    /// Remove a resource.
    ///
    /// Milestone allocations referencing it are left in place and ignored
    /// from now on.
    pub fn remove_resource(&mut self, id: &ResourceId) -> Result<Resource> {
        let resource = self
            .resources
            .remove(id)
            .ok_or_else(|| Error::ResourceNotFound(id.clone()))?;
        debug!(resource = %id, "removed resource");
        Ok(resource)
    }

    /// Get a resource by ID
    pub fn resource(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// All resources in ID order
    pub fn resources(&self) -> &BTreeMap<ResourceId, Resource> {
        &self.resources
    }

    /// Keep every ID recorded in a baseline out of future generation.
    ///
    /// Entities deleted since the baseline was committed no longer exist in
    /// the store, but a new entity reusing their ID would be matched against
    /// them by the differ.
    pub(crate) fn reserve_ids(&mut self, baseline: &Baseline) {
        for id in baseline.nodes.keys() {
            self.milestone_ids.register_id(id.as_str());
        }
        for id in baseline.edges.keys() {
            self.edge_ids.register_id(id.as_str());
        }
        for id in baseline.resources.keys() {
            self.resource_ids.register_id(id.as_str());
        }
    }

    // ========== Traversals ==========

    /// Direct predecessors of a milestone, in ID order.
    pub fn predecessors(&self, id: &MilestoneId) -> Vec<MilestoneId> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Direct successors of a milestone, in ID order.
    pub fn successors(&self, id: &MilestoneId) -> Vec<MilestoneId> {
        self.neighbours(id, Direction::Outgoing)
    }

    fn neighbours(&self, id: &MilestoneId, direction: Direction) -> Vec<MilestoneId> {
        let Some(&node) = self.node_map.get(id) else {
            return Vec::new();
        };
        let unique: BTreeSet<MilestoneId> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|neighbour| self.graph[neighbour].clone())
            .collect();
        unique.into_iter().collect()
    }

    /// Milestones without incoming edges.
    pub fn sources(&self) -> Vec<MilestoneId> {
        self.boundary(Direction::Incoming)
    }

    /// Milestones without outgoing edges.
    pub fn sinks(&self) -> Vec<MilestoneId> {
        self.boundary(Direction::Outgoing)
    }

    fn boundary(&self, direction: Direction) -> Vec<MilestoneId> {
        self.milestones
            .keys()
            .filter(|id| {
                self.graph
                    .neighbors_directed(self.node_map[*id], direction)
                    .next()
                    .is_none()
            })
            .cloned()
            .collect()
    }

    /// Every milestone reachable by following edges backwards, deduplicated.
    ///
    /// # Errors
    ///
    /// Returns `Error::MilestoneNotFound` if the milestone doesn't exist.
    pub fn predecessor_closure(&self, id: &MilestoneId) -> Result<BTreeSet<MilestoneId>> {
        let node = self
            .node_map
            .get(id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;
        Ok(graph::predecessor_closure(&self.graph, *node)
            .into_iter()
            .map(|ancestor| self.graph[ancestor].clone())
            .collect())
    }

    /// All milestones ordered so that predecessors come first.
    ///
    /// # Errors
    ///
    /// Returns `Error::CorruptGraph` if the edge set is cyclic.
    pub fn topological_order(&self) -> Result<Vec<MilestoneId>> {
        Ok(graph::topological_order(&self.graph)?
            .into_iter()
            .map(|node| self.graph[node].clone())
            .collect())
    }
}

fn validate_quantity(quantity: f64) -> Result<()> {
    if quantity.is_finite() && quantity >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidQuantity(quantity))
    }
}
