//! Dependency graph traversals using petgraph.
//!
//! This module provides the graph algorithms the store and the analysis
//! components rely on:
//! - Cycle prevention (reachability check before inserting an edge)
//! - Topological ordering, failing fast on a cyclic edge set
//! - Predecessor closure (BFS with an explicit visited set)
//!
//! # Edge Direction
//!
//! Edges point from **predecessor -> successor**: an edge `a -> b` means `b`
//! must not start before `a` ends. `Direction::Incoming` therefore walks
//! towards the project start, `Direction::Outgoing` towards the project end.

use crate::domain::{EdgeId, MilestoneId};
use crate::error::{Error, Result};
use petgraph::Direction;
use petgraph::algo;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::error;

/// Graph of milestones (node weights) joined by edges (edge weights).
pub(crate) type DependencyGraph = StableDiGraph<MilestoneId, EdgeId>;

/// Check whether inserting `from -> to` would close a cycle.
///
/// Uses petgraph's `has_path_connecting` to look for an existing path from
/// `to` back to `from`. Callers reject self loops before calling this.
pub(super) fn would_cycle(
    graph: &DependencyGraph,
    node_map: &HashMap<MilestoneId, NodeIndex>,
    from: &MilestoneId,
    to: &MilestoneId,
) -> Result<bool> {
    let from_node = node_map
        .get(from)
        .ok_or_else(|| Error::MilestoneNotFound(from.clone()))?;
    let to_node = node_map
        .get(to)
        .ok_or_else(|| Error::MilestoneNotFound(to.clone()))?;

    Ok(algo::has_path_connecting(graph, *to_node, *from_node, None))
}

/// Order all milestones so that every predecessor comes before its successors.
///
/// # Errors
///
/// Returns `Error::CorruptGraph` if the edge set contains a cycle. The store
/// never accepts such an edge, so this indicates a bug rather than bad input.
pub(super) fn topological_order(graph: &DependencyGraph) -> Result<Vec<NodeIndex>> {
    algo::toposort(graph, None).map_err(|cycle| {
        let id = graph[cycle.node_id()].clone();
        error!(milestone = %id, "dependency graph contains a cycle");
        Error::CorruptGraph(id)
    })
}

/// All milestones reachable by walking edges backwards from `start`.
///
/// Each ancestor appears once, however many paths lead to it. `start`
/// itself is not included.
pub(super) fn predecessor_closure(graph: &DependencyGraph, start: NodeIndex) -> Vec<NodeIndex> {
    let mut visited = HashSet::new();
    let mut result = Vec::new();
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for predecessor in graph.neighbors_directed(current, Direction::Incoming) {
            if visited.insert(predecessor) {
                result.push(predecessor);
                queue.push_back(predecessor);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(edges: &[(&str, &str)]) -> (DependencyGraph, HashMap<MilestoneId, NodeIndex>) {
        let mut graph = DependencyGraph::default();
        let mut node_map = HashMap::new();
        for (index, (from, to)) in edges.iter().enumerate() {
            for id in [from, to] {
                let id = MilestoneId::new(*id);
                if !node_map.contains_key(&id) {
                    let node = graph.add_node(id.clone());
                    node_map.insert(id, node);
                }
            }
            graph.add_edge(
                node_map[&MilestoneId::new(*from)],
                node_map[&MilestoneId::new(*to)],
                EdgeId::new(format!("e{}", index + 1)),
            );
        }
        (graph, node_map)
    }

    #[test]
    fn test_would_cycle_detects_transitive_path() {
        let (graph, node_map) = build(&[("a", "b"), ("b", "c")]);
        let a = MilestoneId::new("a");
        let c = MilestoneId::new("c");
        assert!(would_cycle(&graph, &node_map, &c, &a).unwrap());
        assert!(!would_cycle(&graph, &node_map, &a, &c).unwrap());
    }

    #[test]
    fn test_closure_deduplicates_diamond() {
        let (graph, node_map) = build(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let closure = predecessor_closure(&graph, node_map[&MilestoneId::new("d")]);
        assert_eq!(closure.len(), 3);
    }

    #[test]
    fn test_topological_order_reports_cycle() {
        let (mut graph, node_map) = build(&[("a", "b")]);
        graph.add_edge(
            node_map[&MilestoneId::new("b")],
            node_map[&MilestoneId::new("a")],
            EdgeId::new("bad"),
        );
        assert!(matches!(
            topological_order(&graph),
            Err(Error::CorruptGraph(_))
        ));
    }
}
