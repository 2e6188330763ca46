//! Integration tests for cost aggregation and critical edges.

use chrono::NaiveDate;
use pert::cost::CostRow;
use pert::domain::{MilestoneId, ResourceId};
use pert::error::Error;
use pert::project::Project;

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn value(rows: &[CostRow], resource: &ResourceId) -> f64 {
    rows.iter()
        .find(|row| &row.resource == resource)
        .map(|row| row.value)
        .unwrap()
}

/// Diamond `A -> B -> D`, `A -> C -> D`, each using its index + 1 of one resource
fn diamond() -> (Project, Vec<MilestoneId>, ResourceId) {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    let ids: Vec<MilestoneId> = ["A", "B", "C", "D"]
        .into_iter()
        .map(|name| project.add_milestone(name).unwrap())
        .collect();
    for (index, id) in ids.iter().enumerate() {
        project.set_allocation(id, &r, (index + 1) as f64).unwrap();
    }
    project.add_edge(&ids[0], &ids[1]).unwrap();
    project.add_edge(&ids[0], &ids[2]).unwrap();
    project.add_edge(&ids[1], &ids[3]).unwrap();
    project.add_edge(&ids[2], &ids[3]).unwrap();
    (project, ids, r)
}

#[test]
fn test_cost_up_to_counts_shared_ancestor_once() {
    let (project, ids, r) = diamond();
    let rows = project.cost_up_to(&ids[3]).unwrap();
    // A(1) + B(2) + C(3) + D(4)
    assert_eq!(value(&rows, &r), 10.0);
}

#[test]
fn test_cost_up_to_source_is_own_allocation() {
    let (project, ids, r) = diamond();
    let rows = project.cost_up_to(&ids[0]).unwrap();
    assert_eq!(value(&rows, &r), 1.0);
}

#[test]
fn test_cost_up_to_unknown_milestone() {
    let (project, _, _) = diamond();
    assert!(matches!(
        project.cost_up_to(&MilestoneId::new("n42")),
        Err(Error::MilestoneNotFound(_))
    ));
}

#[test]
fn test_cost_until_uses_pinned_or_derived_start() {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    let a = project.add_milestone("A").unwrap();
    let b = project.add_milestone("B").unwrap();
    let c = project.add_milestone("C").unwrap();
    project.add_edge(&a, &b).unwrap();
    project.set_pinned_dates(&a, date(2024, 1, 1), date(2024, 2, 1)).unwrap();
    project.set_pinned_dates(&c, date(2024, 6, 1), None).unwrap();
    for id in [&a, &b, &c] {
        project.set_allocation(id, &r, 1.0).unwrap();
    }

    // B starts no earlier than A's end
    assert_eq!(value(&project.cost_until(date(2024, 1, 15)), &r), 1.0);
    assert_eq!(value(&project.cost_until(date(2024, 2, 1)), &r), 2.0);
    assert_eq!(value(&project.cost_until(None), &r), 3.0);
}

#[test]
fn test_undated_milestones_always_count() {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    let a = project.add_milestone("A").unwrap();
    project.set_allocation(&a, &r, 2.5).unwrap();
    assert_eq!(value(&project.cost_until(date(2000, 1, 1)), &r), 2.5);
}

#[test]
fn test_deleted_resources_drop_out_of_costs() {
    let (mut project, ids, r) = diamond();
    project.remove_resource(&r).unwrap();
    assert!(project.cost_up_to(&ids[3]).unwrap().is_empty());
}

#[test]
fn test_critical_edges_follow_flags() {
    let (mut project, ids, _) = diamond();
    assert!(project.critical_edges().is_empty());

    project.set_critical(&ids[0], true).unwrap();
    project.set_critical(&ids[1], true).unwrap();
    project.set_critical(&ids[3], true).unwrap();
    let edges = project.critical_edges();
    assert_eq!(edges.len(), 2);
    for edge in &edges {
        let edge = project.store().edge(edge).unwrap();
        assert_ne!(edge.from, ids[2]);
        assert_ne!(edge.to, ids[2]);
    }
}
