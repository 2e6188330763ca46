//! Integration tests for resource feasibility checking.

use chrono::NaiveDate;
use pert::domain::{MilestoneId, ResourceId, ResourceUpdate};
use pert::feasibility::ViolationKind;
use pert::project::Project;

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Add a milestone pinned to `[start, end]` that uses `quantity` of `resource`
fn milestone(
    project: &mut Project,
    name: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    resource: &ResourceId,
    quantity: f64,
) -> MilestoneId {
    let id = project.add_milestone(name).unwrap();
    project.set_pinned_dates(&id, start, end).unwrap();
    project.set_allocation(&id, resource, quantity).unwrap();
    id
}

fn capped_resource(project: &mut Project, cap: u32) -> ResourceId {
    let r = project.add_resource("Crane").unwrap();
    project
        .update_resource(&r, ResourceUpdate::Concurrency(Some(cap)))
        .unwrap();
    r
}

// =============================================================================
// Quantity
// =============================================================================

#[test]
fn test_cumulative_allocation_over_amount_flags_later_milestone() {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    project
        .update_resource(&r, ResourceUpdate::Amount(Some(5.0)))
        .unwrap();
    let m1 = milestone(&mut project, "M1", date(2024, 1, 1), None, &r, 3.0);
    let m2 = milestone(&mut project, "M2", date(2024, 1, 2), None, &r, 4.0);
    project.add_edge(&m1, &m2).unwrap();

    let feasibility = &project.analysis().feasibility;
    assert!(feasibility.is_flagged(&m2, &r, ViolationKind::Quantity));
    assert!(!feasibility.is_flagged(&m1, &r, ViolationKind::Quantity));
    assert_eq!(feasibility.len(), 1);
}

#[test]
fn test_quantity_order_follows_dates_not_ids() {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    project
        .update_resource(&r, ResourceUpdate::Amount(Some(5.0)))
        .unwrap();
    let late = milestone(&mut project, "Late", date(2024, 3, 1), None, &r, 3.0);
    let early = milestone(&mut project, "Early", None, date(2024, 2, 1), &r, 4.0);

    let feasibility = &project.analysis().feasibility;
    assert!(feasibility.is_flagged(&late, &r, ViolationKind::Quantity));
    assert!(!feasibility.is_flagged(&early, &r, ViolationKind::Quantity));
}

#[test]
fn test_undated_milestones_consume_first() {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    project
        .update_resource(&r, ResourceUpdate::Amount(Some(2.0)))
        .unwrap();
    let dated = milestone(&mut project, "Dated", date(2024, 1, 1), None, &r, 2.0);
    let undated = milestone(&mut project, "Undated", None, None, &r, 1.0);

    let feasibility = &project.analysis().feasibility;
    assert!(feasibility.is_flagged(&dated, &r, ViolationKind::Quantity));
    assert!(!feasibility.is_flagged(&undated, &r, ViolationKind::Quantity));
}

#[test]
fn test_unlimited_resource_is_always_feasible() {
    let mut project = Project::new();
    let r = project.add_resource("Volunteers").unwrap();
    milestone(&mut project, "A", None, None, &r, 1_000.0);
    milestone(&mut project, "B", None, None, &r, 1_000.0);
    assert!(project.analysis().feasibility.is_feasible());
}

#[test]
fn test_raising_amount_clears_flag() {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    project
        .update_resource(&r, ResourceUpdate::Amount(Some(1.0)))
        .unwrap();
    milestone(&mut project, "A", None, None, &r, 2.0);
    assert!(!project.analysis().feasibility.is_feasible());

    project
        .update_resource(&r, ResourceUpdate::Amount(Some(2.0)))
        .unwrap();
    assert!(project.analysis().feasibility.is_feasible());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_overlapping_intervals_exceed_cap() {
    let mut project = Project::new();
    let r = capped_resource(&mut project, 1);
    let m1 = milestone(&mut project, "M1", date(2024, 1, 1), date(2024, 1, 5), &r, 1.0);
    let m2 = milestone(&mut project, "M2", date(2024, 1, 3), date(2024, 1, 6), &r, 1.0);

    let feasibility = &project.analysis().feasibility;
    assert!(feasibility.is_flagged(&m2, &r, ViolationKind::Concurrency));
    assert!(!feasibility.is_flagged(&m1, &r, ViolationKind::Concurrency));
}

#[test]
fn test_release_on_same_day_frees_slot() {
    let mut project = Project::new();
    let r = capped_resource(&mut project, 1);
    milestone(&mut project, "M1", date(2024, 1, 1), date(2024, 1, 3), &r, 1.0);
    milestone(&mut project, "M2", date(2024, 1, 3), date(2024, 1, 5), &r, 1.0);

    assert!(project.analysis().feasibility.is_feasible());
}

#[test]
fn test_critical_milestone_takes_the_slot() {
    let mut project = Project::new();
    let r = capped_resource(&mut project, 1);
    let plain = milestone(&mut project, "Plain", date(2024, 1, 1), date(2024, 1, 5), &r, 1.0);
    let urgent = milestone(&mut project, "Urgent", date(2024, 1, 1), date(2024, 1, 5), &r, 1.0);
    project.set_critical(&urgent, true).unwrap();

    let feasibility = &project.analysis().feasibility;
    assert!(feasibility.is_flagged(&plain, &r, ViolationKind::Concurrency));
    assert!(!feasibility.is_flagged(&urgent, &r, ViolationKind::Concurrency));
}

#[test]
fn test_shallower_milestone_takes_the_slot() {
    let mut project = Project::new();
    let r = capped_resource(&mut project, 1);
    // Created first, so it would win an ID tie-break
    let deep = milestone(&mut project, "Deep", date(2024, 1, 5), date(2024, 1, 9), &r, 1.0);
    let parent = project.add_milestone("Parent").unwrap();
    project
        .set_pinned_dates(&parent, date(2024, 1, 1), date(2024, 1, 2))
        .unwrap();
    project.add_edge(&parent, &deep).unwrap();
    let shallow = milestone(&mut project, "Shallow", date(2024, 1, 5), date(2024, 1, 9), &r, 1.0);

    assert_eq!(project.analysis().levels[&deep], 1);
    let feasibility = &project.analysis().feasibility;
    assert!(feasibility.is_flagged(&deep, &r, ViolationKind::Concurrency));
    assert!(!feasibility.is_flagged(&shallow, &r, ViolationKind::Concurrency));
}

#[test]
fn test_zero_cap_is_uncapped() {
    let mut project = Project::new();
    let r = capped_resource(&mut project, 0);
    milestone(&mut project, "M1", date(2024, 1, 1), date(2024, 1, 5), &r, 1.0);
    milestone(&mut project, "M2", date(2024, 1, 1), date(2024, 1, 5), &r, 1.0);
    assert!(project.analysis().feasibility.is_feasible());
}

#[test]
fn test_zero_allocation_does_not_occupy_a_slot() {
    let mut project = Project::new();
    let r = capped_resource(&mut project, 1);
    milestone(&mut project, "M1", date(2024, 1, 1), date(2024, 1, 5), &r, 0.0);
    milestone(&mut project, "M2", date(2024, 1, 1), date(2024, 1, 5), &r, 1.0);
    assert!(project.analysis().feasibility.is_feasible());
}

#[test]
fn test_unbounded_intervals_never_release() {
    let mut project = Project::new();
    let r = capped_resource(&mut project, 1);
    let first = milestone(&mut project, "First", None, None, &r, 1.0);
    let second = milestone(&mut project, "Second", date(2030, 1, 1), None, &r, 1.0);

    let feasibility = &project.analysis().feasibility;
    assert!(!feasibility.is_flagged(&first, &r, ViolationKind::Concurrency));
    assert!(feasibility.is_flagged(&second, &r, ViolationKind::Concurrency));
    assert_eq!(
        feasibility.for_milestone(&second).next().unwrap().kind.to_string(),
        "concurrency"
    );
}
