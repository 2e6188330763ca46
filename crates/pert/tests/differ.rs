//! Integration tests for the requirement-change report and advancement.

use chrono::NaiveDate;
use pert::config::EngineConfig;
use pert::diff::{Advancement, Change};
use pert::domain::ResourceUpdate;
use pert::project::Project;

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn new_year() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

// =============================================================================
// Dates
// =============================================================================

#[test]
fn test_future_end_change_is_a_shift() {
    let mut project = Project::new();
    project.set_project_dates(None, date(2024, 2, 1)).unwrap();
    project.commit_baseline().unwrap();
    project.set_project_dates(None, date(2024, 2, 5)).unwrap();

    let report = project
        .change_report(new_year(), &EngineConfig::default())
        .unwrap();
    assert_eq!(report.project, vec![Change::EndShifted { days: 4 }]);
    assert_eq!(report.project[0].to_string(), "End shifted forward by 4 days");
}

#[test]
fn test_past_end_change_is_late() {
    let mut project = Project::new();
    let m = project.add_milestone("Launch").unwrap();
    project.set_pinned_dates(&m, None, date(2024, 2, 1)).unwrap();
    project.commit_baseline().unwrap();
    project.set_pinned_dates(&m, None, date(2024, 2, 5)).unwrap();

    let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let report = project.change_report(today, &EngineConfig::default()).unwrap();
    let entry = report.milestone(&m).unwrap();
    assert_eq!(entry.changes, vec![Change::Finished { days: 4 }]);
    assert_eq!(entry.changes[0].to_string(), "Finished 4 days late");
}

#[test]
fn test_moving_both_dates_is_a_shift() {
    let mut project = Project::new();
    let m = project.add_milestone("Build").unwrap();
    project
        .set_pinned_dates(&m, date(2024, 3, 1), date(2024, 3, 10))
        .unwrap();
    project.commit_baseline().unwrap();
    project
        .set_pinned_dates(&m, date(2024, 2, 27), date(2024, 3, 7))
        .unwrap();

    let report = project
        .change_report(new_year(), &EngineConfig::default())
        .unwrap();
    let entry = report.milestone(&m).unwrap();
    assert_eq!(entry.changes, vec![Change::Shifted { days: -3 }]);
    assert_eq!(entry.changes[0].to_string(), "Shifted back by 3 days");
}

#[test]
fn test_stretched_milestone_reports_duration() {
    let mut project = Project::new();
    let m = project.add_milestone("Build").unwrap();
    project
        .set_pinned_dates(&m, date(2024, 3, 1), date(2024, 3, 10))
        .unwrap();
    project.commit_baseline().unwrap();
    project
        .set_pinned_dates(&m, date(2024, 3, 1), date(2024, 3, 12))
        .unwrap();

    let report = project
        .change_report(new_year(), &EngineConfig::default())
        .unwrap();
    let texts: Vec<String> = report
        .milestone(&m)
        .unwrap()
        .changes
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        texts,
        vec!["End shifted forward by 2 days", "Duration increased by 2 days"]
    );
}

// =============================================================================
// Entities
// =============================================================================

#[test]
fn test_untouched_project_is_according_to_plan() {
    let mut project = Project::new();
    project.add_milestone("Kickoff").unwrap();
    project.add_resource("Budget").unwrap();
    project.commit_baseline().unwrap();

    let config = EngineConfig::default();
    let report = project.change_report(new_year(), &config).unwrap();
    assert!(report.is_empty());
    assert_eq!(
        report.to_string().matches(&config.plan_message).count(),
        3
    );
}

#[test]
fn test_added_deleted_and_renamed() {
    let mut project = Project::new();
    let kept = project.add_milestone("Design").unwrap();
    let dropped = project.add_milestone("Prototype").unwrap();
    project.commit_baseline().unwrap();

    project.remove_milestone(&dropped).unwrap();
    project.rename_milestone(&kept, "Detailed design").unwrap();
    let added = project.add_milestone("Review").unwrap();
    project.set_critical(&added, true).unwrap();

    let report = project
        .change_report(new_year(), &EngineConfig::default())
        .unwrap();
    assert_eq!(
        report.milestone(&kept).unwrap().changes,
        vec![Change::Renamed {
            from: "Design".to_string(),
            to: "Detailed design".to_string(),
        }]
    );
    assert_eq!(report.milestone(&dropped).unwrap().changes, vec![Change::Deleted]);
    assert_eq!(report.milestone(&dropped).unwrap().name, "Prototype");
    assert_eq!(report.milestone(&added).unwrap().changes, vec![Change::Added]);
}

#[test]
fn test_resource_changes_are_itemized() {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    project.commit_baseline().unwrap();
    project
        .update_resource(&r, ResourceUpdate::Amount(Some(10.0)))
        .unwrap();
    project
        .update_resource(&r, ResourceUpdate::Concurrency(Some(2)))
        .unwrap();

    let report = project
        .change_report(new_year(), &EngineConfig::default())
        .unwrap();
    let texts: Vec<String> = report
        .resource(&r)
        .unwrap()
        .changes
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        texts,
        vec![
            "Amount changed from unlimited to 10",
            "Concurrency changed from uncapped to 2",
        ]
    );
}

#[test]
fn test_allocation_deltas_roll_up_to_project() {
    let mut project = Project::new();
    let r = project.add_resource("Budget").unwrap();
    let a = project.add_milestone("A").unwrap();
    let b = project.add_milestone("B").unwrap();
    project.set_allocation(&a, &r, 3.0).unwrap();
    project.set_allocation(&b, &r, 1.0).unwrap();
    project.commit_baseline().unwrap();
    project.set_allocation(&a, &r, 5.0).unwrap();
    project.set_allocation(&b, &r, 2.0).unwrap();

    let report = project
        .change_report(new_year(), &EngineConfig::default())
        .unwrap();
    assert_eq!(
        report.milestone(&a).unwrap().changes[0].to_string(),
        "Budget allocation changed from 3 to 5"
    );
    assert_eq!(
        report.project,
        vec![Change::TotalAllocation {
            resource: r,
            name: "Budget".to_string(),
            delta: 3.0,
        }]
    );
    assert_eq!(
        report.project[0].to_string(),
        "Total Budget allocation increased by 3"
    );
}

#[test]
fn test_edge_changes_attach_to_origin() {
    let mut project = Project::new();
    let a = project.add_milestone("A").unwrap();
    let b = project.add_milestone("B").unwrap();
    let c = project.add_milestone("C").unwrap();
    let ab = project.add_edge(&a, &b).unwrap();
    project.add_edge(&b, &c).unwrap();
    project.commit_baseline().unwrap();

    project.remove_edge(&ab).unwrap();
    project.add_edge(&a, &c).unwrap();
    project.remove_milestone(&c).unwrap();
    project.add_edge(&b, &a).unwrap();

    let report = project
        .change_report(new_year(), &EngineConfig::default())
        .unwrap();
    let a_texts: Vec<String> = report
        .milestone(&a)
        .unwrap()
        .changes
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(a_texts, vec!["Connection to \"B\" severed"]);
    assert_eq!(
        report.milestone(&b).unwrap().changes,
        vec![Change::Connected {
            to: a.clone(),
            name: "A".to_string(),
        }]
    );
    // B -> C vanished with C; only the deletion is reported
    assert_eq!(report.milestone(&c).unwrap().changes, vec![Change::Deleted]);
}

// =============================================================================
// Advancement
// =============================================================================

#[test]
fn test_advancement_compares_end_dates() {
    let mut project = Project::new();
    let ahead = project.add_milestone("Ahead").unwrap();
    let behind = project.add_milestone("Behind").unwrap();
    let steady = project.add_milestone("Steady").unwrap();
    for id in [&ahead, &behind, &steady] {
        project.set_pinned_dates(id, None, date(2024, 5, 1)).unwrap();
    }
    project.commit_baseline().unwrap();

    project.set_pinned_dates(&ahead, None, date(2024, 4, 20)).unwrap();
    project.set_pinned_dates(&behind, None, date(2024, 5, 3)).unwrap();
    let unplanned = project.add_milestone("Unplanned").unwrap();

    let advancement = project.advancement().unwrap();
    assert_eq!(advancement[&ahead], Advancement::Ahead);
    assert_eq!(advancement[&behind], Advancement::Behind);
    assert_eq!(advancement[&steady], Advancement::OnSchedule);
    assert_eq!(advancement[&unplanned], Advancement::Unplanned);
}

// =============================================================================
// Reloaded Projects
// =============================================================================

#[test]
fn test_reload_keeps_deleted_baseline_ids_reserved() {
    let mut project = Project::new();
    project.add_milestone("Design").unwrap();
    let prototype = project.add_milestone("Prototype").unwrap();
    project.add_resource("Budget").unwrap();
    let crane = project.add_resource("Crane").unwrap();
    project.commit_baseline().unwrap();
    project.remove_milestone(&prototype).unwrap();
    project.remove_resource(&crane).unwrap();

    let (mut reloaded, warnings) = Project::from_snapshot(project.to_snapshot()).unwrap();
    assert!(warnings.is_empty());
    let review = reloaded.add_milestone("Review").unwrap();
    let forklift = reloaded.add_resource("Forklift").unwrap();
    assert_ne!(review, prototype);
    assert_ne!(forklift, crane);

    let report = reloaded
        .change_report(new_year(), &EngineConfig::default())
        .unwrap();
    assert_eq!(report.milestone(&prototype).unwrap().changes, vec![Change::Deleted]);
    assert_eq!(report.milestone(&review).unwrap().changes, vec![Change::Added]);
    assert_eq!(report.resource(&crane).unwrap().changes, vec![Change::Deleted]);
    assert_eq!(report.resource(&forklift).unwrap().changes, vec![Change::Added]);

    let advancement = reloaded.advancement().unwrap();
    assert_eq!(advancement[&review], Advancement::Unplanned);
}
