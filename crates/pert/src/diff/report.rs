//! Change report entries and their human-readable rendering.

use crate::domain::{MilestoneId, ResourceId};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// One itemized difference between the baseline and the current plan.
///
/// Day counts are signed: positive means later than planned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    /// Only present in the current plan
    Added,
    /// Only present in the baseline
    Deleted,
    /// Name changed
    Renamed {
        /// Baseline name
        from: String,
        /// Current name
        to: String,
    },
    /// Start and end moved by the same number of days
    Shifted {
        /// Signed offset in days
        days: i64,
    },
    /// Start moved, and the new start is still ahead
    StartShifted {
        /// Signed start offset in days
        days: i64,
    },
    /// Start moved, and the new start has passed
    Started {
        /// Signed start offset in days
        days: i64,
    },
    /// End moved, and the new end is still ahead
    EndShifted {
        /// Signed end offset in days
        days: i64,
    },
    /// End moved, and the new end has passed
    Finished {
        /// Signed end offset in days
        days: i64,
    },
    /// End moved relative to start, new end still ahead
    DurationChanged {
        /// Signed change of the duration in days
        days: i64,
    },
    /// End moved relative to start, new end has passed
    Completed {
        /// Signed change of the duration in days
        days: i64,
    },
    /// A start date was pinned where the baseline had none
    StartSet {
        /// New pinned start
        date: NaiveDate,
    },
    /// The baseline start date was unpinned
    StartCleared,
    /// An end date was pinned where the baseline had none
    EndSet {
        /// New pinned end
        date: NaiveDate,
    },
    /// The baseline end date was unpinned
    EndCleared,
    /// Critical flag set
    MarkedCritical,
    /// Critical flag cleared
    UnmarkedCritical,
    /// Resource capacity changed; `None` is unlimited
    AmountChanged {
        /// Baseline amount
        from: Option<f64>,
        /// Current amount
        to: Option<f64>,
    },
    /// Resource concurrency cap changed; `None` is uncapped
    ConcurrencyChanged {
        /// Baseline cap
        from: Option<u32>,
        /// Current cap
        to: Option<u32>,
    },
    /// Allocation of a resource on one milestone changed
    Allocation {
        /// Allocated resource
        resource: ResourceId,
        /// Resource name, current if it still exists
        name: String,
        /// Baseline quantity
        from: f64,
        /// Current quantity
        to: f64,
    },
    /// Net allocation change of a resource across all milestones
    TotalAllocation {
        /// Allocated resource
        resource: ResourceId,
        /// Resource name, current if it still exists
        name: String,
        /// Sum of the per-milestone changes
        delta: f64,
    },
    /// New dependency to another milestone
    Connected {
        /// Successor milestone
        to: MilestoneId,
        /// Successor name
        name: String,
    },
    /// Dependency to another milestone removed
    Severed {
        /// Former successor milestone
        to: MilestoneId,
        /// Former successor name
        name: String,
    },
}

fn days(n: i64) -> String {
    let n = n.unsigned_abs();
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

fn direction(n: i64) -> &'static str {
    if n > 0 { "forward" } else { "back" }
}

fn lateness(n: i64) -> &'static str {
    if n > 0 { "late" } else { "ahead of time" }
}

fn amount(value: Option<f64>) -> String {
    value.map_or_else(|| "unlimited".to_string(), |v| v.to_string())
}

fn cap(value: Option<u32>) -> String {
    value
        .filter(|&cap| cap > 0)
        .map_or_else(|| "uncapped".to_string(), |v| v.to_string())
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "Added"),
            Self::Deleted => write!(f, "Deleted"),
            Self::Renamed { from, to } => write!(f, "Renamed from \"{from}\" to \"{to}\""),
            Self::Shifted { days: n } => write!(f, "Shifted {} by {}", direction(*n), days(*n)),
            Self::StartShifted { days: n } => {
                write!(f, "Start shifted {} by {}", direction(*n), days(*n))
            }
            Self::Started { days: n } => write!(f, "Started {} {}", days(*n), lateness(*n)),
            Self::EndShifted { days: n } => {
                write!(f, "End shifted {} by {}", direction(*n), days(*n))
            }
            Self::Finished { days: n } => write!(f, "Finished {} {}", days(*n), lateness(*n)),
            Self::DurationChanged { days: n } => {
                let change = if *n > 0 { "increased" } else { "decreased" };
                write!(f, "Duration {change} by {}", days(*n))
            }
            Self::Completed { days: n } => write!(f, "Completed {} {}", days(*n), lateness(*n)),
            Self::StartSet { date } => write!(f, "Start date set to {date}"),
            Self::StartCleared => write!(f, "Start date removed"),
            Self::EndSet { date } => write!(f, "End date set to {date}"),
            Self::EndCleared => write!(f, "End date removed"),
            Self::MarkedCritical => write!(f, "Marked as critical"),
            Self::UnmarkedCritical => write!(f, "No longer critical"),
            Self::AmountChanged { from, to } => {
                write!(f, "Amount changed from {} to {}", amount(*from), amount(*to))
            }
            Self::ConcurrencyChanged { from, to } => {
                write!(f, "Concurrency changed from {} to {}", cap(*from), cap(*to))
            }
            Self::Allocation { name, from, to, .. } => {
                write!(f, "{name} allocation changed from {from} to {to}")
            }
            Self::TotalAllocation { name, delta, .. } => {
                let change = if *delta > 0.0 { "increased" } else { "decreased" };
                write!(f, "Total {name} allocation {change} by {}", delta.abs())
            }
            Self::Connected { name, .. } => write!(f, "Connected to \"{name}\""),
            Self::Severed { name, .. } => write!(f, "Connection to \"{name}\" severed"),
        }
    }
}

/// Changes to one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceChanges {
    /// Resource ID
    pub id: ResourceId,
    /// Current name, or the baseline name for a deleted resource
    pub name: String,
    /// Itemized changes, never empty
    pub changes: Vec<Change>,
}

/// Changes to one milestone, including the dependencies it originates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneChanges {
    /// Milestone ID
    pub id: MilestoneId,
    /// Current name, or the baseline name for a deleted milestone
    pub name: String,
    /// Itemized changes, never empty
    pub changes: Vec<Change>,
}

/// The requirement-change report, partitioned into three buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeReport {
    /// Envelope dates and net allocation totals
    pub project: Vec<Change>,
    /// Added, deleted and edited resources
    pub resources: Vec<ResourceChanges>,
    /// Added, deleted and edited milestones
    pub milestones: Vec<MilestoneChanges>,
    /// Text shown in place of an empty bucket
    pub plan_message: String,
}

impl ChangeReport {
    /// Whether the current plan matches the baseline exactly
    pub fn is_empty(&self) -> bool {
        self.project.is_empty() && self.resources.is_empty() && self.milestones.is_empty()
    }

    /// Changes recorded for one milestone
    pub fn milestone(&self, id: &MilestoneId) -> Option<&MilestoneChanges> {
        self.milestones.iter().find(|entry| &entry.id == id)
    }

    /// Changes recorded for one resource
    pub fn resource(&self, id: &ResourceId) -> Option<&ResourceChanges> {
        self.resources.iter().find(|entry| &entry.id == id)
    }
}

impl fmt::Display for ChangeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project")?;
        if self.project.is_empty() {
            writeln!(f, "  {}", self.plan_message)?;
        }
        for change in &self.project {
            writeln!(f, "  {change}")?;
        }

        writeln!(f, "Resources")?;
        if self.resources.is_empty() {
            writeln!(f, "  {}", self.plan_message)?;
        }
        for entry in &self.resources {
            writeln!(f, "  {}", entry.name)?;
            for change in &entry.changes {
                writeln!(f, "    {change}")?;
            }
        }

        writeln!(f, "Milestones")?;
        if self.milestones.is_empty() {
            writeln!(f, "  {}", self.plan_message)?;
        }
        for entry in &self.milestones {
            writeln!(f, "  {}", entry.name)?;
            for change in &entry.changes {
                writeln!(f, "    {change}")?;
            }
        }
        Ok(())
    }
}
