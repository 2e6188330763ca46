//! Date constraint propagation.
//!
//! Derives a `[min, max]` window for the start and the end of every
//! milestone, and the project envelope, from three rules:
//!
//! 1. pinned dates anchor a milestone (the project's own pinned dates anchor
//!    the source and sink milestones),
//! 2. a milestone never ends before it starts,
//! 3. an edge `a -> b` forbids `b` from starting before `a` ends.
//!
//! # Algorithm
//!
//! The **forward pass** walks milestones in topological order. A source
//! milestone receives the project start as its lower limit; any other
//! milestone receives the latest limit handed on by its predecessors. Then:
//!
//! - `start.min` = incoming limit
//! - `end.min` = later of `start.min` and the pinned start
//! - the limit handed on = pinned end, else `end.min`
//!
//! The **backward pass** mirrors this in reverse topological order with the
//! project end, `end.max`, `start.max` and the earliest limit.
//!
//! Processing in topological order visits each milestone once, after all of
//! its predecessors, so a milestone reachable along several paths ends up
//! with the most restrictive bound seen on any of them.
//!
//! Pinned dates are never changed. A pinned date outside its computed window
//! is reported as a [`ConstraintViolation`].

use crate::domain::dates::{earlier, later};
use crate::domain::{Bounds, DateWindow, MilestoneId, ProjectDates};
use crate::error::Result;
use crate::store::GraphStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

/// Computed date windows for every milestone and the project envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    /// Windows per milestone
    pub milestones: BTreeMap<MilestoneId, Bounds>,

    /// Envelope windows.
    ///
    /// Only `start.max` (the earliest source milestone date) and `end.min`
    /// (the latest sink milestone date) are derived; the other two sides
    /// are always unbounded.
    pub project: Bounds,
}

impl Schedule {
    /// Windows of a single milestone
    pub fn bounds(&self, id: &MilestoneId) -> Option<&Bounds> {
        self.milestones.get(id)
    }
}

/// Compute the date windows for the current graph.
///
/// # Errors
///
/// Returns `Error::CorruptGraph` if the edge set is cyclic.
pub fn propagate(store: &GraphStore, dates: &ProjectDates) -> Result<Schedule> {
    let order = store.topological_order()?;
    let milestones = store.milestones();

    let mut schedule = Schedule {
        milestones: milestones
            .keys()
            .map(|id| (id.clone(), Bounds::default()))
            .collect(),
        project: Bounds::default(),
    };

    // Forward pass: lower bounds
    let mut handed_on: HashMap<&MilestoneId, Option<NaiveDate>> = HashMap::new();
    for id in &order {
        let milestone = &milestones[id];
        let predecessors = store.predecessors(id);
        let incoming = if predecessors.is_empty() {
            dates.start
        } else {
            predecessors
                .iter()
                .fold(None, |limit, predecessor| later(limit, handed_on[predecessor]))
        };

        let bounds = schedule.milestones.entry(id.clone()).or_default();
        bounds.start.min = incoming;
        bounds.end.min = later(incoming, milestone.start);
        handed_on.insert(id, milestone.end.or(bounds.end.min));
    }

    // Backward pass: upper bounds
    let mut handed_back: HashMap<&MilestoneId, Option<NaiveDate>> = HashMap::new();
    for id in order.iter().rev() {
        let milestone = &milestones[id];
        let successors = store.successors(id);
        let incoming = if successors.is_empty() {
            dates.end
        } else {
            successors
                .iter()
                .fold(None, |limit, successor| earlier(limit, handed_back[successor]))
        };

        let bounds = schedule.milestones.entry(id.clone()).or_default();
        bounds.end.max = incoming;
        bounds.start.max = earlier(incoming, milestone.end);
        handed_back.insert(id, milestone.start.or(bounds.start.max));
    }

    // Envelope
    for id in store.sources() {
        let milestone = &milestones[&id];
        let value = milestone
            .start
            .or(milestone.end)
            .or(schedule.milestones[&id].end.max);
        schedule.project.start.max = earlier(schedule.project.start.max, value);
    }
    for id in store.sinks() {
        let milestone = &milestones[&id];
        let value = milestone
            .end
            .or(milestone.start)
            .or(schedule.milestones[&id].start.min);
        schedule.project.end.min = later(schedule.project.end.min, value);
    }

    debug!(
        milestones = schedule.milestones.len(),
        project_start_max = ?schedule.project.start.max,
        project_end_min = ?schedule.project.end.min,
        "propagated date constraints"
    );
    Ok(schedule)
}

/// What a constraint violation is about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Subject {
    /// The project envelope
    Project,
    /// A single milestone
    Milestone(MilestoneId),
}

/// Which pinned date is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DateField {
    /// The start date
    Start,
    /// The end date
    End,
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// A pinned date that falls outside its computed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    /// Project or milestone owning the date
    pub subject: Subject,
    /// Violated field
    pub field: DateField,
    /// The user-pinned date
    pub pinned: NaiveDate,
    /// Window the date should lie in
    pub window: DateWindow,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound =
            |date: Option<NaiveDate>| date.map_or_else(|| "..".to_string(), |d| d.to_string());
        match &self.subject {
            Subject::Project => write!(f, "Project {}", self.field)?,
            Subject::Milestone(id) => write!(f, "Milestone {} {}", id, self.field)?,
        }
        write!(
            f,
            " {} is outside [{}, {}]",
            self.pinned,
            bound(self.window.min),
            bound(self.window.max)
        )
    }
}

/// Collect every pinned date outside its window.
pub fn constraint_violations(
    store: &GraphStore,
    dates: &ProjectDates,
    schedule: &Schedule,
) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    let mut check =
        |subject: Subject, field: DateField, pinned: Option<NaiveDate>, window: DateWindow| {
            if let Some(pinned) = pinned
                && !window.contains(pinned)
            {
                violations.push(ConstraintViolation {
                    subject,
                    field,
                    pinned,
                    window,
                });
            }
        };

    check(Subject::Project, DateField::Start, dates.start, schedule.project.start);
    check(Subject::Project, DateField::End, dates.end, schedule.project.end);

    for (id, milestone) in store.milestones() {
        let Some(bounds) = schedule.bounds(id) else {
            continue;
        };
        check(
            Subject::Milestone(id.clone()),
            DateField::Start,
            milestone.start,
            bounds.start,
        );
        check(
            Subject::Milestone(id.clone()),
            DateField::End,
            milestone.end,
            bounds.end,
        );
    }

    for violation in &violations {
        warn!(%violation, "constraint violation");
    }
    violations
}
