//! The project: graph store, envelope dates, baseline and live analysis.
//!
//! [`Project`] is the single owner of a plan. Every edit goes through it and
//! is followed by a full recompute of the [`Analysis`], so readers never see
//! bounds or findings that lag behind the graph.

use crate::config::{EngineConfig, today_at};
use crate::cost::{self, CostRow};
use crate::diff::{self, Advancement, Baseline, ChangeReport};
use crate::domain::{
    Bounds, Edge, EdgeId, Milestone, MilestoneId, ProjectDates, Resource, ResourceId,
    ResourceUpdate,
};
use crate::error::{Error, Result};
use crate::feasibility::{self, Feasibility};
use crate::schedule::{self, ConstraintViolation, Schedule};
use crate::snapshot::{self, LoadWarning, Snapshot, Stats, now_millis};
use crate::store::GraphStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Everything derived from the graph by a recompute.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analysis {
    /// Date windows per milestone and for the envelope
    pub schedule: Schedule,
    /// Pinned dates outside their windows
    pub violations: Vec<ConstraintViolation>,
    /// Resource quantity and concurrency findings
    pub feasibility: Feasibility,
    /// Topological depth per milestone
    pub levels: BTreeMap<MilestoneId, usize>,
}

impl Analysis {
    /// Run every analysis over the current graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::CorruptGraph` if the edge set is cyclic.
    pub fn compute(store: &GraphStore, dates: &ProjectDates) -> Result<Self> {
        let schedule = schedule::propagate(store, dates)?;
        let violations = schedule::constraint_violations(store, dates, &schedule);
        let levels = cost::levels(store)?;
        let feasibility = feasibility::check(store, &schedule, &levels);
        Ok(Self {
            schedule,
            violations,
            feasibility,
            levels,
        })
    }

    /// Date windows of a milestone
    pub fn bounds(&self, id: &MilestoneId) -> Option<&Bounds> {
        self.schedule.bounds(id)
    }

    /// Date windows of the project envelope
    pub fn project_bounds(&self) -> &Bounds {
        &self.schedule.project
    }
}

/// A milestone plan with its derived analysis.
#[derive(Debug, Clone)]
pub struct Project {
    store: GraphStore,
    dates: ProjectDates,
    baseline: Option<Baseline>,
    timezone: Option<i32>,
    stats: Stats,
    analysis: Analysis,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    /// Create an empty project
    pub fn new() -> Self {
        Self {
            store: GraphStore::new(),
            dates: ProjectDates::default(),
            baseline: None,
            timezone: None,
            stats: Stats::created_now(),
            analysis: Analysis::default(),
        }
    }

    /// Rebuild a project from a snapshot.
    ///
    /// Edges the store refuses are skipped and returned as warnings.
    /// `stats.accessedAt` is refreshed.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<(Self, Vec<LoadWarning>)> {
        let (store, warnings) = snapshot.to_store()?;
        let dates = snapshot.dates();
        let analysis = Analysis::compute(&store, &dates)?;

        let mut stats = snapshot.stats;
        stats.accessed_at = Some(now_millis());

        let project = Self {
            store,
            dates,
            baseline: snapshot.original,
            timezone: snapshot.timezone,
            stats,
            analysis,
        };
        Ok((project, warnings))
    }

    /// Export the project in the persisted shape
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot::capture(
            &self.store,
            &self.dates,
            self.stats,
            self.baseline.clone(),
            self.timezone,
        )
    }

    /// Load a project from a snapshot file
    pub async fn load(path: &Path) -> Result<(Self, Vec<LoadWarning>)> {
        let snapshot = snapshot::load_snapshot(path).await?;
        Self::from_snapshot(snapshot)
    }

    /// Save the project to a snapshot file, refreshing `stats.modifiedAt`
    pub async fn save(&mut self, path: &Path) -> Result<()> {
        self.stats.modified_at = Some(now_millis());
        snapshot::save_snapshot(&self.to_snapshot(), path).await
    }

    fn recompute(&mut self) -> Result<()> {
        self.analysis = Analysis::compute(&self.store, &self.dates)?;
        debug!(
            milestones = self.store.milestones().len(),
            violations = self.analysis.violations.len(),
            findings = self.analysis.feasibility.len(),
            "recomputed analysis"
        );
        Ok(())
    }

    // ========== Accessors ==========

    /// The graph store
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// The current analysis
    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// The project's pinned dates
    pub fn dates(&self) -> ProjectDates {
        self.dates
    }

    /// The committed baseline, if the project has been started
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Whether a baseline has been committed
    pub fn is_started(&self) -> bool {
        self.baseline.is_some()
    }

    /// Bookkeeping timestamps
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Project-specific timezone offset in minutes east of UTC
    pub fn timezone(&self) -> Option<i32> {
        self.timezone
    }

    /// Override the configured timezone for this project
    pub fn set_timezone(&mut self, offset_minutes: Option<i32>) {
        self.timezone = offset_minutes;
    }

    /// Today's date in the project's timezone, else the configured one
    pub fn today(&self, config: &EngineConfig) -> Result<NaiveDate> {
        today_at(self.timezone.unwrap_or(config.timezone_offset))
    }

    // ========== Edits ==========

    /// Add a milestone
    pub fn add_milestone(&mut self, name: impl Into<String>) -> Result<MilestoneId> {
        let id = self.store.add_milestone(name)?;
        self.recompute()?;
        Ok(id)
    }

    /// Remove a milestone and its edges
    pub fn remove_milestone(&mut self, id: &MilestoneId) -> Result<Milestone> {
        let milestone = self.store.remove_milestone(id)?;
        self.recompute()?;
        Ok(milestone)
    }

    /// Rename a milestone
    pub fn rename_milestone(&mut self, id: &MilestoneId, name: impl Into<String>) -> Result<()> {
        self.store.rename_milestone(id, name)?;
        self.recompute()
    }

    /// Set or clear a milestone's pinned dates
    pub fn set_pinned_dates(
        &mut self,
        id: &MilestoneId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<()> {
        self.store.set_pinned_dates(id, start, end)?;
        self.recompute()
    }

    /// Set a milestone's critical flag
    pub fn set_critical(&mut self, id: &MilestoneId, critical: bool) -> Result<()> {
        self.store.set_critical(id, critical)?;
        self.recompute()
    }

    /// Flip a milestone's critical flag
    pub fn toggle_critical(&mut self, id: &MilestoneId) -> Result<bool> {
        let critical = self.store.toggle_critical(id)?;
        self.recompute()?;
        Ok(critical)
    }

    /// Set how much of a resource a milestone consumes
    pub fn set_allocation(
        &mut self,
        milestone: &MilestoneId,
        resource: &ResourceId,
        quantity: f64,
    ) -> Result<()> {
        self.store.set_allocation(milestone, resource, quantity)?;
        self.recompute()
    }

    /// Whether `from -> to` could be added, without adding it
    pub fn check_edge(&self, from: &MilestoneId, to: &MilestoneId) -> Result<()> {
        self.store.check_edge(from, to)
    }

    /// Add a dependency edge
    pub fn add_edge(&mut self, from: &MilestoneId, to: &MilestoneId) -> Result<EdgeId> {
        let id = self.store.add_edge(from, to)?;
        self.recompute()?;
        Ok(id)
    }

    /// Remove a dependency edge
    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<Edge> {
        let edge = self.store.remove_edge(id)?;
        self.recompute()?;
        Ok(edge)
    }

    /// Add a resource
    pub fn add_resource(&mut self, name: impl Into<String>) -> Result<ResourceId> {
        let id = self.store.add_resource(name)?;
        self.recompute()?;
        Ok(id)
    }

    /// Change one field of a resource
    pub fn update_resource(&mut self, id: &ResourceId, update: ResourceUpdate) -> Result<()> {
        self.store.update_resource(id, update)?;
        self.recompute()
    }

    /// Remove a resource
    pub fn remove_resource(&mut self, id: &ResourceId) -> Result<Resource> {
        let resource = self.store.remove_resource(id)?;
        self.recompute()?;
        Ok(resource)
    }

    /// Set or clear the project's pinned dates
    pub fn set_project_dates(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<()> {
        self.dates = ProjectDates { start, end };
        debug!(?start, ?end, "project dates changed");
        self.recompute()
    }

    // ========== Baseline ==========

    /// Start the project: freeze the current plan as the baseline.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyStarted` if a baseline already exists.
    pub fn commit_baseline(&mut self) -> Result<()> {
        if self.baseline.is_some() {
            return Err(Error::AlreadyStarted);
        }
        self.baseline = Some(Baseline::capture(&self.store, &self.dates));
        info!(
            milestones = self.store.milestones().len(),
            "committed project baseline"
        );
        Ok(())
    }

    /// Compare the current plan against the baseline.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingBaseline` if the project hasn't been started.
    pub fn change_report(&self, today: NaiveDate, config: &EngineConfig) -> Result<ChangeReport> {
        let baseline = self.baseline.as_ref().ok_or(Error::MissingBaseline)?;
        Ok(diff::diff(
            baseline,
            &self.store,
            &self.dates,
            today,
            &config.plan_message,
        ))
    }

    /// Classify every milestone against the baseline.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingBaseline` if the project hasn't been started.
    pub fn advancement(&self) -> Result<BTreeMap<MilestoneId, Advancement>> {
        let baseline = self.baseline.as_ref().ok_or(Error::MissingBaseline)?;
        Ok(diff::advancement(baseline, &self.store))
    }

    // ========== Costs ==========

    /// Resource totals of milestones starting on or before `date`
    pub fn cost_until(&self, date: Option<NaiveDate>) -> Vec<CostRow> {
        cost::cost_until(&self.store, &self.analysis.schedule, date)
    }

    /// Resource totals of a milestone and all of its predecessors
    pub fn cost_up_to(&self, id: &MilestoneId) -> Result<Vec<CostRow>> {
        cost::cost_up_to(&self.store, id)
    }

    /// Edges between two critical milestones
    pub fn critical_edges(&self) -> Vec<EdgeId> {
        cost::critical_edges(&self.store)
    }
}
