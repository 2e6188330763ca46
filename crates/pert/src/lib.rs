//! Pert - a scheduling and constraint engine for milestone dependency planning.
//!
//! The crate owns the dependency graph of a project (milestones, edges and
//! resources) and derives everything the planning UI displays from it:
//!
//! - [`schedule`]: minimum/maximum start and end dates for every milestone
//!   and for the project envelope
//! - [`feasibility`]: per-resource quantity and concurrency findings
//! - [`cost`]: cost aggregation, critical edges and milestone levels
//! - [`diff`]: the requirement-change report against a committed baseline
//!
//! [`project::Project`] is the entry point. Every edit made through it is
//! followed by a full recompute, so the [`project::Analysis`] it exposes is
//! always consistent with the graph.
//!
//! # Example
//!
//! ```
//! use pert::project::Project;
//! use chrono::NaiveDate;
//!
//! # fn main() -> pert::error::Result<()> {
//! let mut project = Project::new();
//! let design = project.add_milestone("Design")?;
//! let build = project.add_milestone("Build")?;
//! project.add_edge(&design, &build)?;
//!
//! project.set_pinned_dates(&design, None, NaiveDate::from_ymd_opt(2024, 3, 1))?;
//!
//! let window = project.analysis().bounds(&build).expect("milestone exists");
//! assert_eq!(window.start.min, NaiveDate::from_ymd_opt(2024, 3, 1));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod cost;
pub mod diff;
pub mod domain;
pub mod error;
pub mod feasibility;
pub mod id_generation;
pub mod logging;
pub mod project;
pub mod schedule;
pub mod snapshot;
pub mod store;
