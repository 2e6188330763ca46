//! Error types for pert operations.
//!
//! Errors are split into two groups:
//!
//! - **`Error`**: an operation was refused or could not complete. The graph is
//!   left exactly as it was before the call.
//! - **Findings**: constraint violations and resource infeasibilities are not
//!   errors. They are collected into the analysis (see
//!   [`crate::schedule::ConstraintViolation`] and
//!   [`crate::feasibility::Infeasibility`]) and never stop a recompute.
//!
//! [`Error::CorruptGraph`] is the one exception to "refused, nothing changed":
//! it means the store's acyclicity invariant was broken, which is a bug in
//! this crate rather than a user-facing condition.

use crate::domain::{EdgeId, MilestoneId, ResourceId};
use std::io;
use thiserror::Error;

/// The error type for pert operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Milestone not found.
    #[error("Milestone not found: {0}")]
    MilestoneNotFound(MilestoneId),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// Dependency edge not found.
    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// Edge insertion rejected.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// A milestone or resource name was empty.
    #[error("{0} name cannot be empty")]
    EmptyName(&'static str),

    /// A resource amount or allocation was negative or not a finite number.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(f64),

    /// Operation needs a committed baseline.
    #[error("The project has not been started: no baseline committed")]
    MissingBaseline,

    /// The baseline can only be committed once.
    #[error("The project has already been started")]
    AlreadyStarted,

    /// The dependency graph contains a cycle despite the store invariant.
    #[error("Dependency graph is corrupt: cycle through milestone {0}")]
    CorruptGraph(MilestoneId),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons an edge `from -> to` cannot be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// `from` and `to` are the same milestone.
    #[error("Milestone {0} cannot depend on itself")]
    SelfLoop(MilestoneId),

    /// The ordered pair is already connected.
    #[error("Edge {from} -> {to} already exists")]
    Duplicate {
        /// Predecessor milestone
        from: MilestoneId,
        /// Successor milestone
        to: MilestoneId,
    },

    /// `to` already reaches `from`, so the edge would close a cycle.
    #[error("Edge {from} -> {to} would create a cycle")]
    WouldCycle {
        /// Predecessor milestone
        from: MilestoneId,
        /// Successor milestone
        to: MilestoneId,
    },
}

/// A specialized Result type for pert operations.
pub type Result<T> = std::result::Result<T, Error>;
