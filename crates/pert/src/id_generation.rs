//! Sequential ID generation for graph entities.
//!
//! IDs have the form `{prefix}{n}` with `n` counting up from 1, e.g. `n1`,
//! `n2` for milestones, `e1` for edges and `r1` for resources. This matches
//! the keys already present in persisted project snapshots, so imported IDs
//! are registered with the generator and new IDs never collide with them.
//!
//! A generator never hands out the same ID twice, even after the entity it
//! named has been deleted. Stale references to a deleted resource (for
//! example a milestone allocation) therefore cannot silently attach to a
//! newly created resource.
//!
//! # Example
//!
//! ```
//! use pert::id_generation::IdGenerator;
//!
//! let mut generator = IdGenerator::new("n");
//! generator.register_id("n1");
//!
//! assert_eq!(generator.generate(), "n2");
//! assert_eq!(generator.generate(), "n3");
//! ```

use std::collections::HashSet;
use tracing::debug;

/// Prefix for milestone IDs
pub const MILESTONE_PREFIX: &str = "n";

/// Prefix for edge IDs
pub const EDGE_PREFIX: &str = "e";

/// Prefix for resource IDs
pub const RESOURCE_PREFIX: &str = "r";

/// First-free-key ID generator.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    issued: HashSet<String>,
    next: u64,
}

impl IdGenerator {
    /// Create a generator for the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            issued: HashSet::new(),
            next: 1,
        }
    }

    /// The prefix of generated IDs
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register an existing ID to prevent collisions
    pub fn register_id(&mut self, id: impl Into<String>) {
        self.issued.insert(id.into());
    }

    /// Generate the next unused ID
    pub fn generate(&mut self) -> String {
        loop {
            let candidate = format!("{}{}", self.prefix, self.next);
            self.next += 1;
            if self.issued.insert(candidate.clone()) {
                debug!(id = %candidate, "generated id");
                return candidate;
            }
        }
    }
}
