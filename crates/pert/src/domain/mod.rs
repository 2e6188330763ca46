//! Domain types for milestone planning.
//!
//! This module contains the records owned by the graph store: milestones,
//! dependency edges, resources and the project's own pinned dates. The
//! records serialize directly into the project snapshot shape, so field
//! names and date encodings here are part of the persisted format.

pub mod dates;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new ID
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the ID as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a milestone (e.g. `n3`)
    MilestoneId
);

entity_id!(
    /// Unique identifier for a dependency edge (e.g. `e7`)
    EdgeId
);

entity_id!(
    /// Unique identifier for a resource (e.g. `r1`)
    ResourceId
);

/// A named project checkpoint with optional pinned dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Display name, never empty
    pub name: String,

    /// Pinned start date
    #[serde(default, with = "dates::optional")]
    pub start: Option<NaiveDate>,

    /// Pinned end date
    #[serde(default, with = "dates::optional")]
    pub end: Option<NaiveDate>,

    /// User-set highlight marker
    #[serde(default)]
    pub critical: bool,

    /// Allocation per resource.
    ///
    /// May contain entries for resources that no longer exist; readers go
    /// through [`crate::store::GraphStore::allocation`], which skips them.
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, f64>,

    /// Canvas position, carried through import/export untouched
    #[serde(flatten)]
    pub layout: Layout,
}

impl Milestone {
    /// Create a milestone with no dates, allocations or layout.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            end: None,
            critical: false,
            resources: BTreeMap::new(),
            layout: Layout::default(),
        }
    }

    /// Pinned start, falling back to the pinned end.
    ///
    /// This is the key milestones are ordered by when consuming resource
    /// amounts. `None` sorts before every date.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.start.or(self.end)
    }
}

/// Canvas coordinates of a milestone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Distance from the top of the canvas
    #[serde(default)]
    pub top: f64,

    /// Distance from the left of the canvas
    #[serde(default)]
    pub left: f64,
}

/// Directed dependency: `to` must not start before `from` ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Predecessor milestone
    pub from: MilestoneId,

    /// Successor milestone
    pub to: MilestoneId,
}

/// A consumable resource shared by milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Display name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Total capacity; `None` is unlimited
    #[serde(default)]
    pub amount: Option<f64>,

    /// Maximum number of milestones using the resource at the same time.
    ///
    /// `None` and `Some(0)` are both uncapped.
    #[serde(default, deserialize_with = "dates::optional_count")]
    pub concurrency: Option<u32>,
}

impl Resource {
    /// Create an unlimited, uncapped resource.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: None,
            concurrency: None,
        }
    }

    /// The concurrency cap, if the resource has a usable one.
    pub fn concurrency_cap(&self) -> Option<u32> {
        self.concurrency.filter(|&cap| cap > 0)
    }
}

/// Typed edit of a single resource field.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceUpdate {
    /// Rename; the new name must not be empty
    Name(String),
    /// New capacity; `None` makes it unlimited
    Amount(Option<f64>),
    /// New concurrency cap; `None` removes it
    Concurrency(Option<u32>),
}

/// The project's own pinned dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDates {
    /// Pinned project start
    #[serde(default, with = "dates::optional")]
    pub start: Option<NaiveDate>,

    /// Pinned project end
    #[serde(default, with = "dates::optional")]
    pub end: Option<NaiveDate>,
}

/// Allowed range for a single date.
///
/// `None` on either side means unbounded in that direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    /// Earliest allowed date
    pub min: Option<NaiveDate>,

    /// Latest allowed date
    pub max: Option<NaiveDate>,
}

impl DateWindow {
    /// Whether `date` lies inside the window (bounds inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min.is_none_or(|min| date >= min) && self.max.is_none_or(|max| date <= max)
    }
}

/// Computed start and end windows of a milestone or the project envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bounds {
    /// Window for the start date
    pub start: DateWindow,

    /// Window for the end date
    pub end: DateWindow,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
