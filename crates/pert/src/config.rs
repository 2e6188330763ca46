//! Engine configuration.
//!
//! Stored as YAML with kebab-case keys:
//!
//! ```yaml
//! timezone-offset: 60
//! log-filter: pert=debug
//! plan-message: Everything according to plan.
//! ```

use crate::error::{Error, Result};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Default tracing directive
pub const DEFAULT_LOG_FILTER: &str = "pert=info";

/// Default text for an empty change report bucket
pub const DEFAULT_PLAN_MESSAGE: &str = "Everything according to plan.";

/// Settings for embedding hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Minutes east of UTC used to decide what "today" is
    pub timezone_offset: i32,

    /// Default `tracing` filter when `RUST_LOG` is not set
    pub log_filter: String,

    /// Text substituted for empty change report buckets
    pub plan_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone_offset: 0,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            plan_message: DEFAULT_PLAN_MESSAGE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Today's date at the configured offset
    pub fn today(&self) -> Result<NaiveDate> {
        today_at(self.timezone_offset)
    }
}

/// Today's date at `offset_minutes` east of UTC.
///
/// # Errors
///
/// Returns `Error::Config` for offsets of a day or more.
pub fn today_at(offset_minutes: i32) -> Result<NaiveDate> {
    let offset = offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| Error::Config(format!("Invalid timezone offset: {offset_minutes}")))?;
    Ok(Utc::now().with_timezone(&offset).date_naive())
}
