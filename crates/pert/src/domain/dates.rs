//! Calendar date helpers.
//!
//! Persisted snapshots store dates as `"YYYY-MM-DD"` strings and use the
//! empty string for "not set". Bound arithmetic treats a missing lower bound
//! as minus infinity and a missing upper bound as plus infinity.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serializer};

/// Persisted date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The more restrictive of two lower bounds (the later date).
pub fn later(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// The more restrictive of two upper bounds (the earlier date).
pub fn earlier(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Serde adapter for `Option<NaiveDate>` encoded as `""` / `"YYYY-MM-DD"`.
pub mod optional {
    use super::{DATE_FORMAT, Deserialize, Deserializer, NaiveDate, Serializer};

    /// Serialize `None` as `""`.
    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.collect_str(&date.format(DATE_FORMAT)),
            None => serializer.serialize_str(""),
        }
    }

    /// Accept `null`, `""` or an ISO calendar date.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Deserialize an optional non-negative count that may arrive as a float.
///
/// Numeric form inputs are persisted as JSON numbers such as `2` or `2.0`;
/// fractional parts are truncated and negative values clamp to zero.
pub fn optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.filter(|value| value.is_finite()).map(|value| {
        // Saturating float-to-int cast: clamps below at 0 and above at u32::MAX.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = value.max(0.0) as u32;
        count
    }))
}
