//! SME override records and agreement statistics

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::Recommendation;

/// A subject-matter expert's decision that supersedes the model for one CML.
///
/// Records are replaced wholesale on every write; fields are never patched
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmeOverride {
    /// CML identifier (also the storage key)
    pub id_number: String,
    pub sme_decision: Recommendation,
    /// Rationale for departing from (or confirming) the model
    pub reason: String,
    pub sme_name: String,
    /// Snapshot of the model recommendation when the override was made
    #[serde(default)]
    pub original_prediction: Option<Recommendation>,
    /// Snapshot of the model probability when the override was made
    #[serde(default)]
    pub original_probability: Option<f64>,
    /// Time of the most recent write, stamped by the store
    #[serde(default = "Utc::now", deserialize_with = "deserialize_override_date")]
    pub override_date: DateTime<Utc>,
}

/// Parse an override timestamp.
///
/// Accepts RFC 3339 as well as the zone-less ISO 8601 form found in older
/// `sme_overrides.json` documents, which is read as UTC.
pub fn parse_override_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid override_date '{raw}'"))
}

// A null date (legacy records never stamped) falls back to the load time.
fn deserialize_override_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_override_date(&raw).map_err(serde::de::Error::custom),
        None => Ok(Utc::now()),
    }
}

impl SmeOverride {
    pub fn new(
        id_number: impl Into<String>,
        sme_decision: Recommendation,
        reason: impl Into<String>,
        sme_name: impl Into<String>,
    ) -> Self {
        Self {
            id_number: id_number.into(),
            sme_decision,
            reason: reason.into(),
            sme_name: sme_name.into(),
            original_prediction: None,
            original_probability: None,
            override_date: Utc::now(),
        }
    }

    /// Record the model output this override responds to.
    pub fn with_original(mut self, prediction: Recommendation, probability: Option<f64>) -> Self {
        self.original_prediction = Some(prediction);
        self.original_probability = probability;
        self
    }

    /// Whether the SME disagreed with the recorded model prediction.
    ///
    /// `None` when no prediction was recorded.
    pub fn disagrees_with_ml(&self) -> Option<bool> {
        self.original_prediction.map(|p| p != self.sme_decision)
    }
}

/// Aggregate statistics over all stored overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideStatistics {
    pub total_overrides: usize,
    pub keep_overrides: usize,
    pub eliminate_overrides: usize,
    /// Overrides whose decision differs from the recorded model prediction
    pub disagreements_with_ml: usize,
    /// Percentage (0-100); 100.0 when there are no overrides
    pub agreement_rate: f64,
}

impl OverrideStatistics {
    pub fn from_overrides(overrides: &[SmeOverride]) -> Self {
        let total_overrides = overrides.len();
        let keep_overrides = overrides
            .iter()
            .filter(|o| o.sme_decision == Recommendation::Keep)
            .count();
        let disagreements_with_ml = overrides
            .iter()
            .filter(|o| o.disagrees_with_ml() == Some(true))
            .count();

        let agreement_rate = if total_overrides == 0 {
            100.0
        } else {
            (total_overrides - disagreements_with_ml) as f64 / total_overrides as f64 * 100.0
        };

        Self {
            total_overrides,
            keep_overrides,
            eliminate_overrides: total_overrides - keep_overrides,
            disagreements_with_ml,
            agreement_rate,
        }
    }
}
