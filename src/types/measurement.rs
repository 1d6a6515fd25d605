//! Measurement and forecast types: CmlMeasurement, ScoredMeasurement, RiskLevel,
//! ForecastResult

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Ingested Measurements
// ============================================================================

/// A single wall-thickness reading for one Condition Monitoring Location.
///
/// Supplied by the ingestion layer after file parsing. The passthrough fields
/// (`commodity`, `feature_type`, `cml_shape`) never enter the forecast math;
/// they only travel along for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmlMeasurement {
    /// Unique CML identifier (e.g. "CML-001")
    pub id_number: String,
    /// Current wall thickness (mm)
    pub thickness_mm: f64,
    /// Average wall loss rate (mm/year)
    pub average_corrosion_rate: f64,
    /// Date of the most recent inspection, if known
    #[serde(default)]
    pub last_inspection_date: Option<NaiveDate>,
    /// Process commodity (e.g. "Crude Oil")
    #[serde(default)]
    pub commodity: Option<String>,
    /// Piping feature type (e.g. "Elbow")
    #[serde(default)]
    pub feature_type: Option<String>,
    /// Monitoring shape (Internal / External / Both)
    #[serde(default)]
    pub cml_shape: Option<String>,
}

impl CmlMeasurement {
    pub fn new(
        id_number: impl Into<String>,
        thickness_mm: f64,
        average_corrosion_rate: f64,
    ) -> Self {
        Self {
            id_number: id_number.into(),
            thickness_mm,
            average_corrosion_rate,
            last_inspection_date: None,
            commodity: None,
            feature_type: None,
            cml_shape: None,
        }
    }

    pub fn with_last_inspection(mut self, date: NaiveDate) -> Self {
        self.last_inspection_date = Some(date);
        self
    }

    pub fn with_commodity(mut self, commodity: impl Into<String>) -> Self {
        self.commodity = Some(commodity.into());
        self
    }

    pub fn with_feature_type(mut self, feature_type: impl Into<String>) -> Self {
        self.feature_type = Some(feature_type.into());
        self
    }
}

/// A measurement paired with the probability produced by the external model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMeasurement {
    #[serde(flatten)]
    pub measurement: CmlMeasurement,
    /// Model probability that this CML can be eliminated
    pub elimination_probability: f64,
}

// ============================================================================
// Forecast Output
// ============================================================================

/// Risk classification derived from remaining life
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remaining-life forecast for one CML.
///
/// Recomputed on every request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub id_number: String,
    /// Conservative remaining life (years), already divided by the safety factor
    pub remaining_life_years: f64,
    /// Date the next inspection falls due
    pub next_inspection_date: NaiveDate,
    /// Re-inspection interval, bounded by policy limits (months)
    pub recommended_inspection_frequency_months: u32,
    pub risk_level: RiskLevel,
    /// Projected wall thickness when the next inspection falls due (mm)
    pub estimated_thickness_at_next_inspection_mm: f64,
    /// Zero corrosion rate; `remaining_life_years` holds the sentinel
    #[serde(default)]
    pub non_corroding: bool,
}
