//! System-wide default constants.
//!
//! Centralises the tunable numbers used by the forecaster, decision engine
//! and report builder. Every one of them can be overridden from
//! `cml_config.toml`.

// ============================================================================
// Remaining-Life Forecast
// ============================================================================

/// Retirement thickness below which a CML is considered spent (mm).
pub const MINIMUM_THICKNESS_MM: f64 = 3.0;

/// Conservatism divisor applied to the raw remaining-life extrapolation.
pub const SAFETY_FACTOR: f64 = 1.5;

/// Shortest re-inspection interval policy allows (months).
pub const MIN_INSPECTION_INTERVAL_MONTHS: u32 = 12;

/// Longest re-inspection interval policy allows (months).
pub const MAX_INSPECTION_INTERVAL_MONTHS: u32 = 60;

/// Remaining life reported when the corrosion rate is exactly zero (years).
pub const NO_CORROSION_LIFE_YEARS: f64 = 999.0;

/// Remaining life below which risk is CRITICAL (years).
pub const CRITICAL_LIFE_YEARS: f64 = 2.0;

/// Remaining life below which risk is HIGH (years).
pub const HIGH_LIFE_YEARS: f64 = 5.0;

/// Remaining life below which risk is MEDIUM (years).
pub const MEDIUM_LIFE_YEARS: f64 = 15.0;

/// Window used by the forecast summary to count CMLs falling due (months).
pub const DUE_SOON_MONTHS: u32 = 12;

// ============================================================================
// Elimination Decision
// ============================================================================

/// Probability at or above which the model recommends ELIMINATE.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Confidence at or above which a decision is HIGH confidence.
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Confidence at or above which a decision is MEDIUM confidence.
pub const MEDIUM_CONFIDENCE: f64 = 0.6;

// ============================================================================
// Reporting
// ============================================================================

/// Number of entries in the top elimination candidate list.
pub const TOP_CANDIDATES: usize = 10;

/// Group label for CMLs with no commodity attribute.
pub const UNKNOWN_COMMODITY: &str = "UNKNOWN";

// ============================================================================
// Measurement Quality
// ============================================================================

/// Upper bound of the plausible corrosion rate range (mm/year).
pub const MAX_PLAUSIBLE_CORROSION_RATE: f64 = 5.0;

/// Upper bound of the plausible wall thickness range (mm).
pub const MAX_PLAUSIBLE_THICKNESS_MM: f64 = 50.0;

// ============================================================================
// Storage
// ============================================================================

/// Default location of the override database.
pub const OVERRIDE_DB_PATH: &str = "./data/sme_overrides.db";

/// Name of the sled tree holding override records.
pub const OVERRIDE_TREE: &str = "sme_overrides";
