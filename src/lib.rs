//! CML-ALO: Condition Monitoring Location Asset Life Optimisation
//!
//! Forecasts the remaining life of piping CMLs from wall-thickness and
//! corrosion-rate data, turns model probabilities into keep/eliminate
//! recommendations, and reconciles them with subject-matter-expert overrides.
//!
//! ## Architecture
//!
//! - **Forecast**: remaining life, risk level and next inspection date per CML
//! - **Decision**: probability → recommendation + confidence bucket
//! - **Storage**: durable SME override store (in-memory, sled, JSON document)
//! - **Reconciler**: override always wins over the model
//! - **Report**: fleet-level elimination summary

pub mod config;
pub mod decision;
pub mod error;
pub mod forecast;
pub mod report;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::EngineConfig;

// Re-export commonly used types
pub use types::{
    CmlMeasurement, ConfidenceLevel, EliminationResult, ForecastResult, OverrideStatistics,
    Recommendation, ReconciledDecision, RiskLevel, ScoredMeasurement, SmeOverride,
};

pub use error::EngineError;

// Re-export engines
pub use decision::{DecisionReconciler, EliminationDecisionEngine, ProbabilityModel};
pub use forecast::{BatchPolicy, RemainingLifeForecaster};
pub use report::{EliminationReport, ReportAggregator, ReportRow};

// Re-export storage
pub use storage::{open_store, OverrideStore, StorageError};
