//! Engine Configuration - forecast, decision, report and storage settings
//!
//! Each struct implements `Default` with the values from `config::defaults`,
//! so a missing file or a partial file both yield a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CML_ALO_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "cml_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the decision engine.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$CML_ALO_CONFIG` env var
/// 2. `./cml_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Remaining-life forecast tuning
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Elimination decision thresholds
    #[serde(default)]
    pub decision: DecisionConfig,

    /// Fleet report shaping
    #[serde(default)]
    pub report: ReportConfig,

    /// Override store backend
    #[serde(default)]
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CML_ALO_CONFIG` environment variable
    /// 2. `./cml_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(
                            path = %p.display(),
                            "Loaded engine config from {}",
                            CONFIG_ENV_VAR
                        );
                        return config;
                    }
                    Err(e) => {
                        warn!(
                            path = %p.display(),
                            error = %e,
                            "Failed to load config from {}, falling back",
                            CONFIG_ENV_VAR
                        );
                    }
                }
            } else {
                warn!(
                    path = %path,
                    "{} points to non-existent file, falling back",
                    CONFIG_ENV_VAR
                );
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings; range errors are fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the effective config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.forecast;
        let d = &self.decision;
        let mut errors: Vec<String> = Vec::new();

        if !f.minimum_thickness_mm.is_finite() || f.minimum_thickness_mm < 0.0 {
            errors.push(format!(
                "forecast.minimum_thickness_mm ({}) must be a non-negative number",
                f.minimum_thickness_mm
            ));
        }
        if !f.safety_factor.is_finite() || f.safety_factor < 1.0 {
            errors.push(format!(
                "forecast.safety_factor ({}) must be >= 1.0",
                f.safety_factor
            ));
        }
        if f.min_inspection_interval_months == 0 {
            errors.push("forecast.min_inspection_interval_months must be > 0".to_string());
        }
        if f.min_inspection_interval_months > f.max_inspection_interval_months {
            errors.push(format!(
                "forecast.min_inspection_interval_months ({}) must be <= \
                 max_inspection_interval_months ({})",
                f.min_inspection_interval_months, f.max_inspection_interval_months
            ));
        }
        let boundaries = [f.critical_life_years, f.high_life_years, f.medium_life_years];
        let increasing = boundaries.windows(2).all(|w| w[0] < w[1]);
        if !boundaries.iter().all(|b| b.is_finite()) || !increasing {
            errors.push(format!(
                "forecast risk boundaries must be finite and increasing: \
                 critical ({}) < high ({}) < medium ({})",
                f.critical_life_years, f.high_life_years, f.medium_life_years
            ));
        }
        if !f.no_corrosion_life_years.is_finite() {
            errors.push(format!(
                "forecast.no_corrosion_life_years ({}) must be a finite number",
                f.no_corrosion_life_years
            ));
        } else if f.no_corrosion_life_years < f.medium_life_years {
            errors.push(format!(
                "forecast.no_corrosion_life_years ({}) must be >= medium_life_years ({})",
                f.no_corrosion_life_years, f.medium_life_years
            ));
        }

        if !(d.decision_threshold > 0.0 && d.decision_threshold < 1.0) {
            errors.push(format!(
                "decision.decision_threshold ({}) must be within (0, 1)",
                d.decision_threshold
            ));
        }
        let confidence_range = 0.5..=1.0;
        if !confidence_range.contains(&d.medium_confidence)
            || !confidence_range.contains(&d.high_confidence)
        {
            errors.push(format!(
                "decision confidence boundaries (medium {}, high {}) must be within [0.5, 1]",
                d.medium_confidence, d.high_confidence
            ));
        }
        if d.medium_confidence > d.high_confidence {
            errors.push(format!(
                "decision.medium_confidence ({}) must be <= high_confidence ({})",
                d.medium_confidence, d.high_confidence
            ));
        }

        if self.report.top_candidates == 0 {
            errors.push("report.top_candidates must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Forecast
// ============================================================================

/// Remaining-life forecaster tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Retirement thickness (mm)
    #[serde(default = "default_minimum_thickness")]
    pub minimum_thickness_mm: f64,

    /// Divisor applied to the raw life extrapolation (>= 1)
    #[serde(default = "default_safety_factor")]
    pub safety_factor: f64,

    #[serde(default = "default_min_interval")]
    pub min_inspection_interval_months: u32,

    #[serde(default = "default_max_interval")]
    pub max_inspection_interval_months: u32,

    /// Sentinel life reported for a zero corrosion rate (years)
    #[serde(default = "default_no_corrosion_life")]
    pub no_corrosion_life_years: f64,

    #[serde(default = "default_critical_life")]
    pub critical_life_years: f64,

    #[serde(default = "default_high_life")]
    pub high_life_years: f64,

    #[serde(default = "default_medium_life")]
    pub medium_life_years: f64,

    /// Forecast summary window for "due soon" inspections (months)
    #[serde(default = "default_due_soon")]
    pub due_soon_months: u32,
}

fn default_minimum_thickness() -> f64 { defaults::MINIMUM_THICKNESS_MM }
fn default_safety_factor() -> f64 { defaults::SAFETY_FACTOR }
fn default_min_interval() -> u32 { defaults::MIN_INSPECTION_INTERVAL_MONTHS }
fn default_max_interval() -> u32 { defaults::MAX_INSPECTION_INTERVAL_MONTHS }
fn default_no_corrosion_life() -> f64 { defaults::NO_CORROSION_LIFE_YEARS }
fn default_critical_life() -> f64 { defaults::CRITICAL_LIFE_YEARS }
fn default_high_life() -> f64 { defaults::HIGH_LIFE_YEARS }
fn default_medium_life() -> f64 { defaults::MEDIUM_LIFE_YEARS }
fn default_due_soon() -> u32 { defaults::DUE_SOON_MONTHS }

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            minimum_thickness_mm: default_minimum_thickness(),
            safety_factor: default_safety_factor(),
            min_inspection_interval_months: default_min_interval(),
            max_inspection_interval_months: default_max_interval(),
            no_corrosion_life_years: default_no_corrosion_life(),
            critical_life_years: default_critical_life(),
            high_life_years: default_high_life(),
            medium_life_years: default_medium_life(),
            due_soon_months: default_due_soon(),
        }
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Elimination decision thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Probability >= threshold means ELIMINATE
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,

    #[serde(default = "default_high_confidence")]
    pub high_confidence: f64,

    #[serde(default = "default_medium_confidence")]
    pub medium_confidence: f64,
}

fn default_decision_threshold() -> f64 { defaults::DECISION_THRESHOLD }
fn default_high_confidence() -> f64 { defaults::HIGH_CONFIDENCE }
fn default_medium_confidence() -> f64 { defaults::MEDIUM_CONFIDENCE }

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            decision_threshold: default_decision_threshold(),
            high_confidence: default_high_confidence(),
            medium_confidence: default_medium_confidence(),
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Length of the top elimination candidate list
    #[serde(default = "default_top_candidates")]
    pub top_candidates: usize,
}

fn default_top_candidates() -> usize { defaults::TOP_CANDIDATES }

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_candidates: default_top_candidates(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Which durable store backs the override collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Non-durable, process lifetime only
    Memory,
    /// Embedded sled database
    #[default]
    Sled,
    /// Single JSON document replaced atomically on every write
    JsonFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database directory (sled) or document path (json_file)
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf { PathBuf::from(defaults::OVERRIDE_DB_PATH) }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}
