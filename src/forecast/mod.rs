//! Remaining-Life Forecaster
//!
//! Extrapolates current wall thickness and corrosion rate to the retirement
//! thickness, discounts the result by a safety factor and schedules the next
//! inspection at roughly half the remaining life, bounded by policy limits.
//!
//! Every function here is pure and deterministic given its inputs, the
//! configuration and the reference date, so forecasts for different CMLs can
//! be computed in parallel.

pub mod quality;
pub mod summary;

pub use quality::{assess_measurements, MeasurementQuality, QualityWarning};
pub use summary::{summarize_forecasts, ForecastSummary};

use chrono::{Months, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ForecastConfig;
use crate::error::EngineError;
use crate::types::{CmlMeasurement, ForecastResult, RiskLevel};

/// How `forecast_batch` treats rows that fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Return the first invalid row's error and no forecasts
    #[default]
    FailFast,
    /// Forecast the valid rows and report the rejected ones
    SkipInvalid,
}

/// A row excluded from a `SkipInvalid` batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedMeasurement {
    pub id_number: String,
    pub reason: String,
}

/// Output of a batch forecast, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchForecast {
    pub forecasts: Vec<ForecastResult>,
    pub rejected: Vec<RejectedMeasurement>,
}

/// Stateless remaining-life calculator
#[derive(Debug, Clone, Default)]
pub struct RemainingLifeForecaster {
    config: ForecastConfig,
}

impl RemainingLifeForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast one CML, scheduling from today when no inspection date is known.
    pub fn forecast_single_cml(
        &self,
        id_number: &str,
        current_thickness: f64,
        corrosion_rate: f64,
        last_inspection_date: Option<NaiveDate>,
    ) -> Result<ForecastResult, EngineError> {
        self.forecast_as_of(
            id_number,
            current_thickness,
            corrosion_rate,
            last_inspection_date,
            Utc::now().date_naive(),
        )
    }

    /// Forecast one CML against an explicit reference date.
    ///
    /// `today` is only used when `last_inspection_date` is absent.
    pub fn forecast_as_of(
        &self,
        id_number: &str,
        current_thickness: f64,
        corrosion_rate: f64,
        last_inspection_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<ForecastResult, EngineError> {
        if !current_thickness.is_finite() || current_thickness <= 0.0 {
            return Err(EngineError::invalid_measurement(
                id_number,
                format!("thickness_mm must be > 0, got {current_thickness}"),
            ));
        }
        if !corrosion_rate.is_finite() || corrosion_rate < 0.0 {
            return Err(EngineError::invalid_measurement(
                id_number,
                format!("average_corrosion_rate must be >= 0, got {corrosion_rate}"),
            ));
        }

        let remaining_life_years = self.remaining_life_years(current_thickness, corrosion_rate);
        let non_corroding =
            corrosion_rate == 0.0 && current_thickness > self.config.minimum_thickness_mm;
        let risk_level = if current_thickness <= self.config.minimum_thickness_mm {
            RiskLevel::Critical
        } else {
            self.risk_level(remaining_life_years)
        };
        let frequency = self.inspection_frequency_months(remaining_life_years);

        let base_date = last_inspection_date.unwrap_or(today);
        let next_inspection_date = base_date
            .checked_add_months(Months::new(frequency))
            .ok_or_else(|| {
                EngineError::invalid_measurement(
                    id_number,
                    format!("next inspection date overflows calendar from {base_date}"),
                )
            })?;

        let projected_loss = corrosion_rate * f64::from(frequency) / 12.0;
        let estimated_thickness = round2((current_thickness - projected_loss).max(0.0));

        debug!(
            id_number,
            remaining_life_years,
            risk = %risk_level,
            frequency_months = frequency,
            "Forecast computed"
        );

        Ok(ForecastResult {
            id_number: id_number.to_string(),
            remaining_life_years,
            next_inspection_date,
            recommended_inspection_frequency_months: frequency,
            risk_level,
            estimated_thickness_at_next_inspection_mm: estimated_thickness,
            non_corroding,
        })
    }

    /// Forecast from an ingested measurement row.
    pub fn forecast_measurement(
        &self,
        measurement: &CmlMeasurement,
        today: NaiveDate,
    ) -> Result<ForecastResult, EngineError> {
        self.forecast_as_of(
            &measurement.id_number,
            measurement.thickness_mm,
            measurement.average_corrosion_rate,
            measurement.last_inspection_date,
            today,
        )
    }

    /// Conservative remaining life in years. Inputs must already be validated.
    ///
    /// Material at or below the retirement thickness has zero life; a zero
    /// corrosion rate yields the configured sentinel.
    pub fn remaining_life_years(&self, current_thickness: f64, corrosion_rate: f64) -> f64 {
        let available = current_thickness - self.config.minimum_thickness_mm;
        if available <= 0.0 {
            return 0.0;
        }
        if corrosion_rate == 0.0 {
            return self.config.no_corrosion_life_years;
        }
        let raw_life = available / corrosion_rate;
        raw_life / self.config.safety_factor
    }

    /// Classify remaining life; each boundary is exclusive (`life < boundary`).
    pub fn risk_level(&self, remaining_life_years: f64) -> RiskLevel {
        let c = &self.config;
        if remaining_life_years < c.critical_life_years {
            RiskLevel::Critical
        } else if remaining_life_years < c.high_life_years {
            RiskLevel::High
        } else if remaining_life_years < c.medium_life_years {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Re-inspect at half the remaining life, rounded to whole months and
    /// clamped to the policy interval bounds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn inspection_frequency_months(&self, remaining_life_years: f64) -> u32 {
        let min = f64::from(self.config.min_inspection_interval_months);
        let max = f64::from(self.config.max_inspection_interval_months);
        let half_life_months = (remaining_life_years * 12.0 / 2.0).round();
        // Bounds are whole months, so the clamped value converts exactly
        half_life_months.max(min).min(max) as u32
    }

    /// Forecast a batch of measurements, scheduling from today where needed.
    pub fn forecast_batch(
        &self,
        measurements: &[CmlMeasurement],
        policy: BatchPolicy,
    ) -> Result<BatchForecast, EngineError> {
        self.forecast_batch_as_of(measurements, policy, Utc::now().date_naive())
    }

    /// Forecast a batch against an explicit reference date.
    ///
    /// Rows are computed in parallel; results keep input order. Under
    /// `FailFast` the error returned is the first invalid row in input order.
    pub fn forecast_batch_as_of(
        &self,
        measurements: &[CmlMeasurement],
        policy: BatchPolicy,
        today: NaiveDate,
    ) -> Result<BatchForecast, EngineError> {
        let outcomes: Vec<Result<ForecastResult, EngineError>> = measurements
            .par_iter()
            .map(|m| self.forecast_measurement(m, today))
            .collect();

        let mut batch = BatchForecast {
            forecasts: Vec::with_capacity(outcomes.len()),
            rejected: Vec::new(),
        };

        for (outcome, measurement) in outcomes.into_iter().zip(measurements) {
            match outcome {
                Ok(forecast) => batch.forecasts.push(forecast),
                Err(e) => match policy {
                    BatchPolicy::FailFast => {
                        warn!(
                            id_number = %measurement.id_number,
                            error = %e,
                            "Batch forecast aborted"
                        );
                        return Err(e);
                    }
                    BatchPolicy::SkipInvalid => {
                        warn!(
                            id_number = %measurement.id_number,
                            error = %e,
                            "Skipping invalid measurement"
                        );
                        batch.rejected.push(RejectedMeasurement {
                            id_number: measurement.id_number.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        info!(
            forecasts = batch.forecasts.len(),
            rejected = batch.rejected.len(),
            "Batch forecast complete"
        );

        Ok(batch)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
