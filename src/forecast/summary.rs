//! Fleet-level forecast summary
//!
//! Pure computation over a slice of forecasts. Uses statrs for the central
//! tendency of remaining life. CMLs flagged `non_corroding` carry the
//! sentinel life and are counted separately; a slowly corroding CML keeps
//! its real life in the statistics however long it is.

use chrono::{Months, NaiveDate};
use serde::Serialize;
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeMap;

use crate::config::ForecastConfig;
use crate::types::{ForecastResult, RiskLevel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub total_cmls: usize,
    pub risk_distribution: BTreeMap<RiskLevel, usize>,
    /// Mean remaining life of corroding CMLs (years)
    pub mean_remaining_life_years: Option<f64>,
    /// Median remaining life of corroding CMLs (years)
    pub median_remaining_life_years: Option<f64>,
    /// CMLs with a zero corrosion rate (sentinel life)
    pub non_corroding_cmls: usize,
    /// Next inspection already in the past at the reference date
    pub overdue_inspections: usize,
    /// Next inspection falls within `due_window_months` of the reference date
    pub due_within_window: usize,
    pub due_window_months: u32,
}

/// Summarise forecasts relative to `as_of`.
pub fn summarize_forecasts(
    forecasts: &[ForecastResult],
    config: &ForecastConfig,
    as_of: NaiveDate,
) -> ForecastSummary {
    let mut risk_distribution: BTreeMap<RiskLevel, usize> = BTreeMap::new();
    for f in forecasts {
        *risk_distribution.entry(f.risk_level).or_insert(0) += 1;
    }

    let lives: Vec<f64> = forecasts
        .iter()
        .filter(|f| !f.non_corroding)
        .map(|f| f.remaining_life_years)
        .collect();
    let non_corroding_cmls = forecasts.len() - lives.len();

    let (mean, median) = if lives.is_empty() {
        (None, None)
    } else {
        let mean = lives.iter().mean();
        let median = Data::new(lives).median();
        (Some(mean), Some(median))
    };

    let window_end = as_of
        .checked_add_months(Months::new(config.due_soon_months))
        .unwrap_or(NaiveDate::MAX);
    let overdue_inspections = forecasts
        .iter()
        .filter(|f| f.next_inspection_date < as_of)
        .count();
    let due_within_window = forecasts
        .iter()
        .filter(|f| f.next_inspection_date >= as_of && f.next_inspection_date <= window_end)
        .count();

    ForecastSummary {
        total_cmls: forecasts.len(),
        risk_distribution,
        mean_remaining_life_years: mean,
        median_remaining_life_years: median,
        non_corroding_cmls,
        overdue_inspections,
        due_within_window,
        due_window_months: config.due_soon_months,
    }
}
