//! Measurement quality assessment
//!
//! Non-fatal plausibility checks over an ingested batch: duplicate ids and
//! readings outside the ranges seen on real piping. Hard validation still
//! happens in the forecaster; these are warnings for the operator.

use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashSet};

use crate::config::defaults::{
    MAX_PLAUSIBLE_CORROSION_RATE, MAX_PLAUSIBLE_THICKNESS_MM, UNKNOWN_COMMODITY,
};
use crate::types::CmlMeasurement;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityWarning {
    pub id_number: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementQuality {
    pub total_records: usize,
    pub unique_cmls: usize,
    pub mean_corrosion_rate: Option<f64>,
    pub mean_thickness_mm: Option<f64>,
    pub commodity_distribution: BTreeMap<String, usize>,
    pub warnings: Vec<QualityWarning>,
}

impl MeasurementQuality {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub fn assess_measurements(measurements: &[CmlMeasurement]) -> MeasurementQuality {
    let mut warnings = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut commodity_distribution: BTreeMap<String, usize> = BTreeMap::new();

    for m in measurements {
        if !seen.insert(m.id_number.as_str()) {
            warnings.push(QualityWarning {
                id_number: m.id_number.clone(),
                message: "duplicate CML id".to_string(),
            });
        }

        let rate = m.average_corrosion_rate;
        if !(0.0..=MAX_PLAUSIBLE_CORROSION_RATE).contains(&rate) {
            warnings.push(QualityWarning {
                id_number: m.id_number.clone(),
                message: format!(
                    "unusual corrosion rate {rate} \
                     (expected 0-{MAX_PLAUSIBLE_CORROSION_RATE} mm/year)"
                ),
            });
        }

        let thickness = m.thickness_mm;
        if !(thickness > 0.0 && thickness <= MAX_PLAUSIBLE_THICKNESS_MM) {
            warnings.push(QualityWarning {
                id_number: m.id_number.clone(),
                message: format!(
                    "unusual thickness {thickness} (expected 0-{MAX_PLAUSIBLE_THICKNESS_MM} mm)"
                ),
            });
        }

        let commodity = m.commodity.as_deref().unwrap_or(UNKNOWN_COMMODITY);
        *commodity_distribution.entry(commodity.to_string()).or_insert(0) += 1;
    }

    let (mean_corrosion_rate, mean_thickness_mm) = if measurements.is_empty() {
        (None, None)
    } else {
        (
            Some(measurements.iter().map(|m| m.average_corrosion_rate).mean()),
            Some(measurements.iter().map(|m| m.thickness_mm).mean()),
        )
    };

    MeasurementQuality {
        total_records: measurements.len(),
        unique_cmls: seen.len(),
        mean_corrosion_rate,
        mean_thickness_mm,
        commodity_distribution,
        warnings,
    }
}
