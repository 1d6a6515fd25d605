//! Elimination Report Aggregator
//!
//! Rolls reconciled decisions (plus their forecasts and passthrough
//! attributes) into the fleet-level summary handed to presentation.
//!
//! Rates are computed over *final* decisions. The confidence histogram and
//! marginal cases describe the model, so they use the pre-override result.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::config::defaults::UNKNOWN_COMMODITY;
use crate::config::ReportConfig;
use crate::types::{
    CmlMeasurement, ConfidenceLevel, ForecastResult, Recommendation, ReconciledDecision,
    RiskLevel,
};

/// One CML as seen by the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub decision: ReconciledDecision,
    pub forecast: Option<ForecastResult>,
    pub commodity: Option<String>,
    pub feature_type: Option<String>,
}

impl ReportRow {
    pub fn new(decision: ReconciledDecision) -> Self {
        Self {
            decision,
            forecast: None,
            commodity: None,
            feature_type: None,
        }
    }

    pub fn with_forecast(mut self, forecast: ForecastResult) -> Self {
        self.forecast = Some(forecast);
        self
    }

    pub fn with_attributes(mut self, measurement: &CmlMeasurement) -> Self {
        self.commodity = measurement.commodity.clone();
        self.feature_type = measurement.feature_type.clone();
        self
    }

    fn commodity_key(&self) -> &str {
        self.commodity
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNKNOWN_COMMODITY)
    }

    fn feature_key(&self) -> &str {
        self.feature_type
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(UNKNOWN_COMMODITY)
    }
}

/// Join decisions with forecasts and measurement attributes by `id_number`.
///
/// Output follows the order of `decisions`. Missing forecasts or measurements
/// leave the corresponding fields empty.
pub fn join_rows(
    decisions: Vec<ReconciledDecision>,
    forecasts: &[ForecastResult],
    measurements: &[CmlMeasurement],
) -> Vec<ReportRow> {
    let forecast_by_id: HashMap<&str, &ForecastResult> = forecasts
        .iter()
        .map(|f| (f.id_number.as_str(), f))
        .collect();
    let measurement_by_id: HashMap<&str, &CmlMeasurement> = measurements
        .iter()
        .map(|m| (m.id_number.as_str(), m))
        .collect();

    decisions
        .into_iter()
        .map(|decision| {
            let forecast = forecast_by_id.get(decision.id_number.as_str()).map(|f| (*f).clone());
            let measurement = measurement_by_id.get(decision.id_number.as_str()).copied();

            let mut row = ReportRow::new(decision);
            row.forecast = forecast;
            if let Some(m) = measurement {
                row = row.with_attributes(m);
            }
            row
        })
        .collect()
}

// ============================================================================
// Report Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_cmls: usize,
    pub final_eliminations: usize,
    pub final_keeps: usize,
    /// Final eliminations as a percentage of all CMLs
    pub elimination_rate_pct: f64,
    pub ml_eliminations: usize,
    /// Model-only eliminations as a percentage of all CMLs
    pub ml_elimination_rate_pct: f64,
    pub overrides_applied: usize,
    /// Overrides whose decision differs from the model recommendation
    pub overrides_changed_decision: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityBreakdown {
    pub commodity: String,
    pub total_cmls: usize,
    pub eliminations: usize,
    pub elimination_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRow {
    pub id_number: String,
    pub elimination_probability: f64,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub final_decision: Recommendation,
    pub overridden: bool,
    pub commodity: String,
    pub risk_level: Option<RiskLevel>,
    pub remaining_life_years: Option<f64>,
}

impl CandidateRow {
    fn from_row(row: &ReportRow) -> Self {
        let ml = &row.decision.elimination;
        Self {
            id_number: row.decision.id_number.clone(),
            elimination_probability: ml.elimination_probability,
            confidence: ml.confidence,
            confidence_level: ml.confidence_level,
            final_decision: row.decision.final_decision,
            overridden: row.decision.is_overridden(),
            commodity: row.commodity_key().to_string(),
            risk_level: row.forecast.as_ref().map(|f| f.risk_level),
            remaining_life_years: row.forecast.as_ref().map(|f| f.remaining_life_years),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EliminationReport {
    pub summary: ReportSummary,
    /// Model confidence buckets, before overrides
    pub confidence_distribution: BTreeMap<ConfidenceLevel, usize>,
    /// Sorted by commodity name
    pub by_commodity: Vec<CommodityBreakdown>,
    /// Final eliminations per feature type
    pub eliminations_by_feature: BTreeMap<String, usize>,
    /// Risk levels of rows that carry a forecast
    pub risk_distribution: BTreeMap<RiskLevel, usize>,
    pub top_elimination_candidates: Vec<CandidateRow>,
    pub marginal_cases: Vec<CandidateRow>,
}

// ============================================================================
// Aggregator
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    config: ReportConfig,
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl ReportAggregator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, rows: &[ReportRow]) -> EliminationReport {
        let total = rows.len();
        let final_eliminations = rows
            .iter()
            .filter(|r| r.decision.final_decision.is_eliminate())
            .count();
        let ml_eliminations = rows
            .iter()
            .filter(|r| r.decision.elimination.recommendation.is_eliminate())
            .count();
        let overrides_applied = rows.iter().filter(|r| r.decision.is_overridden()).count();
        let overrides_changed_decision = rows
            .iter()
            .filter(|r| r.decision.override_changed_decision())
            .count();

        let summary = ReportSummary {
            total_cmls: total,
            final_eliminations,
            final_keeps: total - final_eliminations,
            elimination_rate_pct: pct(final_eliminations, total),
            ml_eliminations,
            ml_elimination_rate_pct: pct(ml_eliminations, total),
            overrides_applied,
            overrides_changed_decision,
        };

        let mut confidence_distribution: BTreeMap<ConfidenceLevel, usize> = [
            ConfidenceLevel::Low,
            ConfidenceLevel::Medium,
            ConfidenceLevel::High,
        ]
        .into_iter()
        .map(|level| (level, 0))
        .collect();
        let mut commodity_counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        let mut eliminations_by_feature: BTreeMap<String, usize> = BTreeMap::new();
        let mut risk_distribution: BTreeMap<RiskLevel, usize> = BTreeMap::new();

        for row in rows {
            let eliminated = row.decision.final_decision.is_eliminate();

            *confidence_distribution
                .entry(row.decision.elimination.confidence_level)
                .or_insert(0) += 1;

            let entry = commodity_counts.entry(row.commodity_key()).or_insert((0, 0));
            entry.0 += 1;
            if eliminated {
                entry.1 += 1;
                *eliminations_by_feature
                    .entry(row.feature_key().to_string())
                    .or_insert(0) += 1;
            }

            if let Some(f) = &row.forecast {
                *risk_distribution.entry(f.risk_level).or_insert(0) += 1;
            }
        }

        let by_commodity = commodity_counts
            .into_iter()
            .map(|(commodity, (count, elim))| CommodityBreakdown {
                commodity: commodity.to_string(),
                total_cmls: count,
                eliminations: elim,
                elimination_rate_pct: pct(elim, count),
            })
            .collect();

        let report = EliminationReport {
            summary,
            confidence_distribution,
            by_commodity,
            eliminations_by_feature,
            risk_distribution,
            top_elimination_candidates: self.top_candidates(rows),
            marginal_cases: marginal_cases(rows),
        };

        info!(
            total_cmls = report.summary.total_cmls,
            elimination_rate_pct = report.summary.elimination_rate_pct,
            overrides_applied = report.summary.overrides_applied,
            marginal = report.marginal_cases.len(),
            "Elimination report built"
        );

        report
    }

    /// Highest-probability rows whose final decision is ELIMINATE.
    fn top_candidates(&self, rows: &[ReportRow]) -> Vec<CandidateRow> {
        let mut candidates: Vec<&ReportRow> = rows
            .iter()
            .filter(|r| r.decision.final_decision.is_eliminate())
            .collect();
        candidates.sort_by(|a, b| {
            let pa = a.decision.elimination.elimination_probability;
            let pb = b.decision.elimination.elimination_probability;
            pb.total_cmp(&pa)
                .then_with(|| a.decision.id_number.cmp(&b.decision.id_number))
        });
        candidates
            .into_iter()
            .take(self.config.top_candidates)
            .map(CandidateRow::from_row)
            .collect()
    }
}

/// LOW-confidence rows, closest to 0.5 first.
fn marginal_cases(rows: &[ReportRow]) -> Vec<CandidateRow> {
    let mut marginal: Vec<&ReportRow> = rows
        .iter()
        .filter(|r| r.decision.elimination.confidence_level == ConfidenceLevel::Low)
        .collect();
    marginal.sort_by(|a, b| {
        let da = (a.decision.elimination.elimination_probability - 0.5).abs();
        let db = (b.decision.elimination.elimination_probability - 0.5).abs();
        da.total_cmp(&db)
            .then_with(|| a.decision.id_number.cmp(&b.decision.id_number))
    });
    marginal.into_iter().map(CandidateRow::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::EliminationDecisionEngine;
    use crate::types::SmeOverride;

    fn row(id: &str, p: f64, commodity: Option<&str>) -> ReportRow {
        let engine = EliminationDecisionEngine::default();
        let decision = ReconciledDecision::from_parts(engine.decide(id, p).unwrap(), None);
        let mut row = ReportRow::new(decision);
        row.commodity = commodity.map(str::to_string);
        row
    }

    fn overridden(id: &str, p: f64, sme: Recommendation) -> ReportRow {
        let engine = EliminationDecisionEngine::default();
        let o = SmeOverride::new(id, sme, "field review", "A. Ortiz");
        ReportRow::new(ReconciledDecision::from_parts(engine.decide(id, p).unwrap(), Some(o)))
    }

    #[test]
    fn test_empty_report() {
        let report = ReportAggregator::default().build(&[]);
        assert_eq!(report.summary.total_cmls, 0);
        assert_eq!(report.summary.elimination_rate_pct, 0.0);
        assert!(report.top_elimination_candidates.is_empty());
        assert_eq!(report.confidence_distribution.values().sum::<usize>(), 0);
        assert_eq!(report.confidence_distribution.len(), 3);
    }

    #[test]
    fn test_rates_use_final_decisions() {
        let rows = vec![
            row("CML-1", 0.9, Some("GAS")),
            overridden("CML-2", 0.85, Recommendation::Keep),
            row("CML-3", 0.15, Some("GAS")),
            row("CML-4", 0.1, Some("OIL")),
        ];
        let report = ReportAggregator::default().build(&rows);

        assert_eq!(report.summary.final_eliminations, 1);
        assert_eq!(report.summary.ml_eliminations, 2);
        assert!((report.summary.elimination_rate_pct - 25.0).abs() < 1e-9);
        assert!((report.summary.ml_elimination_rate_pct - 50.0).abs() < 1e-9);
        assert_eq!(report.summary.overrides_applied, 1);
        assert_eq!(report.summary.overrides_changed_decision, 1);

        // histogram reflects model confidence even for the overridden row
        assert_eq!(report.confidence_distribution[&ConfidenceLevel::High], 4);
    }

    #[test]
    fn test_missing_commodity_grouped_as_unknown() {
        let rows = vec![
            row("CML-1", 0.9, None),
            row("CML-2", 0.9, Some("  ")),
            row("CML-3", 0.1, Some("STEAM")),
        ];
        let report = ReportAggregator::default().build(&rows);

        let unknown = report
            .by_commodity
            .iter()
            .find(|c| c.commodity == UNKNOWN_COMMODITY)
            .unwrap();
        assert_eq!(unknown.total_cmls, 2);
        assert_eq!(unknown.eliminations, 2);
        assert!((unknown.elimination_rate_pct - 100.0).abs() < 1e-9);
        assert_eq!(report.eliminations_by_feature[UNKNOWN_COMMODITY], 2);
    }

    #[test]
    fn test_top_candidates_order_and_limit() {
        let rows = vec![
            row("CML-B", 0.9, None),
            row("CML-A", 0.9, None),
            row("CML-C", 0.95, None),
            row("CML-D", 0.7, None),
            row("CML-E", 0.3, None),
            overridden("CML-F", 0.99, Recommendation::Keep),
        ];
        let aggregator = ReportAggregator::new(ReportConfig { top_candidates: 3 });
        let report = aggregator.build(&rows);

        let ids: Vec<&str> = report
            .top_elimination_candidates
            .iter()
            .map(|c| c.id_number.as_str())
            .collect();
        assert_eq!(ids, vec!["CML-C", "CML-A", "CML-B"]);
    }

    #[test]
    fn test_marginal_cases_sorted_by_distance_from_half() {
        let rows = vec![
            row("CML-1", 0.58, None),
            row("CML-2", 0.5, None),
            row("CML-3", 0.5625, None),
            row("CML-4", 0.4375, None),
            row("CML-5", 0.9, None),
        ];
        let report = ReportAggregator::default().build(&rows);

        let ids: Vec<&str> = report
            .marginal_cases
            .iter()
            .map(|c| c.id_number.as_str())
            .collect();
        // 0.4375 and 0.5625 tie on distance; id breaks the tie
        assert_eq!(ids, vec!["CML-2", "CML-3", "CML-4", "CML-1"]);
    }

    #[test]
    fn test_join_rows_matches_by_id() {
        let engine = EliminationDecisionEngine::default();
        let decisions = vec![
            ReconciledDecision::from_parts(engine.decide("CML-2", 0.7).unwrap(), None),
            ReconciledDecision::from_parts(engine.decide("CML-1", 0.2).unwrap(), None),
        ];
        let measurements = vec![
            CmlMeasurement::new("CML-1", 8.0, 0.1).with_commodity("GAS"),
            CmlMeasurement::new("CML-2", 6.0, 0.3).with_feature_type("ELBOW"),
        ];

        let rows = join_rows(decisions, &[], &measurements);
        assert_eq!(rows[0].decision.id_number, "CML-2");
        assert_eq!(rows[0].feature_type.as_deref(), Some("ELBOW"));
        assert_eq!(rows[1].commodity.as_deref(), Some("GAS"));
        assert!(rows[1].forecast.is_none());
    }
}
