//! Elimination Decision Engine
//!
//! Turns a model-provided elimination probability into a recommendation and
//! a confidence bucket. Pure; safe to call concurrently.

use serde::Serialize;
use tracing::debug;

use crate::config::DecisionConfig;
use crate::error::EngineError;
use crate::types::{ConfidenceLevel, EliminationResult, Recommendation};

use super::model::ProbabilityModel;

#[derive(Debug, Clone, Default)]
pub struct EliminationDecisionEngine {
    config: DecisionConfig,
}

impl EliminationDecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Decide on one CML from its elimination probability.
    ///
    /// Probabilities must be finite and within [0, 1].
    pub fn decide(
        &self,
        id_number: &str,
        elimination_probability: f64,
    ) -> Result<EliminationResult, EngineError> {
        if !elimination_probability.is_finite() || !(0.0..=1.0).contains(&elimination_probability) {
            return Err(EngineError::InvalidProbability {
                id_number: id_number.to_string(),
                value: elimination_probability,
            });
        }

        let eliminate = elimination_probability >= self.config.decision_threshold;
        let recommendation = if eliminate {
            Recommendation::Eliminate
        } else {
            Recommendation::Keep
        };

        let keep_probability = 1.0 - elimination_probability;
        let confidence = elimination_probability.max(keep_probability);
        let confidence_level = ConfidenceLevel::from_confidence(
            confidence,
            self.config.high_confidence,
            self.config.medium_confidence,
        );

        debug!(
            id_number,
            elimination_probability,
            recommendation = %recommendation,
            confidence_level = %confidence_level,
            "Decision computed"
        );

        Ok(EliminationResult {
            id_number: id_number.to_string(),
            elimination_probability,
            keep_probability,
            predicted_elimination: u8::from(eliminate),
            recommendation,
            confidence,
            confidence_level,
        })
    }

    /// Ask the injected model for a probability, then decide.
    pub fn decide_with_model(
        &self,
        id_number: &str,
        model: &dyn ProbabilityModel,
    ) -> Result<EliminationResult, EngineError> {
        let probability = model.elimination_probability(id_number).ok_or_else(|| {
            EngineError::ProbabilityUnavailable {
                id_number: id_number.to_string(),
                model: model.name().to_string(),
            }
        })?;
        self.decide(id_number, probability)
    }

    /// Decide for every id in order, stopping at the first failure.
    pub fn decide_batch<'a, I>(
        &self,
        id_numbers: I,
        model: &dyn ProbabilityModel,
    ) -> Result<Vec<EliminationResult>, EngineError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        id_numbers
            .into_iter()
            .map(|id| self.decide_with_model(id, model))
            .collect()
    }
}

// ============================================================================
// Scoring Summary
// ============================================================================

/// Headline counts over a scored batch, before any override is applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringSummary {
    pub total_cmls: usize,
    pub recommended_eliminations: usize,
    pub recommended_keep: usize,
    /// Fraction of CMLs recommended for elimination (0-1)
    pub elimination_rate: f64,
    pub high_confidence_eliminations: usize,
}

impl ScoringSummary {
    pub fn from_results(results: &[EliminationResult]) -> Self {
        let total_cmls = results.len();
        let recommended_eliminations = results
            .iter()
            .filter(|r| r.recommendation.is_eliminate())
            .count();
        let high_confidence_eliminations = results
            .iter()
            .filter(|r| {
                r.recommendation.is_eliminate() && r.confidence_level == ConfidenceLevel::High
            })
            .count();

        let elimination_rate = if total_cmls == 0 {
            0.0
        } else {
            recommended_eliminations as f64 / total_cmls as f64
        };

        Self {
            total_cmls,
            recommended_eliminations,
            recommended_keep: total_cmls - recommended_eliminations,
            elimination_rate,
            high_confidence_eliminations,
        }
    }
}
