//! Decision types: Recommendation, ConfidenceLevel, EliminationResult,
//! ReconciledDecision

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::SmeOverride;

/// Keep-or-eliminate outcome, produced by the model or an SME
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Keep,
    Eliminate,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "KEEP",
            Self::Eliminate => "ELIMINATE",
        }
    }

    pub fn is_eliminate(&self) -> bool {
        matches!(self, Self::Eliminate)
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a decision string is neither KEEP nor ELIMINATE.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown decision '{0}' (expected KEEP or ELIMINATE)")]
pub struct ParseRecommendationError(pub String);

impl FromStr for Recommendation {
    type Err = ParseRecommendationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KEEP" => Ok(Self::Keep),
            "ELIMINATE" => Ok(Self::Eliminate),
            _ => Err(ParseRecommendationError(s.to_string())),
        }
    }
}

/// Categorical bucket of how far a probability sits from maximal uncertainty
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Bucket a confidence value (always >= 0.5) against the configured boundaries.
    pub fn from_confidence(confidence: f64, high: f64, medium: f64) -> Self {
        if confidence >= high {
            Self::High
        } else if confidence >= medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-driven recommendation for one CML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationResult {
    pub id_number: String,
    pub elimination_probability: f64,
    pub keep_probability: f64,
    /// 1 = eliminate, 0 = keep
    pub predicted_elimination: u8,
    pub recommendation: Recommendation,
    /// max(p, 1 - p), in [0.5, 1]
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
}

/// Authoritative decision for one CML after applying any SME override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledDecision {
    pub id_number: String,
    pub elimination: EliminationResult,
    #[serde(default)]
    pub sme_override: Option<SmeOverride>,
    pub final_decision: Recommendation,
}

impl ReconciledDecision {
    /// Combine a model result with an optional override. The override always wins.
    pub fn from_parts(elimination: EliminationResult, sme_override: Option<SmeOverride>) -> Self {
        let final_decision = sme_override
            .as_ref()
            .map_or(elimination.recommendation, |o| o.sme_decision);

        Self {
            id_number: elimination.id_number.clone(),
            elimination,
            sme_override,
            final_decision,
        }
    }

    pub fn is_overridden(&self) -> bool {
        self.sme_override.is_some()
    }

    /// True when an override exists and it disagrees with the model.
    pub fn override_changed_decision(&self) -> bool {
        self.sme_override.is_some() && self.final_decision != self.elimination.recommendation
    }
}
