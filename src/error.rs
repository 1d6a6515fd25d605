//! Engine error type
//!
//! Every failure is local and synchronous. Variants carry the offending
//! `id_number` so callers can surface a structured, human-readable cause.

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid measurement for {id_number}: {reason}")]
    InvalidMeasurement { id_number: String, reason: String },

    #[error("invalid probability {value} for {id_number}: must be a finite number in [0, 1]")]
    InvalidProbability { id_number: String, value: f64 },

    #[error("no elimination probability available for {id_number} from model '{model}'")]
    ProbabilityUnavailable { id_number: String, model: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub(crate) fn invalid_measurement(id_number: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMeasurement {
            id_number: id_number.to_string(),
            reason: reason.into(),
        }
    }

    /// The CML the failure relates to, when there is one.
    pub fn id_number(&self) -> Option<&str> {
        match self {
            Self::InvalidMeasurement { id_number, .. }
            | Self::InvalidProbability { id_number, .. }
            | Self::ProbabilityUnavailable { id_number, .. } => Some(id_number),
            Self::Storage(e) => e.id_number(),
        }
    }
}
