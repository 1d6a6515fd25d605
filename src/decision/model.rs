//! ProbabilityModel trait: pluggable source of elimination probabilities
//!
//! The trained classifier lives outside this crate. Anything that can map a
//! CML id to a probability can drive the decision engine:
//! - `StaticProbabilities`: precomputed scores delivered alongside a batch
//! - closures `Fn(&str) -> Option<f64>`

use std::collections::HashMap;

use crate::types::ScoredMeasurement;

/// Source of elimination probabilities keyed by CML id.
///
/// Implementations must be thread-safe (Send + Sync) so one model can be
/// shared across parallel scoring.
pub trait ProbabilityModel: Send + Sync {
    /// Probability that the CML can be eliminated, or `None` if the model has
    /// no score for it. Range checking happens in the decision engine.
    fn elimination_probability(&self, id_number: &str) -> Option<f64>;

    /// Model name for logging and error messages
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Scores produced by an external inference run
#[derive(Debug, Clone, Default)]
pub struct StaticProbabilities {
    name: String,
    probabilities: HashMap<String, f64>,
}

impl StaticProbabilities {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probabilities: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id_number: impl Into<String>, probability: f64) {
        self.probabilities.insert(id_number.into(), probability);
    }

    /// Collect the probabilities carried on scored rows. Later duplicates win.
    pub fn from_scored(name: impl Into<String>, rows: &[ScoredMeasurement]) -> Self {
        let mut model = Self::new(name);
        for row in rows {
            model.insert(row.measurement.id_number.clone(), row.elimination_probability);
        }
        model
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

impl ProbabilityModel for StaticProbabilities {
    fn elimination_probability(&self, id_number: &str) -> Option<f64> {
        self.probabilities.get(id_number).copied()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> ProbabilityModel for F
where
    F: Fn(&str) -> Option<f64> + Send + Sync,
{
    fn elimination_probability(&self, id_number: &str) -> Option<f64> {
        self(id_number)
    }

    fn name(&self) -> &str {
        "closure"
    }
}
