//! Elimination decisions: model scoring and SME reconciliation

pub mod engine;
pub mod model;
pub mod reconciler;

pub use engine::{EliminationDecisionEngine, ScoringSummary};
pub use model::{ProbabilityModel, StaticProbabilities};
pub use reconciler::DecisionReconciler;
