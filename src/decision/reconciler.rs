//! Decision Reconciler
//!
//! Merges model output with stored SME overrides. An override, when present,
//! always determines the final decision regardless of model confidence.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::storage::OverrideStore;
use crate::types::{EliminationResult, ReconciledDecision, SmeOverride};

pub struct DecisionReconciler {
    store: Arc<dyn OverrideStore>,
}

impl DecisionReconciler {
    pub fn new(store: Arc<dyn OverrideStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn OverrideStore> {
        &self.store
    }

    /// Reconcile one model result against the override store.
    pub fn reconcile(
        &self,
        elimination: EliminationResult,
    ) -> Result<ReconciledDecision, EngineError> {
        let sme_override = self.store.get_override(&elimination.id_number)?;
        let decision = ReconciledDecision::from_parts(elimination, sme_override);

        if decision.override_changed_decision() {
            debug!(
                id_number = %decision.id_number,
                ml = %decision.elimination.recommendation,
                sme = %decision.final_decision,
                "SME override reversed model recommendation"
            );
        }

        Ok(decision)
    }

    /// Reconcile a batch with a single snapshot of the override store.
    /// Output order follows input order.
    pub fn reconcile_batch(
        &self,
        results: Vec<EliminationResult>,
    ) -> Result<Vec<ReconciledDecision>, EngineError> {
        let overrides: HashMap<String, SmeOverride> = self
            .store
            .list_overrides()?
            .into_iter()
            .map(|o| (o.id_number.clone(), o))
            .collect();

        let total = results.len();
        let decisions: Vec<ReconciledDecision> = results
            .into_iter()
            .map(|r| {
                // Duplicated ids in one batch each still see the override
                let sme_override = overrides.get(&r.id_number).cloned();
                ReconciledDecision::from_parts(r, sme_override)
            })
            .collect();

        let applied = decisions.iter().filter(|d| d.is_overridden()).count();
        let changed = decisions
            .iter()
            .filter(|d| d.override_changed_decision())
            .count();

        info!(
            total,
            overrides_applied = applied,
            overrides_changed = changed,
            backend = self.store.backend_name(),
            "Batch reconciled"
        );

        Ok(decisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::EliminationDecisionEngine;
    use crate::storage::InMemoryOverrideStore;
    use crate::types::Recommendation;

    fn reconciler_with(overrides: Vec<SmeOverride>) -> DecisionReconciler {
        let store = InMemoryOverrideStore::new();
        for o in overrides {
            store.put_override(o).unwrap();
        }
        DecisionReconciler::new(Arc::new(store))
    }

    #[test]
    fn test_override_wins_over_high_confidence_model() {
        let engine = EliminationDecisionEngine::default();
        let reconciler = reconciler_with(vec![SmeOverride::new(
            "CML-042",
            Recommendation::Keep,
            "high-risk process area",
            "Dr. Smith",
        )
        .with_original(Recommendation::Eliminate, Some(0.85))]);

        let decision = reconciler
            .reconcile(engine.decide("CML-042", 0.85).unwrap())
            .unwrap();

        assert_eq!(decision.elimination.recommendation, Recommendation::Eliminate);
        assert_eq!(decision.final_decision, Recommendation::Keep);
        assert!(decision.override_changed_decision());
    }

    #[test]
    fn test_no_override_keeps_model_recommendation() {
        let engine = EliminationDecisionEngine::default();
        let reconciler = reconciler_with(Vec::new());

        let decision = reconciler
            .reconcile(engine.decide("CML-100", 0.3).unwrap())
            .unwrap();
        assert_eq!(decision.final_decision, Recommendation::Keep);
        assert!(!decision.is_overridden());
    }

    #[test]
    fn test_agreeing_override_is_applied_but_not_a_change() {
        let engine = EliminationDecisionEngine::default();
        let reconciler = reconciler_with(vec![SmeOverride::new(
            "CML-7",
            Recommendation::Eliminate,
            "confirmed redundant",
            "A. Ortiz",
        )]);

        let decision = reconciler
            .reconcile(engine.decide("CML-7", 0.92).unwrap())
            .unwrap();
        assert!(decision.is_overridden());
        assert!(!decision.override_changed_decision());
    }

    #[test]
    fn test_batch_preserves_order() {
        let engine = EliminationDecisionEngine::default();
        let reconciler = reconciler_with(vec![SmeOverride::new(
            "CML-2",
            Recommendation::Eliminate,
            "duplicate coverage",
            "A. Ortiz",
        )]);

        let results = vec![
            engine.decide("CML-3", 0.9).unwrap(),
            engine.decide("CML-2", 0.1).unwrap(),
            engine.decide("CML-1", 0.4).unwrap(),
        ];
        let decisions = reconciler.reconcile_batch(results).unwrap();

        let ids: Vec<&str> = decisions.iter().map(|d| d.id_number.as_str()).collect();
        assert_eq!(ids, vec!["CML-3", "CML-2", "CML-1"]);
        assert_eq!(decisions[1].final_decision, Recommendation::Eliminate);
        assert_eq!(decisions[2].final_decision, Recommendation::Keep);
    }
}
