//! Model-versus-rule score reconciliation
//!
//! The thresholds here are fixed: the false-positive guard is stricter than
//! the false-negative guard, biasing the pipeline towards under-flagging.

use crate::models::ModelVerdict;
use crate::scoring::RuleScore;
use crate::types::Sector;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Which score the decision adopted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptedSource {
    Model,
    RuleFallback,
}

/// Outcome of reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationReason {
    /// No backend produced a score
    ModelUnavailable,
    /// Rule score very low, model score critical
    FalsePositiveGuard,
    /// Rule score high, model score low
    FalseNegativeGuard,
    /// Scores more than 20 points apart
    LargeDiscrepancy,
    /// Medical: rule score > 75 while the model scored < 25
    ExtremeDiscrepancy,
    ModelAccepted,
}

impl ReconciliationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationReason::ModelUnavailable => "model_unavailable",
            ReconciliationReason::FalsePositiveGuard => "false_positive_guard",
            ReconciliationReason::FalseNegativeGuard => "false_negative_guard",
            ReconciliationReason::LargeDiscrepancy => "large_discrepancy",
            ReconciliationReason::ExtremeDiscrepancy => "extreme_discrepancy",
            ReconciliationReason::ModelAccepted => "model_accepted",
        }
    }
}

/// Result of comparing a model verdict against the rule score
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationDecision {
    pub accepted_score: f64,
    pub accepted_source: AcceptedSource,
    pub reason: ReconciliationReason,
}

impl ReconciliationDecision {
    fn model(score: f64) -> Self {
        Self {
            accepted_score: score,
            accepted_source: AcceptedSource::Model,
            reason: ReconciliationReason::ModelAccepted,
        }
    }

    fn rule(rule: &RuleScore, reason: ReconciliationReason) -> Self {
        Self {
            accepted_score: rule.value,
            accepted_source: AcceptedSource::RuleFallback,
            reason,
        }
    }

    /// True when the model's score was adopted
    pub fn model_accepted(&self) -> bool {
        self.accepted_source == AcceptedSource::Model
    }
}

/// Decide between the model verdict and the rule score
pub fn reconcile(sector: Sector, rule: &RuleScore, verdict: &ModelVerdict) -> ReconciliationDecision {
    let Some(model) = verdict.score else {
        warn!(
            sector = %sector,
            rule_score = rule.value,
            failures = verdict.failures.len(),
            "No model answer, using rule score"
        );
        return ReconciliationDecision::rule(rule, ReconciliationReason::ModelUnavailable);
    };

    let decision = match sector {
        Sector::Medical => reconcile_two_stage(rule, model),
        _ => reconcile_single_stage(rule, model),
    };

    if decision.model_accepted() {
        info!(
            sector = %sector,
            backend = verdict.backend_id.as_deref().unwrap_or("unknown"),
            model_score = model,
            rule_score = rule.value,
            "Model score accepted"
        );
    } else {
        warn!(
            sector = %sector,
            backend = verdict.backend_id.as_deref().unwrap_or("unknown"),
            model_score = model,
            rule_score = rule.value,
            reason = decision.reason.as_str(),
            "Model score rejected"
        );
    }

    decision
}

fn reconcile_single_stage(rule: &RuleScore, model: f64) -> ReconciliationDecision {
    let diff = (model - rule.value).abs();

    if rule.value < 10.0 && model > 85.0 {
        ReconciliationDecision::rule(rule, ReconciliationReason::FalsePositiveGuard)
    } else if rule.value > 60.0 && model < 30.0 {
        ReconciliationDecision::rule(rule, ReconciliationReason::FalseNegativeGuard)
    } else if diff > 20.0 {
        ReconciliationDecision::rule(rule, ReconciliationReason::LargeDiscrepancy)
    } else {
        ReconciliationDecision::model(model)
    }
}

fn reconcile_two_stage(rule: &RuleScore, model: f64) -> ReconciliationDecision {
    if rule.value > 75.0 && model < 25.0 {
        ReconciliationDecision::rule(rule, ReconciliationReason::ExtremeDiscrepancy)
    } else {
        ReconciliationDecision::model(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(value: f64) -> RuleScore {
        RuleScore {
            value,
            factors: Vec::new(),
        }
    }

    fn verdict(score: Option<f64>) -> ModelVerdict {
        let mut v = ModelVerdict::unavailable(Vec::new());
        v.score = score;
        v.backend_id = score.map(|_| "test-backend".to_string());
        v
    }

    #[test]
    fn test_model_unavailable() {
        let d = reconcile(Sector::Banking, &rule(42.0), &verdict(None));
        assert_eq!(d.reason, ReconciliationReason::ModelUnavailable);
        assert_eq!(d.accepted_source, AcceptedSource::RuleFallback);
        assert_eq!(d.accepted_score, 42.0);

        let d = reconcile(Sector::Medical, &rule(42.0), &verdict(None));
        assert_eq!(d.reason, ReconciliationReason::ModelUnavailable);
    }

    #[test]
    fn test_false_positive_guard() {
        let d = reconcile(Sector::Ecommerce, &rule(5.0), &verdict(Some(90.0)));
        assert_eq!(d.reason, ReconciliationReason::FalsePositiveGuard);
        assert_eq!(d.accepted_score, 5.0);
    }

    #[test]
    fn test_false_negative_guard() {
        let d = reconcile(Sector::Banking, &rule(70.0), &verdict(Some(20.0)));
        assert_eq!(d.reason, ReconciliationReason::FalseNegativeGuard);
        assert_eq!(d.accepted_score, 70.0);
    }

    #[test]
    fn test_large_discrepancy() {
        let d = reconcile(Sector::SupplyChain, &rule(40.0), &verdict(Some(65.0)));
        assert_eq!(d.reason, ReconciliationReason::LargeDiscrepancy);
        assert_eq!(d.accepted_score, 40.0);
    }

    #[test]
    fn test_close_scores_accept_model() {
        let d = reconcile(Sector::Banking, &rule(50.0), &verdict(Some(55.0)));
        assert_eq!(d.reason, ReconciliationReason::ModelAccepted);
        assert_eq!(d.accepted_source, AcceptedSource::Model);
        assert_eq!(d.accepted_score, 55.0);

        // exactly 20 apart is still accepted
        let d = reconcile(Sector::Banking, &rule(30.0), &verdict(Some(50.0)));
        assert!(d.model_accepted());
    }

    #[test]
    fn test_medical_override() {
        let d = reconcile(Sector::Medical, &rule(80.0), &verdict(Some(20.0)));
        assert_eq!(d.reason, ReconciliationReason::ExtremeDiscrepancy);
        assert_eq!(d.accepted_score, 80.0);

        let d = reconcile(Sector::Medical, &rule(80.0), &verdict(Some(60.0)));
        assert!(d.model_accepted());
        assert_eq!(d.accepted_score, 60.0);

        // wide gaps that would be rejected elsewhere are trusted
        let d = reconcile(Sector::Medical, &rule(5.0), &verdict(Some(90.0)));
        assert!(d.model_accepted());
    }

    proptest! {
        #[test]
        fn test_accepted_score_comes_from_one_source(
            r in 0.0f64..=100.0,
            m in 0.0f64..=100.0,
            sector in prop::sample::select(Sector::ALL.to_vec()),
        ) {
            let d = reconcile(sector, &rule(r), &verdict(Some(m)));
            match d.accepted_source {
                AcceptedSource::Model => prop_assert_eq!(d.accepted_score, m),
                AcceptedSource::RuleFallback => prop_assert_eq!(d.accepted_score, r),
            }
        }

        #[test]
        fn test_single_stage_acceptance_is_within_twenty(r in 0.0f64..=100.0, m in 0.0f64..=100.0) {
            let d = reconcile(Sector::Banking, &rule(r), &verdict(Some(m)));
            if d.model_accepted() {
                prop_assert!((m - r).abs() <= 20.0);
            }
        }
    }
}
