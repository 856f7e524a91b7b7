//! Explanation Builder: turns a reconciliation decision into a `FraudResult`

use crate::models::ModelVerdict;
use crate::reconcile::{ReconciliationDecision, ReconciliationReason};
use crate::scoring::RuleScore;
use crate::types::FraudResult;

/// `model_used` when the rule score wins
pub const RULE_FALLBACK_ID: &str = "rule-based-fallback";

/// Rule clauses appended to an accepted model explanation
const SUPPORTING_FACTORS: usize = 3;

/// Compose the final result. Processing time is set by the caller.
pub fn build_result(
    decision: &ReconciliationDecision,
    rule: &RuleScore,
    verdict: &ModelVerdict,
    similar_patterns: usize,
) -> FraudResult {
    let supporting = rule.risk_increasing();

    let (explanation, model_used, factors) = if decision.model_accepted() {
        let mut explanation = verdict.raw_explanation.trim().to_string();
        if explanation.is_empty() {
            explanation = format!("Model assessed a fraud score of {:.0}/100.", decision.accepted_score);
        }
        let top: Vec<&str> = supporting
            .iter()
            .take(SUPPORTING_FACTORS)
            .map(|f| f.clause.as_str())
            .collect();
        if !top.is_empty() {
            explanation.push_str("\n\nSupporting rule evidence: ");
            explanation.push_str(&top.join("; "));
            explanation.push('.');
        }

        let mut factors = verdict.risk_factors.clone();
        factors.extend(
            supporting
                .iter()
                .take(SUPPORTING_FACTORS)
                .map(|f| f.name.to_string()),
        );
        let model_used = verdict.backend_id.clone().unwrap_or_else(|| "unknown".to_string());
        (explanation, model_used, factors)
    } else {
        let factors = supporting.iter().map(|f| f.name.to_string()).collect();
        (
            rule_explanation(decision, rule, verdict),
            RULE_FALLBACK_ID.to_string(),
            factors,
        )
    };

    FraudResult::new(decision.accepted_score, explanation, model_used)
        .with_context(similar_patterns, decision.reason)
        .with_risk_factors(factors)
}

fn rule_explanation(decision: &ReconciliationDecision, rule: &RuleScore, verdict: &ModelVerdict) -> String {
    let model = verdict.score.unwrap_or_default();
    let why = match decision.reason {
        ReconciliationReason::ModelUnavailable => "no model answer was available".to_string(),
        ReconciliationReason::FalsePositiveGuard => {
            format!("the model score of {model:.0} was rejected as a likely false positive")
        }
        ReconciliationReason::FalseNegativeGuard => {
            format!("the model score of {model:.0} was rejected as a likely false negative")
        }
        ReconciliationReason::LargeDiscrepancy => {
            format!("the model score of {model:.0} disagreed with the rule score by more than 20 points")
        }
        ReconciliationReason::ExtremeDiscrepancy => {
            format!("the model score of {model:.0} contradicted strong rule-based evidence")
        }
        ReconciliationReason::ModelAccepted => "the rule score was selected".to_string(),
    };

    let mut text = format!("Rule-based assessment ({why}): fraud score {:.1}/100.", rule.value);

    let raising = rule.risk_increasing();
    if raising.is_empty() {
        text.push_str(" No rule-based risk indicators were triggered.");
    } else {
        text.push_str(" Risk indicators: ");
        text.push_str(&raising.iter().map(|f| f.clause.as_str()).collect::<Vec<_>>().join("; "));
        text.push('.');
    }

    let mitigating: Vec<&str> = rule
        .factors
        .iter()
        .filter(|f| f.weight < 0.0)
        .map(|f| f.clause.as_str())
        .collect();
    if !mitigating.is_empty() {
        text.push_str(" Mitigating: ");
        text.push_str(&mitigating.join("; "));
        text.push('.');
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::AcceptedSource;
    use crate::scoring::RiskFactor;
    use crate::types::RiskLevel;

    fn rule() -> RuleScore {
        let factor = |name, weight, clause: &str| RiskFactor {
            name,
            weight,
            clause: clause.to_string(),
        };
        RuleScore {
            value: 62.0,
            factors: vec![
                factor("new_account", 25.0, "account opened 3 days ago"),
                factor("kyc_verified", -20.0, "KYC verification complete"),
                factor("high_amount", 30.0, "high amount of $12,000.00"),
                factor("odd_hour", 15.0, "transaction at 3:00"),
                factor("unknown_network", 10.0, "unrecognised network"),
            ],
        }
    }

    fn decision(score: f64, source: AcceptedSource, reason: ReconciliationReason) -> ReconciliationDecision {
        ReconciliationDecision {
            accepted_score: score,
            accepted_source: source,
            reason,
        }
    }

    #[test]
    fn test_model_accepted_leads_with_model_text() {
        let verdict = ModelVerdict::answered("qwen", 66.0, "Large transfer from a new account.".to_string())
            .with_risk_factors(vec!["new account".to_string()]);
        let result = build_result(
            &decision(66.0, AcceptedSource::Model, ReconciliationReason::ModelAccepted),
            &rule(),
            &verdict,
            4,
        );

        assert_eq!(result.model_used, "qwen");
        assert_eq!(result.fraud_score, 66.0);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.similar_patterns_count, 4);
        assert!(result.explanation.starts_with("Large transfer from a new account."));
        assert!(result
            .explanation
            .ends_with("Supporting rule evidence: high amount of $12,000.00; account opened 3 days ago; transaction at 3:00."));
        assert!(!result.explanation.contains("unrecognised network"));
        assert_eq!(result.risk_factors, vec!["new account", "high_amount", "new_account", "odd_hour"]);
    }

    #[test]
    fn test_rule_fallback_uses_rule_clauses() {
        let verdict = ModelVerdict::answered("qwen", 5.0, "Looks fine.".to_string());
        let result = build_result(
            &decision(62.0, AcceptedSource::RuleFallback, ReconciliationReason::FalseNegativeGuard),
            &rule(),
            &verdict,
            0,
        );

        assert_eq!(result.model_used, RULE_FALLBACK_ID);
        assert_eq!(result.fraud_score, 62.0);
        assert_eq!(result.reconciliation, ReconciliationReason::FalseNegativeGuard);
        assert!(result.explanation.starts_with("Rule-based assessment (the model score of 5 was rejected"));
        assert!(result.explanation.contains("unrecognised network"));
        assert!(result.explanation.contains("Mitigating: KYC verification complete."));
        assert!(!result.explanation.contains("Looks fine"));
        assert_eq!(result.risk_factors.len(), 4);
    }

    #[test]
    fn test_rule_fallback_without_factors() {
        let result = build_result(
            &decision(0.0, AcceptedSource::RuleFallback, ReconciliationReason::ModelUnavailable),
            &RuleScore {
                value: 0.0,
                factors: Vec::new(),
            },
            &ModelVerdict::unavailable(Vec::new()),
            0,
        );
        assert!(result.explanation.contains("no model answer was available"));
        assert!(result.explanation.contains("No rule-based risk indicators"));
        assert_eq!(result.risk_level, RiskLevel::Low);
    }
}
