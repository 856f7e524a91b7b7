//! Fraud result data structures

use crate::reconcile::ReconciliationReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Fixed score bands: critical >= 85, high >= 60, medium >= 30
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            RiskLevel::Critical
        } else if score >= 60.0 {
            RiskLevel::High
        } else if score >= 30.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Terminal artifact returned to the caller for every scored request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudResult {
    /// Unique result identifier
    pub request_id: String,

    /// Accepted fraud score (0 - 100)
    pub fraud_score: f64,

    /// Risk band derived from `fraud_score`
    pub risk_level: RiskLevel,

    /// Human-readable explanation
    pub explanation: String,

    /// Backend that produced the accepted score, or `rule-based-fallback`
    pub model_used: String,

    /// End-to-end processing time
    pub processing_time_ms: u64,

    /// Number of retrieved similar patterns used as context
    #[serde(rename = "similar_patterns")]
    pub similar_patterns_count: usize,

    /// Factor names that supported the final score
    pub risk_factors: Vec<String>,

    /// Reconciliation outcome
    pub reconciliation: ReconciliationReason,

    /// Analysis timestamp
    pub analyzed_at: DateTime<Utc>,
}

impl FraudResult {
    /// Create a new result; the risk level is always derived from the score
    pub fn new(fraud_score: f64, explanation: String, model_used: String) -> Self {
        let fraud_score = fraud_score.clamp(0.0, 100.0);
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            fraud_score,
            risk_level: RiskLevel::from_score(fraud_score),
            explanation,
            model_used,
            processing_time_ms: 0,
            similar_patterns_count: 0,
            risk_factors: Vec::new(),
            reconciliation: ReconciliationReason::ModelUnavailable,
            analyzed_at: Utc::now(),
        }
    }

    /// Attach retrieval and reconciliation context
    pub fn with_context(
        mut self,
        similar_patterns_count: usize,
        reconciliation: ReconciliationReason,
    ) -> Self {
        self.similar_patterns_count = similar_patterns_count;
        self.reconciliation = reconciliation;
        self
    }

    /// Add supporting factor names
    pub fn with_risk_factors(mut self, factors: Vec<String>) -> Self {
        self.risk_factors = factors;
        self
    }

    /// Set the measured processing time
    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(29.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(84.9), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(85.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::Critical);
    }

    #[test]
    fn test_fraud_result_serialization() {
        let result = FraudResult::new(72.0, "Suspicious".to_string(), "qwen".to_string())
            .with_context(3, ReconciliationReason::ModelAccepted)
            .with_processing_time(1234);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["fraud_score"], 72.0);
        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["similar_patterns"], 3);
        assert_eq!(json["processing_time_ms"], 1234);
        assert_eq!(json["reconciliation"], "model_accepted");

        let back: FraudResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.request_id, result.request_id);
        assert_eq!(back.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_score_is_clamped() {
        let result = FraudResult::new(140.0, String::new(), String::new());
        assert_eq!(result.fraud_score, 100.0);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    proptest! {
        #[test]
        fn test_risk_level_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let rank = |l: RiskLevel| l as u8;
            prop_assert!(rank(RiskLevel::from_score(lo)) <= rank(RiskLevel::from_score(hi)));
        }

        #[test]
        fn test_result_level_matches_score(score in -50.0f64..150.0) {
            let result = FraudResult::new(score, String::new(), String::new());
            prop_assert!((0.0..=100.0).contains(&result.fraud_score));
            prop_assert_eq!(result.risk_level, RiskLevel::from_score(result.fraud_score));
        }
    }
}
