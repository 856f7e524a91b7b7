//! Deterministic rule-based fraud scoring.
//!
//! Each sector has a fixed set of additive heuristics. Missing or unparseable
//! fields contribute nothing; the total is clamped to [0, 100]. The score is
//! the floor used to sanity-check model verdicts during reconciliation.

mod banking;
mod ecommerce;
pub mod jurisdiction;
mod medical;
mod supply_chain;

use crate::types::{FraudRequest, Sector};
use serde::Serialize;
use tracing::debug;

/// A triggered heuristic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    /// Stable heuristic identifier, e.g. `new_account`
    pub name: &'static str,
    /// Signed contribution to the score
    pub weight: f64,
    /// Human-readable clause for explanations
    pub clause: String,
}

/// Output of the rule scorer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleScore {
    /// Clamped score (0 - 100)
    pub value: f64,
    /// Triggered heuristics in evaluation order
    pub factors: Vec<RiskFactor>,
}

impl RuleScore {
    /// Factors that raised the score, strongest first
    pub fn risk_increasing(&self) -> Vec<&RiskFactor> {
        let mut raising: Vec<&RiskFactor> = self.factors.iter().filter(|f| f.weight > 0.0).collect();
        // stable sort keeps evaluation order for equal weights
        raising.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        raising
    }
}

/// Accumulates heuristic contributions for one request
#[derive(Debug, Default)]
pub(crate) struct Tally {
    total: f64,
    factors: Vec<RiskFactor>,
}

impl Tally {
    pub(crate) fn add(&mut self, name: &'static str, weight: f64, clause: impl Into<String>) {
        self.total += weight;
        self.factors.push(RiskFactor {
            name,
            weight,
            clause: clause.into(),
        });
    }

    pub(crate) fn running_total(&self) -> f64 {
        self.total
    }

    fn finish(self) -> RuleScore {
        let value = (self.total.clamp(0.0, 100.0) * 10.0).round() / 10.0;
        RuleScore {
            value,
            factors: self.factors,
        }
    }
}

/// Sector-dispatching rule scorer. Stateless and side-effect free.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleScorer;

impl RuleScorer {
    /// Create a new rule scorer
    pub fn new() -> Self {
        Self
    }

    /// Score a request. Never fails.
    pub fn score(&self, request: &FraudRequest) -> RuleScore {
        let mut tally = Tally::default();

        match request.sector {
            Sector::Banking => banking::score(request, &mut tally),
            Sector::Medical => medical::score(request, &mut tally),
            Sector::Ecommerce => ecommerce::score(request, &mut tally),
            Sector::SupplyChain => supply_chain::score(request, &mut tally),
        }

        let score = tally.finish();
        debug!(
            sector = %request.sector,
            score = score.value,
            factors = score.factors.len(),
            "Rule score computed"
        );
        score
    }
}

/// Format a currency amount as `$12,345.67`
pub(crate) fn money(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!(
        "{}${}.{:02}",
        if negative { "-" } else { "" },
        grouped,
        cents % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    pub(crate) fn request(sector: Sector, data: Value) -> FraudRequest {
        match data {
            Value::Object(map) => FraudRequest::new(sector, map),
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn test_money_format() {
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(999.5), "$999.50");
        assert_eq!(money(1234567.891), "$1,234,567.89");
        assert_eq!(money(-50000.0), "-$50,000.00");
    }

    #[test]
    fn test_empty_payload_is_neutral() {
        let scorer = RuleScorer::new();
        for sector in Sector::ALL {
            let score = scorer.score(&request(sector, json!({})));
            assert!((0.0..=100.0).contains(&score.value), "{sector}: {}", score.value);
        }
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let scorer = RuleScorer::new();
        let req = request(
            Sector::Banking,
            json!({
                "amount": 75000,
                "location": "Lagos, Nigeria",
                "ip_address": "TOR exit node",
                "account_age_days": 3,
                "kyc_verified": false,
                "time": "03:12"
            }),
        );
        assert_eq!(scorer.score(&req), scorer.score(&req));
    }

    #[test]
    fn test_risk_increasing_ordering() {
        let score = RuleScore {
            value: 50.0,
            factors: vec![
                RiskFactor { name: "a", weight: 10.0, clause: "a".into() },
                RiskFactor { name: "b", weight: -5.0, clause: "b".into() },
                RiskFactor { name: "c", weight: 30.0, clause: "c".into() },
                RiskFactor { name: "d", weight: 10.0, clause: "d".into() },
            ],
        };
        let names: Vec<_> = score.risk_increasing().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["c", "a", "d"]);
    }

    fn arb_payload() -> impl Strategy<Value = Value> {
        (
            -1.0e7f64..1.0e8,
            -10i64..5000,
            0i64..50,
            any::<bool>(),
            -100.0f64..1000.0,
            prop::sample::select(vec!["tor", "vpn", "unknown", "", "home broadband"]),
        )
            .prop_map(|(amount, age, velocity, verified, variance, ip)| {
                json!({
                    "amount": amount,
                    "claim_amount": amount,
                    "price": amount,
                    "market_price": amount / 3.0,
                    "order_amount": amount,
                    "account_age_days": age,
                    "seller_age_days": age,
                    "supplier_age_days": age,
                    "transaction_velocity": velocity,
                    "kyc_verified": verified,
                    "email_verified": verified,
                    "documentation_complete": verified,
                    "price_variance": variance,
                    "delivery_variance": variance,
                    "quality_issues": velocity,
                    "ip_address": ip,
                    "procedures": vec!["99213"; (velocity as usize) % 15],
                })
            })
    }

    proptest! {
        #[test]
        fn test_rule_score_always_clamped(
            sector in prop::sample::select(Sector::ALL.to_vec()),
            payload in arb_payload(),
        ) {
            let score = RuleScorer::new().score(&request(sector, payload));
            prop_assert!((0.0..=100.0).contains(&score.value));
        }
    }
}
