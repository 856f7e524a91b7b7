//! Supplier and purchase-order heuristics

use super::{money, Tally};
use crate::types::FraudRequest;

const KICKBACK_TERMS: &[&str] = &["kickback", "personal relationship", "bribery"];
const CRITICAL_TERMS: &[&str] = &[
    "kickback",
    "bribery",
    "corruption",
    "personal relationship",
    "conflict of interest",
    "under the table",
];
const HIGH_RISK_TERMS: &[&str] = &[
    "ghost",
    "unverified",
    "no references",
    "no online presence",
    "suspicious",
    "fraud",
    "inferior quality",
    "overpriced",
];
const MEDIUM_RISK_TERMS: &[&str] = &["unusual", "irregular", "questionable", "concerning"];
const LEGITIMATE_TERMS: &[&str] = &[
    "established",
    "regular",
    "verified",
    "5-year",
    "history",
    "legitimate",
    "competitive pricing",
];

pub(super) fn score(req: &FraudRequest, tally: &mut Tally) {
    let details = req.text("order_details").unwrap_or_default();
    let mentions = |terms: &[&str]| terms.iter().any(|t| details.contains(t));
    let kickback = mentions(KICKBACK_TERMS);
    let inflated = kickback || details.contains("above market");

    match req.text("payment_terms").as_deref() {
        Some("advance") => tally.add("advance_payment", 40.0, "full payment required in advance"),
        Some("cod") => tally.add("cash_on_delivery", 10.0, "cash-on-delivery terms"),
        _ => {}
    }

    let supplier_age = req.number("supplier_age_days");
    if let Some(age) = supplier_age {
        let days = age.max(0.0) as u64;
        if age < 1.0 {
            tally.add("brand_new_supplier", 50.0, "supplier registered less than a day ago");
        } else if age < 7.0 {
            tally.add("new_supplier", 45.0, format!("new supplier ({days} days)"));
        } else if age < 30.0 {
            tally.add("young_supplier", 30.0, format!("new supplier ({days} days)"));
        } else if age < 90.0 {
            tally.add("recent_supplier", 15.0, format!("supplier less than 90 days old ({days} days)"));
        } else if age >= 1095.0 {
            tally.add("established_supplier", -10.0, format!("established supplier ({days} days)"));
        } else if age >= 730.0 {
            tally.add("mature_supplier", -5.0, format!("mature supplier ({days} days)"));
        }
    }

    if let Some(variance) = req.number("price_variance").map(f64::abs) {
        let clause = format!("price variance {variance:.1}% from market");
        if variance > 40.0 {
            tally.add("price_inflation", if inflated { 40.0 } else { 35.0 }, clause);
        } else if variance > 30.0 {
            tally.add("price_inflation", if inflated { 35.0 } else { 30.0 }, clause);
        } else if variance > 20.0 {
            tally.add("price_variance", 20.0, clause);
        } else if variance > 10.0 {
            tally.add("price_variance", 10.0, clause);
        } else if variance < 5.0 {
            tally.add("competitive_price", -5.0, "pricing in line with market");
        }
    }

    if let Some(issues) = req.number("quality_issues") {
        let clause = format!("{issues:.0} quality issues reported");
        if issues > 5.0 {
            tally.add("quality_issues", 35.0, clause);
        } else if issues > 2.0 {
            tally.add("quality_issues", if kickback { 30.0 } else { 25.0 }, clause);
        } else if issues > 0.0 {
            tally.add("quality_issues", if kickback { 20.0 } else { 10.0 }, clause);
        }
    }

    let documentation = req.flag("documentation_complete");
    let compliance = req.flag("regulatory_compliance");
    if documentation == Some(false) {
        tally.add("incomplete_documentation", 30.0, "incomplete shipping or customs documentation");
    }
    if compliance == Some(false) {
        tally.add("noncompliant", 35.0, "regulatory compliance issues");
    }
    if documentation == Some(true) && compliance == Some(true) {
        tally.add("documented", -5.0, "documentation and compliance in order");
    }

    if let Some(variance) = req.number("delivery_variance").map(f64::abs) {
        let clause = format!("delivery variance {variance:.1}%");
        if variance > 80.0 {
            tally.add("unreliable_delivery", 25.0, clause);
        } else if variance > 50.0 {
            tally.add("unreliable_delivery", 20.0, clause);
        } else if variance > 20.0 {
            tally.add("delivery_variance", 10.0, clause);
        } else if variance < 5.0 {
            tally.add("reliable_delivery", -5.0, "consistent delivery record");
        }
    }

    if let Some(order) = req.number("order_amount") {
        if order > 100_000.0 && supplier_age.is_some_and(|a| a < 30.0) {
            tally.add("large_order_new_supplier", 20.0, format!("{} order placed with a new supplier", money(order)));
        } else if order > 200_000.0 {
            tally.add("large_order", 10.0, format!("unusually large order ({})", money(order)));
        }
    }

    if mentions(CRITICAL_TERMS) {
        tally.add("kickback_indicators", 40.0, "order notes mention kickbacks, bribery or conflicts of interest");
    }
    if mentions(HIGH_RISK_TERMS) {
        tally.add("supplier_red_flags", 25.0, "order notes describe an unverified or suspicious supplier");
    }
    if mentions(MEDIUM_RISK_TERMS) {
        tally.add("irregular_order", 15.0, "order notes describe irregular activity");
    }
    if mentions(LEGITIMATE_TERMS) && tally.running_total() < 30.0 {
        tally.add("legitimate_history", -10.0, "order notes describe an established relationship");
    }
}

#[cfg(test)]
mod tests {
    use crate::scoring::tests::request;
    use crate::scoring::RuleScorer;
    use crate::types::Sector;
    use serde_json::json;

    #[test]
    fn test_kickback_scheme() {
        let score = RuleScorer::new().score(&request(
            Sector::SupplyChain,
            json!({
                "payment_terms": "ADVANCE",
                "supplier_age_days": 12,
                "price_variance": 45,
                "quality_issues": 3,
                "documentation_complete": false,
                "order_amount": 150000,
                "order_details": "Buyer has a personal relationship with supplier; kickback suspected"
            }),
        ));
        assert_eq!(score.value, 100.0);

        let inflation = score.factors.iter().find(|f| f.name == "price_inflation").unwrap();
        assert_eq!(inflation.weight, 40.0);
        let quality = score.factors.iter().find(|f| f.name == "quality_issues").unwrap();
        assert_eq!(quality.weight, 30.0);
    }

    #[test]
    fn test_established_supplier() {
        let score = RuleScorer::new().score(&request(
            Sector::SupplyChain,
            json!({
                "payment_terms": "NET30",
                "supplier_age_days": 2000,
                "price_variance": 2,
                "quality_issues": 0,
                "documentation_complete": true,
                "regulatory_compliance": true,
                "delivery_variance": 1,
                "order_details": "Regular replenishment from established vendor"
            }),
        ));
        assert_eq!(score.value, 0.0);
        assert_eq!(score.factors.last().map(|f| f.name), Some("legitimate_history"));
    }
}
