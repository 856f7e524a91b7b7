//! Deterministic pre-checks run before any paid model call
//!
//! Extreme or impossible values, and high-risk jurisdictions combined with
//! other red flags, short-circuit the fallback chain with a fixed verdict.

use crate::scoring::jurisdiction::{self, display_name};
use crate::scoring::money;
use crate::types::{FraudRequest, Sector};

/// Backend identifier reported for pre-check verdicts
pub const PRECHECK_BACKEND_ID: &str = "deterministic-precheck";

const MONETARY_FIELDS: &[&str] = &["amount", "claim_amount", "price", "listed_price", "market_price", "order_amount"];

/// A verdict reached without calling a model
#[derive(Debug, Clone, PartialEq)]
pub struct PrecheckHit {
    pub score: f64,
    pub risk_factors: Vec<String>,
    pub reasoning: String,
}

/// Run all pre-checks; the extreme-value check wins over jurisdiction screening
pub fn run(request: &FraudRequest) -> Option<PrecheckHit> {
    extreme_values(request).or_else(|| jurisdiction_red_flags(request))
}

fn extreme_values(request: &FraudRequest) -> Option<PrecheckHit> {
    let mut base: f64 = 0.0;
    let mut factors = Vec::new();

    match request.sector {
        Sector::Ecommerce => {
            let listed = request.number_any(&["listed_price", "price"]);
            let market = request.number("market_price");
            if let (Some(listed), Some(market)) = (listed, market) {
                if listed > 0.0 && market > 0.0 {
                    let ratio = listed / market;
                    let pct = (ratio - 1.0) * 100.0;
                    let tier = if ratio > 10.0 {
                        Some((95.0, "Extreme"))
                    } else if ratio > 5.0 {
                        Some((85.0, "High"))
                    } else if ratio > 2.0 {
                        Some((70.0, "Suspicious"))
                    } else {
                        None
                    };
                    if let Some((score, label)) = tier {
                        base = score;
                        factors.push(format!("{label} price markup: {pct:.0}% ({ratio:.1}x)"));
                    }
                }
            }
        }
        Sector::Banking => {
            let amount = request.number("amount").unwrap_or(0.0);
            let age = request.number("account_age_days");
            let young = |days: f64| age.is_some_and(|a| a < days);
            if amount > 1_000_000.0 && young(30.0) {
                base = 95.0;
                factors.push(format!("Extreme amount {} from new account", money(amount)));
            } else if amount > 500_000.0 && young(90.0) {
                base = 85.0;
                factors.push(format!("High amount {} from young account", money(amount)));
            } else if amount > 10_000_000.0 {
                base = 90.0;
                factors.push(format!("Extreme transaction amount: {}", money(amount)));
            }
        }
        Sector::SupplyChain => {
            if let Some(variance) = request.number("price_variance") {
                if variance > 500.0 {
                    base = 90.0;
                    factors.push(format!("Extreme price variance: {variance}%"));
                } else if variance > 300.0 {
                    base = 80.0;
                    factors.push(format!("High price variance: {variance}%"));
                }
            }
        }
        Sector::Medical => {}
    }

    for field in MONETARY_FIELDS {
        if let Some(value) = request.number(field).filter(|v| *v < 0.0) {
            base = base.max(85.0);
            factors.push(format!("Impossible negative value: {field} = {}", money(value)));
        }
    }

    if base < 70.0 || factors.is_empty() {
        return None;
    }

    let score = (base + 2.0 * factors.len() as f64).min(100.0);
    let reasoning = format!(
        "Extreme fraud pattern detected before model analysis: {}. Immediate manual review recommended.",
        factors.join("; ")
    );
    Some(PrecheckHit {
        score,
        risk_factors: factors,
        reasoning,
    })
}

fn jurisdiction_red_flags(request: &FraudRequest) -> Option<PrecheckHit> {
    let found = jurisdiction::screen(request);
    if found.is_empty() {
        return None;
    }

    let mut flags = Vec::new();
    if let Some(ip) = request.text("ip_address") {
        if ip.contains("vpn") || ip.contains("proxy") || ip.contains("tor") {
            flags.push("VPN/Proxy/TOR connection".to_string());
        }
    }
    for (field, label) in [
        ("kyc_verified", "Unverified KYC"),
        ("email_verified", "Unverified email"),
        ("documentation_complete", "Incomplete documentation"),
    ] {
        if request.flag(field) == Some(false) {
            flags.push(label.to_string());
        }
    }
    let age = request.number_any(&["account_age_days", "seller_age_days", "supplier_age_days"]);
    if let Some(days) = age.filter(|d| *d < 30.0) {
        flags.push(format!("New entity ({days:.0} days old)"));
    }

    if flags.len() < 2 {
        return None;
    }

    let score = (75.0 + (5.0 * flags.len() as f64).min(20.0)).min(100.0);
    let names: Vec<String> = found.iter().map(|j| display_name(j)).collect();
    let mut risk_factors = vec![format!("High-risk jurisdiction: {}", names.join(", "))];
    risk_factors.extend(flags);

    let reasoning = format!(
        "Activity involves a sanctioned or high-risk jurisdiction ({}) combined with additional red flags: {}.",
        names.join(", "),
        risk_factors[1..].join(", ")
    );
    Some(PrecheckHit {
        score,
        risk_factors,
        reasoning,
    })
}
