//! Banking and crypto transfer heuristics

use super::jurisdiction::{display_name, match_jurisdiction};
use super::{money, Tally};
use crate::types::FraudRequest;

const HIGH_RISK_LOCATIONS: &[&str] = &["nigeria", "russia", "china", "unknown", "cayman islands"];
const BURN_ADDRESS: &str = "0000000000000000000000000000000000000000";

pub(super) fn score(req: &FraudRequest, tally: &mut Tally) {
    if let Some(amount) = req.number("amount") {
        let clause = |limit: f64| format!("transaction amount {} exceeds {}", money(amount), money(limit));
        if amount > 100_000.0 {
            tally.add("very_high_amount", 30.0, clause(100_000.0));
        } else if amount > 50_000.0 {
            tally.add("high_amount", 20.0, clause(50_000.0));
        } else if amount > 10_000.0 {
            tally.add("elevated_amount", 15.0, clause(10_000.0));
        } else if amount > 5_000.0 {
            tally.add("moderate_amount", 10.0, clause(5_000.0));
        } else if amount < 1_000.0 {
            tally.add("small_amount", -10.0, format!("small transaction amount ({})", money(amount)));
        }
    }

    location_risk(req, tally);

    if let Some(ip) = req.text("ip_address") {
        if ip.contains("tor") || ip.contains("vpn detected") {
            tally.add("anonymized_network", 25.0, "connection through TOR or VPN");
        } else if ip.contains("unknown") {
            tally.add("unknown_network", 15.0, "unidentifiable network origin");
        }
    }

    if let Some(device) = req.text("device") {
        if device.contains("new") || device.contains("unknown") || device.contains("unrecognized") {
            tally.add("new_device", 15.0, "new or unrecognized device");
        }
    }

    if let Some(kind) = req.text("transaction_type") {
        if kind.contains("crypto") || kind.contains("nft") {
            tally.add("crypto_transfer", 15.0, format!("{kind} transaction type"));
        }
    }

    let time = req.text("time").or_else(|| req.text("transaction_time"));
    if let Some(time) = time {
        match parse_hour(&time) {
            Some(hour) if hour < 6 => {
                tally.add("odd_hour", 15.0, format!("transaction at {time}, between midnight and 6 AM"))
            }
            Some(hour) if hour >= 22 => tally.add("late_hour", 10.0, format!("late-night transaction at {time}")),
            Some(_) => {}
            None => {
                if ["night", "midnight", "late", "early"].iter().any(|t| time.contains(t)) {
                    tally.add("odd_hour", 15.0, format!("transaction during {time}"));
                }
            }
        }
    }

    if let Some(age) = req.number("account_age_days") {
        let days = age.max(0.0) as u64;
        if age < 1.0 {
            tally.add("brand_new_account", 30.0, "account opened less than a day ago");
        } else if age < 7.0 {
            tally.add("new_account", 25.0, format!("account age only {days} days"));
        } else if age < 30.0 {
            tally.add("young_account", 15.0, format!("account age only {days} days"));
        } else if age < 90.0 {
            tally.add("recent_account", 5.0, format!("account less than 90 days old ({days} days)"));
        } else if age >= 730.0 {
            tally.add("established_account", -15.0, format!("established account ({days} days)"));
        } else if age >= 365.0 {
            tally.add("mature_account", -10.0, format!("account older than a year ({days} days)"));
        }
    }

    if let Some(velocity) = req.number("transaction_velocity") {
        let clause = format!("{velocity:.0} transactions in the recent window");
        if velocity > 20.0 {
            tally.add("velocity_spike", 25.0, clause);
        } else if velocity > 10.0 {
            tally.add("high_velocity", 15.0, clause);
        } else if velocity > 5.0 {
            tally.add("elevated_velocity", 5.0, clause);
        } else if velocity <= 2.0 {
            tally.add("normal_velocity", -5.0, clause);
        }
    }

    match req.flag("kyc_verified") {
        Some(true) => tally.add("kyc_verified", -20.0, "KYC verification completed"),
        Some(false) => tally.add("kyc_missing", 25.0, "KYC verification not completed"),
        None => {}
    }

    if req.flag("previous_flagged") == Some(true) {
        tally.add("previously_flagged", 30.0, "account previously flagged for fraud");
    }

    let sender = req.text("sender_wallet");
    let receiver = req.text("receiver_wallet").unwrap_or_default();
    if let Some(sender) = sender {
        if sender.contains(BURN_ADDRESS) || receiver.contains("tornado") {
            tally.add("blocklisted_wallet", 40.0, "wallet matches burn-address or mixer pattern");
        }
    }
}

fn location_risk(req: &FraudRequest, tally: &mut Tally) {
    let fields = ["location", "source_country", "destination_country"];
    let values: Vec<String> = fields.iter().filter_map(|f| req.text(f)).collect();

    let legacy = values
        .iter()
        .find_map(|v| HIGH_RISK_LOCATIONS.iter().find(|loc| v.contains(*loc)).copied());
    let screened = values.iter().find_map(|v| match_jurisdiction(v));

    if let Some(place) = screened.or(legacy) {
        tally.add(
            "high_risk_country_pair",
            30.0,
            format!("funds routed through high-risk location ({})", display_name(place)),
        );
    } else if req
        .text("location")
        .into_iter()
        .chain(req.text("source_country"))
        .any(|v| v.contains("united states"))
    {
        tally.add("domestic_us", -5.0, "domestic US transaction");
    }
}

/// Hour of day from `HH:MM`, `HH:MM:SS` or an ISO-8601 timestamp
fn parse_hour(time: &str) -> Option<u32> {
    let clock = time.split(['t', ' ']).find(|token| token.contains(':'))?;
    let hour: u32 = clock.split(':').next()?.trim().parse().ok()?;
    if hour > 23 {
        return None;
    }
    let pm = time.contains("pm") && hour < 12;
    let am_midnight = time.contains("am") && hour == 12;
    Some(match (pm, am_midnight) {
        (true, _) => hour + 12,
        (_, true) => 0,
        _ => hour,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tests::request;
    use crate::scoring::RuleScorer;
    use crate::types::Sector;
    use serde_json::json;

    fn names(data: serde_json::Value) -> (f64, Vec<&'static str>) {
        let score = RuleScorer::new().score(&request(Sector::Banking, data));
        (score.value, score.factors.iter().map(|f| f.name).collect())
    }

    #[test]
    fn test_parse_hour() {
        assert_eq!(parse_hour("02:45"), Some(2));
        assert_eq!(parse_hour("23:15:09"), Some(23));
        assert_eq!(parse_hour("2024-03-01t04:10:00z"), Some(4));
        assert_eq!(parse_hour("11:30 pm"), Some(23));
        assert_eq!(parse_hour("late night"), None);
    }

    #[test]
    fn test_suspicious_transfer() {
        let (value, factors) = names(json!({
            "amount": 150000,
            "source_country": "United States",
            "destination_country": "Cayman Islands",
            "ip_address": "VPN detected",
            "transaction_type": "crypto",
            "time": "03:00",
            "account_age_days": 2,
            "transaction_velocity": 25,
            "kyc_verified": false
        }));
        assert_eq!(value, 100.0);
        assert!(factors.contains(&"high_risk_country_pair"));
        assert!(factors.contains(&"anonymized_network"));
        assert!(factors.contains(&"odd_hour"));
        assert!(factors.contains(&"velocity_spike"));
    }

    #[test]
    fn test_legitimate_transfer() {
        let (value, factors) = names(json!({
            "amount": 250,
            "location": "Chicago, United States",
            "time": "14:20",
            "account_age_days": 1200,
            "transaction_velocity": 1,
            "kyc_verified": true
        }));
        assert_eq!(value, 0.0);
        assert!(factors.contains(&"established_account"));
        assert!(factors.contains(&"domestic_us"));
    }

    #[test]
    fn test_sanctioned_destination_uses_screening_list() {
        let (value, factors) = names(json!({
            "amount": 20000,
            "destination_country": "Iran",
            "kyc_verified": true
        }));
        assert_eq!(factors, vec!["elevated_amount", "high_risk_country_pair", "kyc_verified"]);
        assert_eq!(value, 25.0);
    }

    #[test]
    fn test_wallet_blocklist() {
        let (_, factors) = names(json!({
            "sender_wallet": "0x0000000000000000000000000000000000000000",
            "receiver_wallet": "0xabc"
        }));
        assert_eq!(factors, vec!["blocklisted_wallet"]);

        let (_, factors) = names(json!({
            "sender_wallet": "0x1234",
            "receiver_wallet": "tornado.cash router"
        }));
        assert_eq!(factors, vec!["blocklisted_wallet"]);
    }
}
