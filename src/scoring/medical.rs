//! Medical claim heuristics

use super::{money, Tally};
use crate::types::FraudRequest;

pub(super) fn score(req: &FraudRequest, tally: &mut Tally) {
    let claim = req.number("claim_amount");
    if let Some(amount) = claim {
        let clause = |limit: f64| format!("claim amount {} exceeds {}", money(amount), money(limit));
        if amount > 100_000.0 {
            tally.add("very_high_claim", 35.0, clause(100_000.0));
        } else if amount > 50_000.0 {
            tally.add("high_claim", 25.0, clause(50_000.0));
        } else if amount > 20_000.0 {
            tally.add("elevated_claim", 15.0, clause(20_000.0));
        } else if amount < 1_000.0 {
            tally.add("small_claim", -5.0, format!("small claim amount ({})", money(amount)));
        }
    }

    if let (Some(amount), Some(norm)) = (
        claim,
        req.number_any(&["specialty_average_claim", "peer_average_cost"]),
    ) {
        if norm > 0.0 {
            let ratio = amount / norm;
            if ratio > 3.0 {
                tally.add(
                    "claim_above_specialty_norm",
                    25.0,
                    format!("claim is {ratio:.1}x the specialty average of {}", money(norm)),
                );
            } else if ratio > 2.0 {
                tally.add(
                    "claim_above_specialty_norm",
                    15.0,
                    format!("claim is {ratio:.1}x the specialty average of {}", money(norm)),
                );
            }
        }
    }

    let procedures = req.items("procedures").or_else(|| req.items("procedure_codes"));
    if let Some(count) = procedures.as_ref().map(Vec::len) {
        if count > 10 {
            tally.add("excessive_procedures", 30.0, format!("{count} procedures billed in a single claim"));
        } else if count > 5 {
            tally.add("many_procedures", 20.0, format!("{count} procedures billed in a single claim"));
        }
    }

    let diagnoses = req.items("diagnosis_codes").map(|d| d.len());
    if let (Some(diagnoses), Some(procedures)) = (diagnoses, procedures.map(|p| p.len())) {
        if diagnoses > 0 && procedures > diagnoses * 3 {
            tally.add(
                "code_count_mismatch",
                20.0,
                format!("{procedures} procedure codes against only {diagnoses} diagnosis codes"),
            );
        }
    }

    if let Some(history) = req.text("provider_history") {
        if history.contains("flagged") || history.contains("suspended") {
            tally.add("flagged_provider", 45.0, "provider has previous fraud flags or suspensions");
        } else if history.contains("clean") || history.contains("verified") {
            tally.add("clean_provider", -5.0, "provider history is clean");
        }
    }

    if req.flag("diagnosis_mismatch") == Some(true) {
        tally.add("diagnosis_mismatch", 40.0, "diagnosis does not support the billed procedures");
    }

    if req.flag("provider_verified") == Some(false) {
        tally.add("unverified_provider", 25.0, "provider identity not verified");
    }
}
