//! Sector prompt templates

use super::parsing::ClinicalAssessment;
use crate::retrieval::RetrievedPattern;
use crate::scoring::jurisdiction::{self, display_name};
use crate::types::{FraudRequest, Sector};
use std::fmt::Write;

/// Retrieved patterns shown to the model
const RAG_PATTERNS_IN_PROMPT: usize = 3;

const ANSWER_FORMAT: &str = "\
Format exactly as:
FRAUD_SCORE: [number from 0-100]
RISK_LEVEL: [LOW, MEDIUM, HIGH or CRITICAL]
RISK_FACTORS: [factor1, factor2, factor3]
REASONING: [3-4 complete sentences citing the specific red flags and how severe the combined risk is]
";

struct SectorTemplate {
    persona: &'static str,
    subject: &'static str,
    fields: &'static [(&'static str, &'static str)],
    guidelines: &'static str,
}

const BANKING: SectorTemplate = SectorTemplate {
    persona: "a senior financial fraud analyst with 15 years of experience",
    subject: "Transaction",
    fields: &[
        ("Transaction ID", "transaction_id"),
        ("Type", "transaction_type"),
        ("Amount", "amount"),
        ("Source Country", "source_country"),
        ("Destination Country", "destination_country"),
        ("Location", "location"),
        ("Account Age (days)", "account_age_days"),
        ("KYC Verified", "kyc_verified"),
        ("Previously Flagged", "previous_flagged"),
        ("Transaction Velocity (24h)", "transaction_velocity"),
        ("Time", "time"),
        ("Device", "device"),
        ("IP Address", "ip_address"),
        ("Sender Wallet", "sender_wallet"),
        ("Receiver Wallet", "receiver_wallet"),
    ],
    guidelines: "\
- High-risk or sanctioned countries: add 40-60 points
- VPN/Proxy/TOR detected: add 25-30 points
- Unverified KYC: add 15-20 points
- New account (< 30 days): add 20-30 points
- High transaction velocity (> 10/day): add 15-20 points
- Large amounts (> $10,000): add 15-25 points
- If 3+ red flags are present the score MUST be 70+",
};

const MEDICAL: SectorTemplate = SectorTemplate {
    persona: "a senior healthcare fraud investigator with 15 years of experience in medical billing fraud",
    subject: "Claim",
    fields: &[
        ("Claim ID", "claim_id"),
        ("Patient Age", "patient_age"),
        ("Provider ID", "provider_id"),
        ("Specialty", "specialty"),
        ("Diagnosis Codes", "diagnosis_codes"),
        ("Procedure Codes", "procedure_codes"),
        ("Procedures", "procedures"),
        ("Claim Amount", "claim_amount"),
        ("Average Peer Cost", "peer_average_cost"),
        ("Provider History", "provider_history"),
        ("Provider Verified", "provider_verified"),
        ("Claim Details", "claim_details"),
    ],
    guidelines: "\
- High-risk or sanctioned countries: add 40-60 points
- Unbundling (separating procedures that should be billed together): add 30-40 points
- Upcoding (billing for more expensive procedures): add 25-35 points
- Procedure/diagnosis mismatch: add 20-30 points
- Excessive claim amount (> $50,000): add 15-25 points
- If 3+ red flags are present the score MUST be 70+",
};

const ECOMMERCE: SectorTemplate = SectorTemplate {
    persona: "a senior e-commerce fraud analyst specialising in marketplace abuse",
    subject: "Order",
    fields: &[
        ("Order ID", "order_id"),
        ("Seller Age (days)", "seller_age_days"),
        ("Seller Verified", "seller_verified"),
        ("Listed Price", "price"),
        ("Listed Price", "listed_price"),
        ("Market Price", "market_price"),
        ("Payment Method", "payment_method"),
        ("Shipping Address", "shipping_address"),
        ("Billing Address", "billing_address"),
        ("Shipping Location", "shipping_location"),
        ("Email Verified", "email_verified"),
        ("IP Address", "ip_address"),
        ("Reviews", "reviews"),
        ("Description", "description"),
    ],
    guidelines: "\
- Price far below market (> 50% discount) or far above (> 2x): add 30-50 points
- New unverified seller (< 30 days): add 25-40 points
- Shipping/billing address mismatch: add 20-30 points
- Crypto, gift card or prepaid payment: add 15-20 points
- No reviews or uniformly perfect reviews: add 15-30 points
- If 3+ red flags are present the score MUST be 70+",
};

const SUPPLY_CHAIN: SectorTemplate = SectorTemplate {
    persona: "a senior procurement fraud investigator specialising in supplier risk",
    subject: "Purchase Order",
    fields: &[
        ("Order ID", "order_id"),
        ("Supplier", "supplier_name"),
        ("Supplier Age (days)", "supplier_age_days"),
        ("Supplier Location", "supplier_location"),
        ("Order Amount", "order_amount"),
        ("Payment Terms", "payment_terms"),
        ("Price Variance (%)", "price_variance"),
        ("Delivery Variance (%)", "delivery_variance"),
        ("Quality Issues", "quality_issues"),
        ("Documentation Complete", "documentation_complete"),
        ("Regulatory Compliance", "regulatory_compliance"),
        ("Order Details", "order_details"),
    ],
    guidelines: "\
- Advance payment to a new supplier: add 30-40 points
- Price variance above 30% of market: add 25-35 points
- Missing documentation or compliance: add 25-35 points
- Kickback, bribery or personal-relationship indicators: add 35-45 points
- Repeated quality issues: add 10-30 points
- If 3+ red flags are present the score MUST be 70+",
};

fn template(sector: Sector) -> &'static SectorTemplate {
    match sector {
        Sector::Banking => &BANKING,
        Sector::Medical => &MEDICAL,
        Sector::Ecommerce => &ECOMMERCE,
        Sector::SupplyChain => &SUPPLY_CHAIN,
    }
}

/// Single-stage fraud prompt for any sector
pub fn fraud_prompt(request: &FraudRequest, patterns: &[RetrievedPattern]) -> String {
    let t = template(request.sector);
    let mut prompt = format!(
        "You are {}. Analyze this {} and provide a professional assessment in plain English. \
         Do NOT generate code.\n",
        t.persona,
        t.subject.to_lowercase()
    );

    prompt.push_str(&rag_section(patterns));
    prompt.push_str(&red_flag_section(request));

    let _ = writeln!(prompt, "\n{} Details:", t.subject);
    prompt.push_str(&field_lines(request, t.fields));

    let _ = writeln!(prompt, "\nSCORING GUIDELINES:\n{}\n", t.guidelines);
    prompt.push_str(ANSWER_FORMAT);
    prompt
}

/// Stage-1 prompt: clinical coherence only, answered as JSON
pub fn clinical_prompt(request: &FraudRequest, patterns: &[RetrievedPattern]) -> String {
    let mut prompt = String::from(
        "You are a medical expert validating the CLINICAL LEGITIMACY of a medical claim.\n\
         Assess whether the diagnoses, procedures and treatments are medically coherent and plausible.\n\
         Do NOT analyze fraud patterns or billing behaviour.\n\n\
         Medical Claim Details:\n",
    );
    prompt.push_str(&field_lines(request, MEDICAL.fields));
    prompt.push_str(&rag_section(patterns));
    prompt.push_str(
        "\nClinical Validation Checklist:\n\
         1. Are the diagnosis and procedure codes medically aligned?\n\
         2. Is the provider specialty appropriate for the procedures?\n\
         3. Is the treatment appropriate for the patient's age?\n\
         4. Does the diagnosis justify the procedures?\n\n\
         Respond with JSON only:\n\
         {\n  \"clinical_legitimacy_score\": <0-100, 0 = medically impossible, 100 = fully coherent>,\n  \
         \"reasoning\": \"<clinical reasoning>\",\n  \
         \"risk_factors\": [\"<clinical red flags, if any>\"]\n}\n",
    );
    prompt
}

/// Stage-2 prompt: fraud reasoning informed by the clinical judgment
pub fn reasoning_prompt(
    request: &FraudRequest,
    patterns: &[RetrievedPattern],
    clinical: &ClinicalAssessment,
) -> String {
    let mut prompt = String::from(
        "You are a medical fraud detection expert. A clinical reviewer has already assessed this claim.\n\
         Analyze it for FRAUD PATTERNS, BILLING ANOMALIES and COST MANIPULATION.\n\n\
         Stage 1 Clinical Validation:\n",
    );
    prompt.push_str(&clinical.as_context());
    prompt.push_str("\n\nMedical Claim Details:\n");
    prompt.push_str(&field_lines(request, MEDICAL.fields));
    prompt.push_str(&rag_section(patterns));
    prompt.push_str(&red_flag_section(request));
    let _ = writeln!(
        prompt,
        "\nA low clinical legitimacy score is strong evidence of fraud.\n\nSCORING GUIDELINES:\n{}\n",
        MEDICAL.guidelines
    );
    prompt.push_str(ANSWER_FORMAT);
    prompt
}

fn field_lines(request: &FraudRequest, fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .filter(|(_, key)| request.get(key).is_some())
        .map(|(label, key)| format!("- {label}: {}\n", request.display(key)))
        .collect()
}

/// Top retrieved patterns as `N. [LABEL] text (similarity: 0.xx)`
pub fn rag_section(patterns: &[RetrievedPattern]) -> String {
    if patterns.is_empty() {
        return String::new();
    }

    let mut section = String::from("\nCONTEXT FROM SIMILAR FRAUD PATTERNS:\n");
    for (i, p) in patterns.iter().take(RAG_PATTERNS_IN_PROMPT).enumerate() {
        let _ = writeln!(
            section,
            "{}. [{}] {} (similarity: {:.2})",
            i + 1,
            p.pattern_label.as_upper(),
            p.pattern_text,
            p.similarity
        );
    }
    section.push_str("Use this context to inform your analysis, but score the specific details below.\n");
    section
}

fn red_flag_section(request: &FraudRequest) -> String {
    let mut flags = String::new();

    let jurisdictions = jurisdiction::screen(request);
    if !jurisdictions.is_empty() {
        let names: Vec<String> = jurisdictions.iter().map(|j| display_name(j)).collect();
        let _ = writeln!(
            flags,
            "WARNING: SANCTIONED/HIGH-RISK JURISDICTION DETECTED - {}. This is a major red flag requiring review.",
            names.join(", ")
        );
    }

    if let Some(ip) = request.text("ip_address") {
        if ip.contains("vpn") || ip.contains("proxy") || ip.contains("tor") {
            flags.push_str("WARNING: VPN/Proxy/TOR detected - a high-risk indicator.\n");
        }
    }

    if flags.is_empty() {
        flags
    } else {
        format!("\nCRITICAL FRAUD INDICATORS:\n{flags}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::PatternLabel;
    use serde_json::json;

    fn request(sector: Sector, data: serde_json::Value) -> FraudRequest {
        FraudRequest::new(sector, data.as_object().cloned().unwrap())
    }

    fn pattern(similarity: f64, label: PatternLabel, text: &str) -> RetrievedPattern {
        RetrievedPattern {
            similarity,
            pattern_text: text.to_string(),
            pattern_label: label,
            sector: Sector::Banking,
        }
    }

    #[test]
    fn test_rag_section_shows_top_three() {
        let patterns = vec![
            pattern(0.91, PatternLabel::Fraud, "Mule account cash-out"),
            pattern(0.82, PatternLabel::Legitimate, "Payroll transfer"),
            pattern(0.75, PatternLabel::Fraud, "Crypto mixer"),
            pattern(0.61, PatternLabel::Fraud, "Never shown"),
        ];
        let section = rag_section(&patterns);
        assert!(section.contains("1. [FRAUD] Mule account cash-out (similarity: 0.91)"));
        assert!(section.contains("2. [LEGITIMATE] Payroll transfer (similarity: 0.82)"));
        assert!(section.contains("3. [FRAUD] Crypto mixer"));
        assert!(!section.contains("Never shown"));
        assert!(rag_section(&[]).is_empty());
    }

    #[test]
    fn test_banking_prompt_lists_present_fields() {
        let req = request(
            Sector::Banking,
            json!({ "amount": 9000, "destination_country": "North Korea", "ip_address": "tor exit" }),
        );
        let prompt = fraud_prompt(&req, &[]);
        assert!(prompt.contains("- Amount: 9000"));
        assert!(prompt.contains("North Korea"));
        assert!(prompt.contains("HIGH-RISK JURISDICTION DETECTED - North Korea"));
        assert!(prompt.contains("VPN/Proxy/TOR detected"));
        assert!(!prompt.contains("Sender Wallet"));
        assert!(prompt.contains("FRAUD_SCORE: [number"));
    }

    #[test]
    fn test_two_stage_prompts() {
        let req = request(
            Sector::Medical,
            json!({ "claim_amount": 48000, "diagnosis_codes": ["J06.9"], "procedure_codes": ["27447"] }),
        );
        let stage1 = clinical_prompt(&req, &[]);
        assert!(stage1.contains("clinical_legitimacy_score"));
        assert!(stage1.contains("- Procedure Codes: 27447"));

        let clinical = ClinicalAssessment {
            legitimacy_score: Some(12.0),
            reasoning: "Knee replacement for a cold is implausible.".to_string(),
            risk_factors: vec!["diagnosis mismatch".to_string()],
        };
        let stage2 = reasoning_prompt(&req, &[], &clinical);
        assert!(stage2.contains("Clinical legitimacy score: 12/100"));
        assert!(stage2.contains("Knee replacement for a cold is implausible."));
        assert!(stage2.contains("REASONING:"));
    }
}
