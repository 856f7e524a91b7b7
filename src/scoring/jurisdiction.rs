//! High-risk jurisdiction screening

use crate::types::{FraudRequest, Sector};

/// Sanctioned and high-risk fraud jurisdictions, matched as lowercase substrings.
///
/// More specific names come before names they contain ("south sudan" before
/// "sudan") so the reported match is the most precise one.
pub const HIGH_RISK_JURISDICTIONS: &[&str] = &[
    "cuba",
    "iran",
    "north korea",
    "syria",
    "crimea",
    "donetsk",
    "luhansk",
    "russia",
    "belarus",
    "venezuela",
    "myanmar",
    "burma",
    "south sudan",
    "sudan",
    "libya",
    "yemen",
    "somalia",
    "central african republic",
    "democratic republic of congo",
    "congo",
    "zimbabwe",
    "mali",
    "burkina faso",
    "niger",
    "nigeria",
    "ghana",
    "cameroon",
    "ivory coast",
    "senegal",
    "togo",
    "benin",
    "philippines",
    "indonesia",
    "malaysia",
    "thailand",
    "vietnam",
    "pakistan",
    "bangladesh",
    "romania",
    "bulgaria",
    "ukraine",
    "moldova",
    "albania",
    "serbia",
    "bosnia",
    "macedonia",
    "montenegro",
    "kosovo",
    "west africa",
    "east africa",
    "balkans",
    "eastern europe",
];

/// Payload fields that carry location information for a sector
pub fn location_fields(sector: Sector) -> &'static [&'static str] {
    match sector {
        Sector::Banking => &["source_country", "destination_country", "location"],
        Sector::Medical => &[
            "provider_location",
            "patient_location",
            "billing_address",
            "service_location",
        ],
        Sector::Ecommerce => &[
            "shipping_location",
            "shipping_address",
            "billing_address",
            "origin_country",
        ],
        Sector::SupplyChain => &[
            "supplier_location",
            "supplier_country",
            "origin_country",
            "shipping_location",
            "billing_address",
        ],
    }
}

/// Find the most specific high-risk jurisdiction mentioned in `text`
pub fn match_jurisdiction(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    // "nigeria" contains "niger"; prefer the longest match
    HIGH_RISK_JURISDICTIONS
        .iter()
        .filter(|j| contains_word(&lower, j))
        .max_by_key(|j| j.len())
        .copied()
}

/// Distinct high-risk jurisdictions found across the sector's location fields
pub fn screen(request: &FraudRequest) -> Vec<&'static str> {
    let mut found: Vec<&'static str> = Vec::new();
    for field in location_fields(request.sector) {
        if let Some(text) = request.text(field) {
            if let Some(j) = match_jurisdiction(&text) {
                if !found.contains(&j) {
                    found.push(j);
                }
            }
        }
    }
    found
}

/// Title-case a jurisdiction name for display
pub fn display_name(jurisdiction: &str) -> String {
    jurisdiction
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_match_prefers_specific_name() {
        assert_eq!(match_jurisdiction("Lagos, Nigeria"), Some("nigeria"));
        assert_eq!(match_jurisdiction("Niamey, NIGER"), Some("niger"));
        assert_eq!(match_jurisdiction("Juba, South Sudan"), Some("south sudan"));
        assert_eq!(match_jurisdiction("Toronto, Canada"), None);
    }

    #[test]
    fn test_match_respects_word_boundaries() {
        // "mali" inside "somalia" must not match on its own
        assert_eq!(match_jurisdiction("Mogadishu, Somalia"), Some("somalia"));
        assert_eq!(match_jurisdiction("Somaliland Trading Co"), None);
    }

    #[test]
    fn test_screen_deduplicates_across_fields() {
        let data = json!({
            "supplier_location": "Minsk, Belarus",
            "origin_country": "belarus",
            "shipping_location": "Kyiv, Ukraine",
            "billing_address": "Delaware, USA"
        });
        let req = FraudRequest::new(Sector::SupplyChain, data.as_object().cloned().unwrap());
        assert_eq!(screen(&req), vec!["belarus", "ukraine"]);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("north korea"), "North Korea");
        assert_eq!(display_name("iran"), "Iran");
    }
}
