//! Defensive parsing of free-form model completions
//!
//! A completion either yields a validated score or a typed failure. There is
//! no default score: text without a recognisable score token is `Malformed`.

use crate::error::ProviderError;
use serde_json::{Map, Value};

/// Maximum explanation length kept from a completion
pub const MAX_REASONING_CHARS: usize = 1200;

/// Markers of a backend that answered with an error dump instead of analysis
const ERROR_INDICATORS: &[&str] = &[
    "CUDA error",
    "device-side assert",
    "Error processing claim",
    "Traceback (most recent call last)",
    "RuntimeError",
    "ValueError",
    "AttributeError",
    "TypeError",
];

/// A fraud-scoring completion that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCompletion {
    /// Clamped to [0, 100]
    pub score: f64,
    pub reasoning: String,
    pub risk_factors: Vec<String>,
}

/// Stage-1 clinical validity judgment; only ever used as prompt context
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalAssessment {
    pub legitimacy_score: Option<f64>,
    pub reasoning: String,
    pub risk_factors: Vec<String>,
}

impl ClinicalAssessment {
    /// Render the judgment as context for the reasoning stage
    pub fn as_context(&self) -> String {
        let score = self
            .legitimacy_score
            .map(|s| format!("{s:.0}/100"))
            .unwrap_or_else(|| "not stated".to_string());
        let factors = if self.risk_factors.is_empty() {
            "none reported".to_string()
        } else {
            self.risk_factors.join(", ")
        };
        format!(
            "Clinical legitimacy score: {score}\nClinical concerns: {factors}\nClinical assessment: {}",
            self.reasoning
        )
    }
}

/// Parse a fraud-scoring completion
pub fn parse_fraud_completion(text: &str) -> Result<ParsedCompletion, ProviderError> {
    reject_error_dump(text)?;

    let json = find_json_object(text, "fraud_score");
    let score = json
        .as_ref()
        .and_then(|obj| obj.get("fraud_score"))
        .and_then(json_number)
        .or_else(|| extract_score(text))
        .ok_or_else(|| ProviderError::Malformed(format!("no score in completion: {}", preview(text))))?;

    let reasoning = json
        .as_ref()
        .and_then(|obj| obj.get("reasoning"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| section_after(text, "reasoning:").unwrap_or(text).to_string());

    let risk_factors = json
        .as_ref()
        .and_then(|obj| obj.get("risk_factors"))
        .map(string_list)
        .unwrap_or_else(|| labelled_list(text, "risk_factors:").or_else(|| labelled_list(text, "risk factors:")).unwrap_or_default());

    Ok(ParsedCompletion {
        score: score.clamp(0.0, 100.0),
        reasoning: clean_reasoning(&reasoning),
        risk_factors,
    })
}

/// Parse a stage-1 clinical validity completion. The score is optional.
pub fn parse_clinical_completion(text: &str) -> Result<ClinicalAssessment, ProviderError> {
    reject_error_dump(text)?;
    if text.trim().is_empty() {
        return Err(ProviderError::Malformed("empty clinical assessment".to_string()));
    }

    let json = find_json_object(text, "clinical_legitimacy_score");
    let legitimacy_score = json
        .as_ref()
        .and_then(|obj| obj.get("clinical_legitimacy_score"))
        .and_then(json_number)
        .or_else(|| {
            let lower = text.to_lowercase();
            labelled_number(&lower, "clinical_legitimacy_score")
                .or_else(|| labelled_number(&lower, "clinical legitimacy score"))
                .or_else(|| out_of_hundred(&lower))
        })
        .map(|s| s.clamp(0.0, 100.0));

    let reasoning = json
        .as_ref()
        .and_then(|obj| obj.get("reasoning"))
        .and_then(Value::as_str)
        .unwrap_or(text);

    let risk_factors = json
        .as_ref()
        .and_then(|obj| obj.get("risk_factors"))
        .map(string_list)
        .unwrap_or_default();

    Ok(ClinicalAssessment {
        legitimacy_score,
        reasoning: clean_reasoning(reasoning),
        risk_factors,
    })
}

fn reject_error_dump(text: &str) -> Result<(), ProviderError> {
    match ERROR_INDICATORS.iter().find(|i| text.contains(*i)) {
        Some(indicator) => Err(ProviderError::Malformed(format!(
            "backend returned an error ({indicator}): {}",
            preview(text)
        ))),
        None => Ok(()),
    }
}

/// Score tokens in priority order: labelled fraud score, `score:`, `score of`, `n/100`
fn extract_score(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    labelled_number(&lower, "fraud_score")
        .or_else(|| labelled_number(&lower, "fraud score"))
        .or_else(|| labelled_number(&lower, "score"))
        .or_else(|| {
            lower
                .match_indices("score of ")
                .find_map(|(i, m)| leading_number(&lower[i + m.len()..]))
        })
        .or_else(|| out_of_hundred(&lower))
}

/// `<label>[quote|*]* : <number>`
fn labelled_number(lower: &str, label: &str) -> Option<f64> {
    lower.match_indices(label).find_map(|(i, m)| {
        let rest = lower[i + m.len()..].trim_start_matches(['"', '\'', '*', ' ']);
        let rest = rest.strip_prefix(':')?;
        leading_number(rest.trim_start_matches([' ', '*', '"', '\'']))
    })
}

/// `<number>/100` or `<number> out of 100`
fn out_of_hundred(lower: &str) -> Option<f64> {
    ["/100", " out of 100"].iter().find_map(|suffix| {
        lower.match_indices(suffix).find_map(|(i, _)| {
            let head = lower[..i].trim_end();
            let start = head
                .char_indices()
                .rev()
                .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
                .last()
                .map_or(head.len(), |(p, _)| p);
            head[start..].parse::<f64>().ok()
        })
    })
}

fn leading_number(s: &str) -> Option<f64> {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s),
    };
    let end = digits
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(digits.len());
    digits[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| sign * v)
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s.trim()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => split_list(s),
        _ => Vec::new(),
    }
}

fn split_list(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches(['[', ']'])
        .split(',')
        .map(|f| f.trim().trim_matches(['"', '\'', '*', ' ']).to_string())
        .filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case("none"))
        .collect()
}

/// The remainder of the line following a case-insensitive label
fn labelled_list(text: &str, label: &str) -> Option<Vec<String>> {
    let rest = section_after(text, label)?;
    let line = rest.lines().next().unwrap_or_default();
    Some(split_list(line))
}

/// Text following the first case-insensitive occurrence of `label`
fn section_after<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let lower = text.to_ascii_lowercase();
    let idx = lower.find(label)?;
    // ascii lowercasing preserves byte offsets
    Some(text[idx + label.len()..].trim_start())
}

/// First balanced `{...}` object in `text` that has `key`
fn find_json_object(text: &str, key: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let end = balanced_end(&text[start..])?;
        match serde_json::from_str::<Value>(&text[start..start + end]) {
            Ok(Value::Object(obj)) if obj.contains_key(key) => Some(obj),
            _ => None,
        }
    })
}

fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strip code fences and label lines, collapse whitespace, cut at a sentence boundary
pub fn clean_reasoning(text: &str) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut in_fence = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || is_label_line(trimmed) {
            continue;
        }
        kept.push_str(trimmed);
        kept.push(' ');
    }

    let collapsed = kept
        .replace('`', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut cleaned = collapsed.as_str();
    for prefix in ["reasoning:", "analysis:"] {
        if cleaned.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
            cleaned = cleaned[prefix.len()..].trim_start();
        }
    }

    truncate_at_sentence(cleaned, MAX_REASONING_CHARS)
}

fn is_label_line(line: &str) -> bool {
    let bare = line
        .trim_start_matches(['*', '#', '-', ' '])
        .to_ascii_lowercase()
        .replace(' ', "_");
    ["fraud_score", "risk_level", "risk_factors"]
        .iter()
        .any(|label| bare.starts_with(label))
}

fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];
    match head.rfind(['.', '!', '?']) {
        Some(end) if end > 150 => head[..=end].to_string(),
        _ => head.trim_end().to_string(),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}
