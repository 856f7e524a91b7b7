//! Incoming fraud-detection request structures

use crate::error::DetectError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Supported fraud domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Banking,
    Medical,
    Ecommerce,
    SupplyChain,
}

impl Sector {
    /// All sectors in routing-table order
    pub const ALL: [Sector; 4] = [
        Sector::Banking,
        Sector::Medical,
        Sector::Ecommerce,
        Sector::SupplyChain,
    ];

    /// Wire name of the sector (also the index partition name)
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Banking => "banking",
            Sector::Medical => "medical",
            Sector::Ecommerce => "ecommerce",
            Sector::SupplyChain => "supply_chain",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "banking" => Ok(Sector::Banking),
            "medical" => Ok(Sector::Medical),
            "ecommerce" => Ok(Sector::Ecommerce),
            "supply_chain" => Ok(Sector::SupplyChain),
            other => Err(DetectError::InvalidSector(other.to_string())),
        }
    }
}

/// Request body as it arrives on the wire, before validation
#[derive(Debug, Clone, Deserialize)]
struct WireRequest {
    sector: Option<String>,
    data: Option<Value>,
}

/// A validated fraud-detection request.
///
/// The payload is kept as a loose JSON object: upstream schemas are not
/// strictly typed, so heuristics read fields through the lenient accessors
/// below and treat anything missing or unparseable as absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudRequest {
    pub sector: Sector,
    #[serde(rename = "data")]
    pub payload: Map<String, Value>,
}

impl FraudRequest {
    /// Create a request from an already-typed sector and payload
    pub fn new(sector: Sector, payload: Map<String, Value>) -> Self {
        Self { sector, payload }
    }

    /// Parse and validate a raw JSON request body
    pub fn from_json(bytes: &[u8]) -> Result<Self, DetectError> {
        let wire: WireRequest = serde_json::from_slice(bytes)
            .map_err(|e| DetectError::MalformedRequest(e.to_string()))?;

        let sector = wire
            .sector
            .ok_or(DetectError::MissingField("sector"))?
            .parse::<Sector>()?;

        match wire.data {
            Some(Value::Object(payload)) => Ok(Self { sector, payload }),
            Some(other) => Err(DetectError::InvalidPayload(format!(
                "`data` must be an object, got {}",
                json_kind(&other)
            ))),
            None => Err(DetectError::MissingField("data")),
        }
    }

    /// Raw field access
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key).filter(|v| !v.is_null())
    }

    /// Numeric field; numeric strings ("5000", "$5,000.00") are accepted
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            Value::String(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| !matches!(c, '$' | ',' | '%'))
                    .collect();
                cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }

    /// First present numeric field among `keys`
    pub fn number_any(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.number(k))
    }

    /// Boolean field; "true"/"yes"/"1" strings and 0/1 numbers are accepted
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Field rendered as lowercase text; empty strings count as absent
    pub fn text(&self, key: &str) -> Option<String> {
        let rendered = match self.get(key)? {
            Value::String(s) => s.trim().to_lowercase(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string().to_lowercase(),
        };
        (!rendered.is_empty()).then_some(rendered)
    }

    /// Field rendered as it was sent, for prompts and explanations
    pub fn display(&self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Some(other) => other.to_string(),
            None => "N/A".to_string(),
        }
    }

    /// List field: JSON arrays or comma-separated strings
    pub fn items(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.trim().to_string(),
                        other => other.to_string(),
                    })
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Deterministic text rendering of the payload used as the retrieval query
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("sector: {}", self.sector)];
        // serde_json's default map is ordered by key, so this is stable
        for (key, value) in &self.payload {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("{key}: {rendered}"));
        }
        lines.join("\n")
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(data: Value) -> FraudRequest {
        let body = json!({ "sector": "banking", "data": data });
        FraudRequest::from_json(body.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_valid_request() {
        let req = request(json!({ "amount": 5000, "kyc_verified": true }));
        assert_eq!(req.sector, Sector::Banking);
        assert_eq!(req.number("amount"), Some(5000.0));
        assert_eq!(req.flag("kyc_verified"), Some(true));
    }

    #[test]
    fn test_unknown_sector_rejected() {
        let body = json!({ "sector": "insurance", "data": {} }).to_string();
        let err = FraudRequest::from_json(body.as_bytes()).unwrap_err();
        assert!(matches!(err, DetectError::InvalidSector(s) if s == "insurance"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let err = FraudRequest::from_json(br#"{"data": {}}"#).unwrap_err();
        assert!(matches!(err, DetectError::MissingField("sector")));

        let err = FraudRequest::from_json(br#"{"sector": "medical"}"#).unwrap_err();
        assert!(matches!(err, DetectError::MissingField("data")));

        let err = FraudRequest::from_json(br#"{"sector": "medical", "data": [1]}"#).unwrap_err();
        assert!(matches!(err, DetectError::InvalidPayload(_)));

        let err = FraudRequest::from_json(b"not json").unwrap_err();
        assert!(matches!(err, DetectError::MalformedRequest(_)));
    }

    #[test]
    fn test_lenient_accessors() {
        let req = request(json!({
            "amount": "$12,500.50",
            "kyc_verified": "no",
            "procedures": "99213, 99214,,93000",
            "reviews": ["great", "scam!"],
            "location": "  Lagos, Nigeria ",
            "bogus": "n/a",
            "nothing": null
        }));

        assert_eq!(req.number("amount"), Some(12500.5));
        assert_eq!(req.number("bogus"), None);
        assert_eq!(req.flag("kyc_verified"), Some(false));
        assert_eq!(req.items("procedures").map(|p| p.len()), Some(3));
        assert_eq!(req.items("reviews").map(|r| r.len()), Some(2));
        assert_eq!(req.text("location").as_deref(), Some("lagos, nigeria"));
        assert_eq!(req.get("nothing"), None);
        assert_eq!(req.display("missing"), "N/A");
    }

    #[test]
    fn test_summary_is_stable() {
        let a = request(json!({ "b": 1, "a": "x" }));
        let b = request(json!({ "a": "x", "b": 1 }));
        assert_eq!(a.summary(), b.summary());
        assert!(a.summary().starts_with("sector: banking\na: x"));
    }
}
