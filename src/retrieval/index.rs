//! Vector index client

use super::{PatternLabel, RetrievedPattern};
use crate::error::IndexError;
use crate::types::Sector;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

/// Similarity search over historical fraud cases
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top `top_k` matches for `vector` within the `sector` partition
    async fn query(&self, sector: Sector, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedPattern>, IndexError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    filter: Value,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    metadata: Map<String, Value>,
}

/// REST client for a Pinecone-style `query` endpoint
#[derive(Clone)]
pub struct HttpVectorIndex {
    client: Client,
    host: String,
    api_key: String,
    namespace: String,
}

impl HttpVectorIndex {
    pub fn new(host: &str, api_key: String, namespace: &str, timeout: Duration) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Unavailable(e.to_string()))?;

        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        Ok(Self {
            client,
            host,
            api_key,
            namespace: namespace.to_string(),
        })
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn query(&self, sector: Sector, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedPattern>, IndexError> {
        let body = QueryRequest {
            vector,
            top_k,
            namespace: &self.namespace,
            filter: json!({ "sector": { "$eq": sector.as_str() } }),
            include_metadata: true,
        };

        let resp = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IndexError::Unavailable(format!("HTTP {status}")));
        }

        let parsed: QueryResponse = resp
            .json()
            .await
            .map_err(|e| IndexError::Malformed(e.to_string()))?;
        let total = parsed.matches.len();

        let patterns: Vec<RetrievedPattern> = parsed
            .matches
            .into_iter()
            .filter_map(|m| to_pattern(m, sector))
            .collect();

        debug!(sector = %sector, matches = total, kept = patterns.len(), "Vector index query complete");
        Ok(patterns)
    }
}

/// Drops matches from another partition or without any text
fn to_pattern(m: QueryMatch, sector: Sector) -> Option<RetrievedPattern> {
    let matched_sector: Sector = m.metadata.get("sector")?.as_str()?.parse().ok()?;
    if matched_sector != sector {
        return None;
    }

    let text = ["description", "text", "pattern"]
        .iter()
        .find_map(|k| m.metadata.get(*k).and_then(Value::as_str))
        .filter(|t| !t.trim().is_empty())?;

    let label = m
        .metadata
        .get("label")
        .or_else(|| m.metadata.get("risk_level"))
        .and_then(Value::as_str)
        .map(PatternLabel::from_metadata)
        .unwrap_or(PatternLabel::Fraud);

    Some(RetrievedPattern {
        similarity: m.score.clamp(0.0, 1.0),
        pattern_text: text.to_string(),
        pattern_label: label,
        sector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_query_filters_by_sector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(header("api-key", "pc-key"))
            .and(body_partial_json(json!({
                "topK": 5,
                "namespace": "rag",
                "includeMetadata": true,
                "filter": { "sector": { "$eq": "banking" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    { "id": "1", "score": 0.92, "metadata": { "sector": "banking", "description": "Mule account", "risk_level": "high" } },
                    { "id": "2", "score": 0.88, "metadata": { "sector": "medical", "description": "Upcoding" } },
                    { "id": "3", "score": 0.70, "metadata": { "sector": "banking", "text": "Salary deposit", "label": "legitimate" } },
                    { "id": "4", "score": 0.65, "metadata": { "description": "No sector" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(&server.uri(), "pc-key".to_string(), "rag", Duration::from_secs(2)).unwrap();
        let patterns = index.query(Sector::Banking, &[0.1, 0.2], 5).await.unwrap();

        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].pattern_text, "Mule account");
        assert_eq!(patterns[0].pattern_label, PatternLabel::Fraud);
        assert_eq!(patterns[1].pattern_label, PatternLabel::Legitimate);
    }

    #[tokio::test]
    async fn test_query_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(&server.uri(), "k".to_string(), "rag", Duration::from_secs(2)).unwrap();
        let err = index.query(Sector::Medical, &[0.0], 5).await.unwrap_err();
        assert!(matches!(err, IndexError::Unavailable(_)));
    }

    #[test]
    fn test_bare_host_gets_https() {
        let index = HttpVectorIndex::new("idx.pinecone.io/", "k".to_string(), "rag", Duration::from_secs(1)).unwrap();
        assert_eq!(index.host, "https://idx.pinecone.io");
    }
}
