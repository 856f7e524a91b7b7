//! Query embedding

use crate::error::IndexError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::warn;

/// Turns request text into a fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;
}

/// Deterministic embedding derived from the SHA-256 digest of the text.
/// Used when no feature-extraction endpoint is available.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        (0..self.dimensions)
            .map(|i| (digest[i % digest.len()] as f32 / 255.0) * 2.0 - 1.0)
            .collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        Ok(self.vector(text))
    }
}

/// Remote feature-extraction endpoint, padded or truncated to the index
/// dimension. Falls back to [`HashEmbedder`] when the endpoint fails.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    url: String,
    token: String,
    dimensions: usize,
    fallback: HashEmbedder,
}

impl HttpEmbedder {
    pub fn new(url: &str, token: String, dimensions: usize, timeout: Duration) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            token,
            dimensions,
            fallback: HashEmbedder::new(dimensions),
        })
    }

    async fn remote(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": text }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IndexError::Embedding(format!("HTTP {status}")));
        }

        let body: Value = resp.json().await?;
        let mut vector = first_vector(&body)
            .ok_or_else(|| IndexError::Embedding("response is not a numeric vector".to_string()))?;
        vector.resize(self.dimensions, 0.0);
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        match self.remote(text).await {
            Ok(vector) => Ok(vector),
            Err(e) => {
                warn!(error = %e, "Embedding endpoint failed, using hash embedding");
                Ok(self.fallback.vector(text))
            }
        }
    }
}

/// Accepts `[f, ...]` or `[[f, ...], ...]`
fn first_vector(body: &Value) -> Option<Vec<f32>> {
    let items = body.as_array()?;
    let items = match items.first() {
        Some(Value::Array(inner)) => inner,
        _ => items,
    };
    if items.is_empty() {
        return None;
    }
    items.iter().map(|v| v.as_f64().map(|f| f as f32)).collect()
}
