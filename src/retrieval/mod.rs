//! Similar-pattern retrieval (RAG context)
//!
//! Retrieval is best effort: an unreachable or slow index yields no patterns
//! and the pipeline carries on without context.

pub mod embedder;
pub mod index;

pub use embedder::{Embedder, HashEmbedder, HttpEmbedder};
pub use index::{HttpVectorIndex, VectorIndex};

use crate::config::RetrievalConfig;
use crate::error::IndexError;
use crate::types::{FraudRequest, Sector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Label of a historical case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternLabel {
    Fraud,
    Legitimate,
}

impl PatternLabel {
    pub fn as_upper(&self) -> &'static str {
        match self {
            PatternLabel::Fraud => "FRAUD",
            PatternLabel::Legitimate => "LEGITIMATE",
        }
    }

    /// Interpret an index `label` or `risk_level` metadata value
    pub fn from_metadata(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "legitimate" | "legit" | "benign" | "low" | "none" => PatternLabel::Legitimate,
            _ => PatternLabel::Fraud,
        }
    }
}

/// A historical case similar to the request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPattern {
    /// Cosine similarity in [0, 1]
    pub similarity: f64,
    pub pattern_text: String,
    pub pattern_label: PatternLabel,
    pub sector: Sector,
}

/// Retrieved patterns in descending similarity, consumed once
#[derive(Debug)]
pub struct RetrievedPatterns {
    inner: std::vec::IntoIter<RetrievedPattern>,
}

impl RetrievedPatterns {
    pub fn empty() -> Self {
        Self {
            inner: Vec::new().into_iter(),
        }
    }
}

impl Iterator for RetrievedPatterns {
    type Item = RetrievedPattern;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for RetrievedPatterns {}

/// Embeds a request and queries the index partition for its sector
#[derive(Clone)]
pub struct PatternRetriever {
    embedder: Arc<dyn Embedder>,
    index: Option<Arc<dyn VectorIndex>>,
    top_k: usize,
    min_similarity: f64,
    timeout: Duration,
}

impl PatternRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Option<Arc<dyn VectorIndex>>) -> Self {
        Self {
            embedder,
            index,
            top_k: 5,
            min_similarity: 0.35,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A retriever that never returns patterns
    pub fn disabled() -> Self {
        Self::new(Arc::new(HashEmbedder::new(1)), None)
    }

    /// Build from configuration. A missing index host or API key disables
    /// retrieval; a missing embedding token selects the hash embedding.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, IndexError> {
        let timeout = Duration::from_millis(config.timeout_ms);

        let embedder: Arc<dyn Embedder> = match env_value(&config.embedding_token_env) {
            Some(token) if !config.embedding_url.is_empty() => Arc::new(HttpEmbedder::new(
                &config.embedding_url,
                token,
                config.dimensions,
                timeout,
            )?),
            _ => {
                info!(dimensions = config.dimensions, "Using hash embedding for retrieval queries");
                Arc::new(HashEmbedder::new(config.dimensions))
            }
        };

        let index: Option<Arc<dyn VectorIndex>> = match env_value(&config.api_key_env) {
            Some(key) if !config.index_host.is_empty() => {
                info!(host = %config.index_host, namespace = %config.namespace, "Vector index configured");
                Some(Arc::new(HttpVectorIndex::new(
                    &config.index_host,
                    key,
                    &config.namespace,
                    timeout,
                )?))
            }
            _ => {
                warn!(
                    api_key_env = %config.api_key_env,
                    "Vector index not configured, requests will run without similar patterns"
                );
                None
            }
        };

        Ok(Self::new(embedder, index)
            .with_top_k(config.top_k)
            .with_min_similarity(config.min_similarity)
            .with_timeout(timeout))
    }

    pub fn is_enabled(&self) -> bool {
        self.index.is_some()
    }

    /// Up to `top_k` patterns above the similarity floor, best first.
    /// Failures are logged and produce an empty result.
    pub async fn retrieve(&self, request: &FraudRequest) -> RetrievedPatterns {
        let Some(index) = &self.index else {
            return RetrievedPatterns::empty();
        };

        let result = tokio::time::timeout(self.timeout, self.query(index.as_ref(), request))
            .await
            .unwrap_or(Err(IndexError::Timeout));

        match result {
            Ok(mut patterns) => {
                patterns.retain(|p| p.sector == request.sector && p.similarity >= self.min_similarity);
                patterns.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
                patterns.truncate(self.top_k);
                debug!(sector = %request.sector, count = patterns.len(), "Similar patterns retrieved");
                RetrievedPatterns {
                    inner: patterns.into_iter(),
                }
            }
            Err(e) => {
                warn!(sector = %request.sector, error = %e, "Pattern retrieval failed, continuing without context");
                RetrievedPatterns::empty()
            }
        }
    }

    async fn query(&self, index: &dyn VectorIndex, request: &FraudRequest) -> Result<Vec<RetrievedPattern>, IndexError> {
        let vector = self.embedder.embed(&request.summary()).await?;
        index.query(request.sector, &vector, self.top_k).await
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Index answering from a fixed list, or failing, or never answering
    pub(crate) struct StaticIndex {
        pub(crate) patterns: Result<Vec<RetrievedPattern>, IndexError>,
        pub(crate) hang: bool,
        pub(crate) queries: AtomicUsize,
    }

    impl StaticIndex {
        pub(crate) fn with(patterns: Vec<RetrievedPattern>) -> Self {
            Self {
                patterns: Ok(patterns),
                hang: false,
                queries: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing(error: IndexError) -> Self {
            Self {
                patterns: Err(error),
                hang: false,
                queries: AtomicUsize::new(0),
            }
        }

        pub(crate) fn hanging() -> Self {
            Self {
                hang: true,
                ..Self::with(Vec::new())
            }
        }
    }

    #[async_trait]
    impl VectorIndex for StaticIndex {
        async fn query(&self, _sector: Sector, _vector: &[f32], _top_k: usize) -> Result<Vec<RetrievedPattern>, IndexError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                futures::future::pending::<()>().await;
            }
            self.patterns.clone()
        }
    }

    pub(crate) fn pattern(sector: Sector, similarity: f64, text: &str) -> RetrievedPattern {
        RetrievedPattern {
            similarity,
            pattern_text: text.to_string(),
            pattern_label: PatternLabel::Fraud,
            sector,
        }
    }

    pub(crate) fn retriever(index: StaticIndex) -> PatternRetriever {
        PatternRetriever::new(Arc::new(HashEmbedder::new(16)), Some(Arc::new(index)))
    }

    fn banking() -> FraudRequest {
        FraudRequest::new(Sector::Banking, json!({ "amount": 500 }).as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_retrieve_orders_filters_and_bounds() {
        let index = StaticIndex::with(vec![
            pattern(Sector::Banking, 0.50, "c"),
            pattern(Sector::Banking, 0.95, "a"),
            pattern(Sector::Banking, 0.20, "below floor"),
            pattern(Sector::Medical, 0.99, "other partition"),
            pattern(Sector::Banking, 0.80, "b"),
            pattern(Sector::Banking, 0.45, "d"),
            pattern(Sector::Banking, 0.40, "e"),
            pattern(Sector::Banking, 0.36, "f"),
        ]);
        let patterns = retriever(index).retrieve(&banking()).await;

        assert_eq!(patterns.len(), 5);
        let texts: Vec<String> = patterns.map(|p| p.pattern_text).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_index_failure_yields_empty() {
        let patterns = retriever(StaticIndex::failing(IndexError::Unavailable("down".to_string())))
            .retrieve(&banking())
            .await;
        assert_eq!(patterns.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_timeout_yields_empty() {
        let patterns = retriever(StaticIndex::hanging())
            .with_timeout(Duration::from_millis(200))
            .retrieve(&banking())
            .await;
        assert_eq!(patterns.len(), 0);
    }

    #[tokio::test]
    async fn test_disabled_retriever() {
        let retriever = PatternRetriever::disabled();
        assert!(!retriever.is_enabled());
        assert_eq!(retriever.retrieve(&banking()).await.count(), 0);
    }

    #[test]
    fn test_label_from_metadata() {
        assert_eq!(PatternLabel::from_metadata("Legitimate"), PatternLabel::Legitimate);
        assert_eq!(PatternLabel::from_metadata("high"), PatternLabel::Fraud);
        assert_eq!(PatternLabel::Legitimate.as_upper(), "LEGITIMATE");
    }
}
