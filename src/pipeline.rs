//! End-to-end fraud detection for one request
//!
//! Rule scoring and pattern retrieval run concurrently; the model chain runs
//! once retrieval is done; reconciliation and explanation follow. Everything
//! after input validation degrades to a rule-based answer instead of failing.

use crate::config::AppConfig;
use crate::error::DetectError;
use crate::explain::build_result;
use crate::models::{BackendFailure, ModelInvoker, ModelVerdict, ProviderRegistry};
use crate::reconcile::reconcile;
use crate::retrieval::{PatternRetriever, RetrievedPattern, RetrievedPatterns};
use crate::scoring::RuleScorer;
use crate::types::{FraudRequest, FraudResult};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Message returned while the kill switch is engaged
pub const DISABLED_MESSAGE: &str = "Fraud detection is temporarily disabled";

/// Externally owned on/off flag. The pipeline only reads it.
#[derive(Debug, Clone, Default)]
pub struct KillSwitch(Arc<AtomicBool>);

impl KillSwitch {
    pub fn new(engaged: bool) -> Self {
        Self(Arc::new(AtomicBool::new(engaged)))
    }

    pub fn set(&self, engaged: bool) {
        self.0.store(engaged, Ordering::SeqCst);
    }

    pub fn is_engaged(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed body returned when detection is disabled
#[derive(Debug, Clone, Serialize)]
pub struct DisabledReply {
    pub status: &'static str,
    pub message: &'static str,
}

impl Default for DisabledReply {
    fn default() -> Self {
        Self {
            status: "disabled",
            message: DISABLED_MESSAGE,
        }
    }
}

/// Outcome of a detection call
#[derive(Debug, Clone)]
pub enum Detection {
    Scored {
        result: FraudResult,
        /// Backend that answered, even when its score was rejected
        answered_by: Option<String>,
        /// Backends that were tried and failed, in attempt order
        failures: Vec<BackendFailure>,
    },
    Disabled,
}

impl Detection {
    pub fn result(&self) -> Option<&FraudResult> {
        match self {
            Detection::Scored { result, .. } => Some(result),
            Detection::Disabled => None,
        }
    }

    /// JSON reply body for the caller
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Detection::Scored { result, .. } => serde_json::to_vec(result),
            Detection::Disabled => serde_json::to_vec(&DisabledReply::default()),
        }
    }
}

/// The decision pipeline. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct FraudPipeline {
    scorer: RuleScorer,
    retriever: PatternRetriever,
    invoker: ModelInvoker,
    kill_switch: KillSwitch,
    timeout: Duration,
}

impl FraudPipeline {
    pub fn new(retriever: PatternRetriever, invoker: ModelInvoker, kill_switch: KillSwitch) -> Self {
        Self {
            scorer: RuleScorer::new(),
            retriever,
            invoker,
            kill_switch,
            timeout: Duration::from_secs(90),
        }
    }

    /// Set the hard end-to-end budget
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &AppConfig, kill_switch: KillSwitch) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config.providers).context("Failed to build model providers")?;
        let retriever = PatternRetriever::from_config(&config.retrieval).context("Failed to build pattern retriever")?;
        let invoker = ModelInvoker::new(registry, config.routing.clone());

        Ok(Self::new(retriever, invoker, kill_switch)
            .with_timeout(Duration::from_millis(config.pipeline.timeout_ms)))
    }

    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    /// Validate a raw `{ sector, data }` body and run detection.
    /// Only structurally invalid input is an error.
    pub async fn detect_json(&self, body: &[u8]) -> Result<Detection, DetectError> {
        if self.kill_switch.is_engaged() {
            return Ok(Detection::Disabled);
        }
        let request = FraudRequest::from_json(body)?;
        Ok(self.detect(&request).await)
    }

    pub async fn detect(&self, request: &FraudRequest) -> Detection {
        if self.kill_switch.is_engaged() {
            warn!(sector = %request.sector, "Kill switch engaged, request not scored");
            return Detection::Disabled;
        }

        let start = Instant::now();
        let deadline = start + self.timeout;

        let (rule, patterns) = tokio::join!(
            async { self.scorer.score(request) },
            async {
                tokio::time::timeout_at(deadline, self.retriever.retrieve(request))
                    .await
                    .unwrap_or_else(|_| RetrievedPatterns::empty())
            }
        );
        let patterns: Vec<RetrievedPattern> = patterns.collect();

        let verdict = match tokio::time::timeout_at(deadline, self.invoker.invoke(request, &patterns)).await {
            Ok(verdict) => verdict,
            Err(_) => {
                warn!(
                    sector = %request.sector,
                    budget_ms = self.timeout.as_millis() as u64,
                    "Pipeline budget exhausted before a model answered"
                );
                ModelVerdict::unavailable(Vec::new())
            }
        };

        let decision = reconcile(request.sector, &rule, &verdict);
        let result = build_result(&decision, &rule, &verdict, patterns.len())
            .with_processing_time(start.elapsed().as_millis() as u64);

        info!(
            request_id = %result.request_id,
            sector = %request.sector,
            score = result.fraud_score,
            risk_level = result.risk_level.as_str(),
            model_used = %result.model_used,
            reason = result.reconciliation.as_str(),
            similar_patterns = result.similar_patterns_count,
            processing_time_ms = result.processing_time_ms,
            "Request scored"
        );

        Detection::Scored {
            result,
            answered_by: verdict.backend_id,
            failures: verdict.failures,
        }
    }
}
