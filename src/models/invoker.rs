//! Model Invoker: runs a sector's route plan with ordered fallback
//!
//! Backends are attempted strictly one after another. A backend that times
//! out, is rate limited, or answers with something unparseable is recorded as
//! a failure and the next backend is tried; none is retried.

use super::parsing::{self, ClinicalAssessment, ParsedCompletion};
use super::precheck::{self, PRECHECK_BACKEND_ID};
use super::prompts;
use super::provider::ProviderRegistry;
use super::router::{BackendDescriptor, RoutePlan, RoutingTable};
use super::{BackendFailure, ModelVerdict};
use crate::error::ProviderError;
use crate::retrieval::RetrievedPattern;
use crate::types::FraudRequest;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Calls model backends for a request according to the routing table
#[derive(Clone)]
pub struct ModelInvoker {
    registry: ProviderRegistry,
    routing: Arc<RoutingTable>,
}

impl ModelInvoker {
    pub fn new(registry: ProviderRegistry, routing: RoutingTable) -> Self {
        Self {
            registry,
            routing: Arc::new(routing),
        }
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Produce a verdict for `request`. Never fails: exhaustion of the chain
    /// yields a verdict with no score.
    pub async fn invoke(&self, request: &FraudRequest, patterns: &[RetrievedPattern]) -> ModelVerdict {
        match self.routing.route(request.sector) {
            RoutePlan::SingleStage { chain } => {
                if let Some(hit) = precheck::run(request) {
                    info!(
                        sector = %request.sector,
                        score = hit.score,
                        factors = hit.risk_factors.len(),
                        "Deterministic pre-check matched, skipping model calls"
                    );
                    return ModelVerdict::answered(PRECHECK_BACKEND_ID, hit.score, hit.reasoning)
                        .with_risk_factors(hit.risk_factors);
                }
                let prompt = prompts::fraud_prompt(request, patterns);
                self.run_chain(chain, &prompt, Vec::new()).await
            }
            RoutePlan::TwoStage {
                clinical,
                reasoning,
                fallbacks,
            } => self.run_two_stage(request, patterns, clinical, reasoning, fallbacks).await,
        }
    }

    async fn run_two_stage(
        &self,
        request: &FraudRequest,
        patterns: &[RetrievedPattern],
        clinical: &BackendDescriptor,
        reasoning: &BackendDescriptor,
        fallbacks: &[BackendDescriptor],
    ) -> ModelVerdict {
        let mut failures = Vec::new();

        let assessment = match self.assess_clinical(clinical, request, patterns).await {
            Ok(assessment) => {
                debug!(
                    backend = clinical.id(),
                    legitimacy = ?assessment.legitimacy_score,
                    "Clinical validation complete"
                );
                Some(assessment)
            }
            Err(error) => {
                warn!(backend = clinical.id(), error = %error, "Clinical validation failed, continuing without it");
                failures.push(BackendFailure {
                    backend_id: clinical.id().to_string(),
                    error,
                });
                None
            }
        };

        let context = assessment.clone().unwrap_or_else(|| ClinicalAssessment {
            legitimacy_score: None,
            reasoning: "Clinical validation unavailable; assess the claim on billing evidence alone.".to_string(),
            risk_factors: Vec::new(),
        });
        let prompt = prompts::reasoning_prompt(request, patterns, &context);

        match self.attempt(reasoning, &prompt).await {
            Ok(parsed) => {
                return verdict(reasoning, parsed)
                    .with_failures(failures)
                    .with_stage_trace(assessment);
            }
            Err(error) => {
                warn!(backend = reasoning.id(), error = %error, "Fraud reasoning stage failed, advancing to fallbacks");
                failures.push(BackendFailure {
                    backend_id: reasoning.id().to_string(),
                    error,
                });
            }
        }

        let prompt = prompts::fraud_prompt(request, patterns);
        self.run_chain(fallbacks, &prompt, failures)
            .await
            .with_stage_trace(assessment)
    }

    async fn assess_clinical(
        &self,
        backend: &BackendDescriptor,
        request: &FraudRequest,
        patterns: &[RetrievedPattern],
    ) -> Result<ClinicalAssessment, ProviderError> {
        let prompt = prompts::clinical_prompt(request, patterns);
        let text = self.call(backend, &prompt).await?;
        parsing::parse_clinical_completion(&text)
    }

    async fn run_chain(
        &self,
        chain: &[BackendDescriptor],
        prompt: &str,
        mut failures: Vec<BackendFailure>,
    ) -> ModelVerdict {
        for (i, backend) in chain.iter().enumerate() {
            match self.attempt(backend, prompt).await {
                Ok(parsed) => {
                    if i > 0 {
                        info!(backend = backend.id(), position = i + 1, "Fallback backend answered");
                    }
                    return verdict(backend, parsed).with_failures(failures);
                }
                Err(error) => {
                    warn!(
                        backend = backend.id(),
                        provider = %backend.provider,
                        position = i + 1,
                        remaining = chain.len() - i - 1,
                        error = %error,
                        "Backend failed, advancing fallback chain"
                    );
                    failures.push(BackendFailure {
                        backend_id: backend.id().to_string(),
                        error,
                    });
                }
            }
        }

        warn!(attempts = failures.len(), "All model backends exhausted");
        ModelVerdict::unavailable(failures)
    }

    async fn attempt(&self, backend: &BackendDescriptor, prompt: &str) -> Result<ParsedCompletion, ProviderError> {
        let text = self.call(backend, prompt).await?;
        parsing::parse_fraud_completion(&text)
    }

    /// One call under the backend's own timeout budget
    async fn call(&self, backend: &BackendDescriptor, prompt: &str) -> Result<String, ProviderError> {
        let provider = self.registry.get(backend.provider)?;
        match tokio::time::timeout(backend.timeout(), provider.complete(&backend.model_id, prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                after_ms: backend.timeout_ms,
            }),
        }
    }
}

fn verdict(backend: &BackendDescriptor, parsed: ParsedCompletion) -> ModelVerdict {
    ModelVerdict::answered(backend.id(), parsed.score, parsed.reasoning).with_risk_factors(parsed.risk_factors)
}
