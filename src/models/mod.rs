//! Model routing, invocation and completion handling

pub mod invoker;
pub mod parsing;
pub mod precheck;
pub mod prompts;
pub mod provider;
pub mod router;

pub use invoker::ModelInvoker;
pub use parsing::ClinicalAssessment;
pub use provider::{ChatCompletionsProvider, ModelProvider, ProviderRegistry};
pub use router::{BackendDescriptor, ProviderKind, RoutePlan, RoutingTable};

use crate::error::ProviderError;

/// One backend that was tried and did not produce a usable answer
#[derive(Debug, Clone, PartialEq)]
pub struct BackendFailure {
    pub backend_id: String,
    pub error: ProviderError,
}

/// Outcome of running a sector's route plan
///
/// `score` is `None` when every backend failed; `failures` then lists each
/// attempt in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVerdict {
    /// Clamped to [0, 100]
    pub score: Option<f64>,
    pub raw_explanation: String,
    /// Backend that answered
    pub backend_id: Option<String>,
    pub risk_factors: Vec<String>,
    /// Stage-1 clinical judgment on the two-stage path
    pub stage_trace: Option<ClinicalAssessment>,
    pub failures: Vec<BackendFailure>,
}

impl ModelVerdict {
    pub fn answered(backend_id: &str, score: f64, raw_explanation: String) -> Self {
        Self {
            score: Some(score.clamp(0.0, 100.0)),
            raw_explanation,
            backend_id: Some(backend_id.to_string()),
            risk_factors: Vec::new(),
            stage_trace: None,
            failures: Vec::new(),
        }
    }

    /// No model answer
    pub fn unavailable(failures: Vec<BackendFailure>) -> Self {
        Self {
            score: None,
            raw_explanation: String::new(),
            backend_id: None,
            risk_factors: Vec::new(),
            stage_trace: None,
            failures,
        }
    }

    pub fn with_risk_factors(mut self, risk_factors: Vec<String>) -> Self {
        self.risk_factors = risk_factors;
        self
    }

    pub fn with_failures(mut self, failures: Vec<BackendFailure>) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_stage_trace(mut self, clinical: Option<ClinicalAssessment>) -> Self {
        self.stage_trace = clinical;
        self
    }

    pub fn is_answered(&self) -> bool {
        self.score.is_some()
    }
}
