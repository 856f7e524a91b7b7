//! Fraud Model Router Library
//!
//! Sector-routed fraud scoring: deterministic rule heuristics, similar-case
//! retrieval, language-model fallback chains and rule/model reconciliation.

pub mod config;
pub mod consumer;
pub mod error;
pub mod explain;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod reconcile;
pub mod retrieval;
pub mod scoring;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{DetectError, IndexError, ProviderError};
pub use models::{ModelInvoker, ModelVerdict, RoutingTable};
pub use pipeline::{Detection, FraudPipeline, KillSwitch};
pub use producer::ResultProducer;
pub use reconcile::{reconcile, ReconciliationDecision, ReconciliationReason};
pub use retrieval::PatternRetriever;
pub use scoring::{RuleScore, RuleScorer};
pub use types::{FraudRequest, FraudResult, RiskLevel, Sector};
