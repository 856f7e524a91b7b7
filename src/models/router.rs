//! Static sector-to-backend routing table

use crate::types::Sector;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Model provider family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    HuggingFace,
    OpenRouter,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::HuggingFace => f.write_str("huggingface"),
            ProviderKind::OpenRouter => f.write_str("openrouter"),
        }
    }
}

fn default_backend_timeout_ms() -> u64 {
    30_000
}

/// One candidate model backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Model identifier as understood by the provider
    pub model_id: String,
    pub provider: ProviderKind,
    /// Per-call timeout budget
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

impl BackendDescriptor {
    pub fn new(provider: ProviderKind, model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            provider,
            timeout_ms: default_backend_timeout_ms(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Identifier reported as `model_used`
    pub fn id(&self) -> &str {
        &self.model_id
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Invocation strategy for a sector, selected once per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RoutePlan {
    /// Ordered fallback chain, primary first
    SingleStage { chain: Vec<BackendDescriptor> },
    /// Clinical validity check feeding a fraud-reasoning model, then fallbacks
    TwoStage {
        clinical: BackendDescriptor,
        reasoning: BackendDescriptor,
        #[serde(default)]
        fallbacks: Vec<BackendDescriptor>,
    },
}

impl RoutePlan {
    /// Every backend the plan may call, in attempt order
    pub fn backends(&self) -> Vec<&BackendDescriptor> {
        match self {
            RoutePlan::SingleStage { chain } => chain.iter().collect(),
            RoutePlan::TwoStage {
                clinical,
                reasoning,
                fallbacks,
            } => [clinical, reasoning].into_iter().chain(fallbacks).collect(),
        }
    }

    pub fn is_two_stage(&self) -> bool {
        matches!(self, RoutePlan::TwoStage { .. })
    }
}

/// The Model Router table: one plan per sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub banking: RoutePlan,
    pub medical: RoutePlan,
    pub ecommerce: RoutePlan,
    pub supply_chain: RoutePlan,
}

impl RoutingTable {
    /// Plan for a sector
    pub fn route(&self, sector: Sector) -> &RoutePlan {
        match sector {
            Sector::Banking => &self.banking,
            Sector::Medical => &self.medical,
            Sector::Ecommerce => &self.ecommerce,
            Sector::SupplyChain => &self.supply_chain,
        }
    }

    /// Reject tables with an empty single-stage chain
    pub fn validate(&self) -> Result<()> {
        for sector in Sector::ALL {
            if let RoutePlan::SingleStage { chain } = self.route(sector) {
                if chain.is_empty() {
                    bail!("routing chain for sector `{sector}` is empty");
                }
            }
            if let Some(b) = self.route(sector).backends().iter().find(|b| b.timeout_ms == 0) {
                bail!("backend `{}` for sector `{sector}` has a zero timeout", b.model_id);
            }
        }
        Ok(())
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        use ProviderKind::{HuggingFace, OpenRouter};

        let qwen = BackendDescriptor::new(HuggingFace, "Qwen/Qwen2.5-72B-Instruct");
        let nemotron_30b = BackendDescriptor::new(OpenRouter, "nvidia/nemotron-3-nano-30b-a3b:free");
        let nemotron_12b = BackendDescriptor::new(OpenRouter, "nvidia/nemotron-nano-12b-v2-vl:free");
        let llama = BackendDescriptor::new(OpenRouter, "meta-llama/llama-3.1-70b-instruct:free");

        Self {
            banking: RoutePlan::SingleStage {
                chain: vec![qwen.clone(), nemotron_30b.clone(), llama],
            },
            medical: RoutePlan::TwoStage {
                clinical: BackendDescriptor::new(HuggingFace, "google/medgemma-4b-it"),
                reasoning: qwen.clone(),
                fallbacks: vec![nemotron_30b.clone()],
            },
            ecommerce: RoutePlan::SingleStage {
                chain: vec![nemotron_12b.clone(), qwen.clone(), nemotron_30b.clone()],
            },
            supply_chain: RoutePlan::SingleStage {
                chain: vec![nemotron_12b, qwen, nemotron_30b],
            },
        }
    }
}
