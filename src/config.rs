//! Configuration management for the fraud model router

use crate::models::RoutingTable;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub routing: RoutingTable,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming detection requests (request/reply)
    pub request_subject: String,
    /// Subject carrying `on`/`off` kill-switch commands
    pub control_subject: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of requests processed in parallel
    pub workers: usize,
    /// Hard end-to-end budget per request in milliseconds
    pub timeout_ms: u64,
    /// Initial kill-switch state
    pub kill_switch: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            timeout_ms: 90_000,
            kill_switch: false,
        }
    }
}

/// Similar-pattern retrieval configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Vector index host; empty disables retrieval
    pub index_host: String,
    /// Environment variable holding the index API key
    pub api_key_env: String,
    pub namespace: String,
    pub top_k: usize,
    /// Matches below this similarity are discarded
    pub min_similarity: f64,
    /// Index vector dimension
    pub dimensions: usize,
    pub timeout_ms: u64,
    /// Feature-extraction endpoint; empty uses the hash embedding
    pub embedding_url: String,
    pub embedding_token_env: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_host: String::new(),
            api_key_env: "PINECONE_API_KEY".to_string(),
            namespace: "rag".to_string(),
            top_k: 5,
            min_similarity: 0.35,
            dimensions: 2048,
            timeout_ms: 5_000,
            embedding_url: "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction".to_string(),
            embedding_token_env: "HF_TOKEN".to_string(),
        }
    }
}

/// One OpenAI-compatible provider endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.5
}

/// Model provider endpoints by kind
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub huggingface: ProviderSettings,
    pub openrouter: ProviderSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            huggingface: ProviderSettings {
                base_url: "https://router.huggingface.co/v1".to_string(),
                api_key_env: "HF_TOKEN".to_string(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
            },
            openrouter: ProviderSettings {
                base_url: "https://openrouter.ai/api/v1".to_string(),
                api_key_env: "OPENROUTER_API_KEY".to_string(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
            },
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with
    /// `FRAUD_ROUTER__SECTION__KEY` environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FRAUD_ROUTER").prefix_separator("__").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.routing.validate().context("Invalid routing table")?;
        anyhow::ensure!(self.pipeline.workers > 0, "pipeline.workers must be positive");
        anyhow::ensure!(self.pipeline.timeout_ms > 0, "pipeline.timeout_ms must be positive");
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be positive");
        anyhow::ensure!(self.retrieval.dimensions > 0, "retrieval.dimensions must be positive");
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "fraud.detect".to_string(),
                control_subject: "fraud.control.killswitch".to_string(),
            },
            pipeline: PipelineConfig::default(),
            retrieval: RetrievalConfig::default(),
            providers: ProvidersConfig::default(),
            routing: RoutingTable::default(),
            logging: LoggingConfig::default(),
        }
    }
}
