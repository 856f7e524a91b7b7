//! Model provider clients
//!
//! Both provider kinds expose an OpenAI-compatible chat-completions endpoint,
//! so a single client type serves them, parameterised by base URL and key.

use super::router::ProviderKind;
use crate::config::{ProviderSettings, ProvidersConfig};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A text-completion backend
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send `prompt` to `model_id` and return the raw completion text
    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client
#[derive(Clone)]
pub struct ChatCompletionsProvider {
    client: Client,
    kind: ProviderKind,
    base_url: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatCompletionsProvider {
    pub fn new(kind: ProviderKind, settings: &ProviderSettings, api_key: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            kind,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    /// Build from settings, reading the API key from the configured
    /// environment variable. Returns `Ok(None)` when the key is not set.
    pub fn from_env(kind: ProviderKind, settings: &ProviderSettings) -> Result<Option<Self>, ProviderError> {
        match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Self::new(kind, settings, key).map(Some),
            _ => Ok(None),
        }
    }

    /// For testing: point the client at a specific base URL (e.g., wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ModelProvider for ChatCompletionsProvider {
    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: model_id,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed("response has no completion content".to_string()))?;

        debug!(
            provider = %self.kind,
            model = %model_id,
            chars = content.len(),
            "Completion received"
        );
        Ok(content)
    }
}

/// Providers by kind. A kind with no entry is unconfigured.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ModelProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every provider whose API key is present in the environment
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        for (kind, settings) in [
            (ProviderKind::HuggingFace, &config.huggingface),
            (ProviderKind::OpenRouter, &config.openrouter),
        ] {
            match ChatCompletionsProvider::from_env(kind, settings)? {
                Some(provider) => {
                    info!(provider = %kind, base_url = %settings.base_url, "Model provider configured");
                    registry.register(kind, Arc::new(provider));
                }
                None => warn!(
                    provider = %kind,
                    api_key_env = %settings.api_key_env,
                    "API key not set, provider unconfigured"
                ),
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn ModelProvider>) {
        self.providers.insert(kind, provider);
    }

    pub fn with(mut self, kind: ProviderKind, provider: Arc<dyn ModelProvider>) -> Self {
        self.register(kind, provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ModelProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(ProviderError::Unconfigured(kind))
    }

    pub fn configured(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(server: &MockServer) -> ChatCompletionsProvider {
        let settings = ProviderSettings {
            base_url: "http://unused".to_string(),
            api_key_env: "UNUSED".to_string(),
            max_tokens: 256,
            temperature: 0.5,
        };
        ChatCompletionsProvider::new(ProviderKind::OpenRouter, &settings, "test-key".to_string())
            .unwrap()
            .with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn test_completion_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "qwen", "max_tokens": 256 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "FRAUD_SCORE: 42" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = test_provider(&server).complete("qwen", "analyze").await.unwrap();
        assert_eq!(text, "FRAUD_SCORE: 42");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = test_provider(&server).complete("qwen", "x").await.unwrap_err();
        assert_eq!(err, ProviderError::RateLimited);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let err = test_provider(&server).complete("qwen", "x").await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Http {
                status: 503,
                body: "model loading".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "oops" })))
            .mount(&server)
            .await;

        let err = test_provider(&server).complete("qwen", "x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn test_registry_unconfigured_kind() {
        let registry = ProviderRegistry::new();
        let err = registry.get(ProviderKind::HuggingFace).err().unwrap();
        assert_eq!(err, ProviderError::Unconfigured(ProviderKind::HuggingFace));
    }

    #[test]
    fn test_registry_skips_missing_keys() {
        let mut config = ProvidersConfig::default();
        config.huggingface.api_key_env = "FRAUD_ROUTER_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        config.openrouter.api_key_env = "FRAUD_ROUTER_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.configured().is_empty());
    }
}
