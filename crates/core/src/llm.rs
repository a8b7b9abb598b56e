//! # Text-Generation Boundary
//!
//! The reasoning stages only ever see the [`LanguageModel`] trait: one
//! system prompt, one user prompt, one completion. No retry policy lives
//! here - transient failures surface to the orchestrator as stage errors.
//!
//! [`HttpChatModel`] is the production implementation, speaking the
//! chat-completions dialects of the supported providers over HTTPS.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Errors from the text-generation service
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-level failure (connect, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success status
    #[error("model endpoint returned status {status}: {body}")]
    Api { status: u16, body: String },
    /// The completion carried no usable text
    #[error("model response contained no text content")]
    EmptyResponse,
    /// Required API key is not configured
    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),
}

impl LlmError {
    /// Whether a caller-layer retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Transport(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::EmptyResponse => false,
            LlmError::MissingApiKey(_) => false,
        }
    }
}

/// Opaque text-generation service consumed by the reasoning stages
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Supported chat-completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    pub fn api_key_env(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "https://api.openai.com",
            LlmProvider::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o",
            LlmProvider::Anthropic => "claude-sonnet-4-20250514",
        }
    }
}

/// Configuration for the production chat model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (e.g. "gpt-4o", "claude-sonnet-4-20250514")
    pub model: String,
    /// Base URL override for self-hosted or proxied endpoints
    pub base_url: Option<String>,
    /// Sampling temperature; low for consistent recommendations
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let provider = LlmProvider::default();
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: None,
            temperature: 0.1,
            max_tokens: 8000,
        }
    }
}

impl ModelConfig {
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Build a config from `ADSAGE_PROVIDER`, `ADSAGE_MODEL` and
    /// `ADSAGE_BASE_URL`, falling back to provider defaults.
    pub fn from_env() -> Self {
        let provider = match std::env::var("ADSAGE_PROVIDER").as_deref() {
            Ok("anthropic") => LlmProvider::Anthropic,
            _ => LlmProvider::OpenAI,
        };
        let model = std::env::var("ADSAGE_MODEL")
            .unwrap_or_else(|_| provider.default_model().to_string());
        let base_url = std::env::var("ADSAGE_BASE_URL").ok();
        Self {
            provider,
            model,
            base_url,
            ..Self::default()
        }
    }

    fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

/// Chat-completions client over reqwest
pub struct HttpChatModel {
    config: ModelConfig,
    api_key: String,
    client: reqwest::Client,
}

impl HttpChatModel {
    /// Create a client, reading the provider's API key from the environment
    pub fn new(config: ModelConfig) -> Result<Self, LlmError> {
        let env_var = config.provider.api_key_env();
        let api_key = std::env::var(env_var).map_err(|_| LlmError::MissingApiKey(env_var))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn invoke_openai(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }

    async fn invoke_anthropic(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.config.base_url());
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "system": system,
            "messages": [
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        value["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LanguageModel for HttpChatModel {
    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        match self.config.provider {
            LlmProvider::OpenAI => self.invoke_openai(system_prompt, user_prompt).await,
            LlmProvider::Anthropic => self.invoke_anthropic(system_prompt, user_prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.model, "gpt-4o");
        assert!(config.temperature < 0.5, "consistency needs low temperature");
    }

    #[test]
    fn test_provider_env_vars() {
        assert_eq!(LlmProvider::OpenAI.api_key_env(), "OPENAI_API_KEY");
        assert_eq!(LlmProvider::Anthropic.api_key_env(), "ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_base_url_override() {
        let config = ModelConfig::new(LlmProvider::OpenAI, "gpt-4o")
            .with_base_url("http://localhost:8000");
        assert_eq!(config.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Transport("reset".into()).is_transient());
        assert!(LlmError::Api {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!LlmError::Api {
            status: 401,
            body: String::new()
        }
        .is_transient());
        assert!(!LlmError::MissingApiKey("OPENAI_API_KEY").is_transient());
    }
}
