//! Oracle backends
//!
//! The reasoning oracle is any chat model reachable through an
//! OpenAI-compatible API or Anthropic's Messages API. The agent only relies on
//! the contract "prompt in, free text out".

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default model for every oracle call
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-2024-07-18";

/// LLM backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Empty response")]
    EmptyResponse,
}

/// Generic LLM backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a completion for an instruction block and the material it applies to
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone)]
pub struct OpenAIBackendConfig {
    /// API key
    pub api_key: String,
    /// Base URL (for OpenRouter, local servers, etc.)
    pub base_url: Option<String>,
    /// Model name
    pub model: String,
    /// Temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Max tokens
    pub max_tokens: u16,
}

impl Default for OpenAIBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

impl OpenAIBackendConfig {
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn openrouter(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: Some("https://openrouter.ai/api/v1".to_string()),
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn local(base_url: &str, model: &str) -> Self {
        Self {
            api_key: "sk-local".to_string(),
            base_url: Some(base_url.to_string()),
            model: model.to_string(),
            ..Default::default()
        }
    }
}

/// OpenAI-compatible LLM backend
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    config: OpenAIBackendConfig,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIBackendConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }
}

fn api_error(e: impl std::fmt::Display) -> LlmError {
    let message = e.to_string();
    if message.contains("429") || message.to_ascii_lowercase().contains("rate limit") {
        LlmError::RateLimited
    } else {
        LlmError::Api(message)
    }
}

fn chat_messages(system: &str, user: &str) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
    let mut messages = vec![ChatCompletionRequestSystemMessageArgs::default()
        .content(system)
        .build()
        .map_err(api_error)?
        .into()];

    if !user.is_empty() {
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(api_error)?
                .into(),
        );
    }

    Ok(messages)
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(chat_messages(system, user)?)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(api_error)?;

        let response = self.client.chat().create(request).await.map_err(api_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .and_then(|content| non_empty(&content))
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Anthropic Messages API endpoint
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic backend configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    /// e.g. claude-3-5-haiku-latest
    pub model: String,
    pub max_tokens: u32,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: 1024,
            timeout_secs: 120,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [MessageTurn<'a>; 1],
}

#[derive(Serialize)]
struct MessageTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    /// Text of all text blocks, joined
    fn text(self) -> Option<String> {
        let text = self
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        non_empty(&text)
    }
}

/// Anthropic backend over the Messages API
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        // The Messages API needs at least one user turn
        let user = if user.is_empty() { "Proceed." } else { user };

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages: [MessageTurn {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(api_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("Anthropic returned {}: {}", status, body)));
        }

        let reply: MessagesResponse = response.json().await.map_err(api_error)?;
        reply.text().ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Thread-safe reference to an LLM backend
pub type SharedBackend = Arc<dyn LlmBackend>;

/// Create a shared OpenAI-compatible backend
pub fn create_backend(config: OpenAIBackendConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(OpenAIBackend::new(config)?))
}

/// Create a shared Anthropic backend
pub fn create_anthropic_backend(config: AnthropicConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(AnthropicBackend::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAIBackendConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_openrouter_config() {
        let config = OpenAIBackendConfig::openrouter("key", "openai/gpt-4o-mini");
        assert_eq!(config.base_url.as_deref(), Some("https://openrouter.ai/api/v1"));
        assert_eq!(config.model, "openai/gpt-4o-mini");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            create_backend(OpenAIBackendConfig::default()),
            Err(LlmError::Config(_))
        ));
        assert!(matches!(
            create_anthropic_backend(AnthropicConfig::new("", "claude-3-5-haiku-latest")),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn test_backend_model_name() {
        let backend = create_backend(OpenAIBackendConfig::openai("test-key", "gpt-4o-mini")).unwrap();
        assert_eq!(backend.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_chat_messages_skip_empty_user() {
        assert_eq!(chat_messages("sys", "").unwrap().len(), 1);
        assert_eq!(chat_messages("sys", "page").unwrap().len(), 2);
    }

    #[test]
    fn test_anthropic_reply_text() {
        let reply: MessagesResponse = serde_json::from_str(
            r#"{"content": [{"type": "text", "text": "  DONE: found it  "}]}"#,
        )
        .unwrap();
        assert_eq!(reply.text().as_deref(), Some("DONE: found it"));

        let empty: MessagesResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert!(empty.text().is_none());
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(matches!(api_error("HTTP 429 Too Many Requests"), LlmError::RateLimited));
        assert!(matches!(api_error("connection reset"), LlmError::Api(_)));
    }
}
