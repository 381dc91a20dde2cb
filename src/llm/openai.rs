//! OpenAI-compatible chat-completions backend.
//!
//! Works against any endpoint that speaks the `/chat/completions` wire
//! format, including local deployments behind a proxy.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

use super::{Message, ModelBackend};

/// Request body for a chat-completions call.
#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

/// A single generated choice in a chat-completions response.
#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: Message,
}

/// Response body of a chat-completions call.
#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

/// Backend client for OpenAI-compatible chat APIs.
pub struct OpenAiChatBackend {
    api_base: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    top_p: Option<f64>,
    http_client: Client,
}

impl OpenAiChatBackend {
    /// Creates a new backend with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Base URL of the API (e.g., "https://api.openai.com/v1")
    /// * `api_key` - Optional API key for authentication
    /// * `model` - Model identifier sent with every request
    pub fn new(api_base: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            http_client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Creates a backend from environment variables.
    ///
    /// Reads:
    /// - `SFT_EVOLVE_API_BASE`: base URL (required)
    /// - `SFT_EVOLVE_API_KEY`: API key (optional)
    /// - `SFT_EVOLVE_MODEL`: model id (defaults to "gpt-3.5-turbo")
    pub fn from_env() -> Result<Self, LlmError> {
        let api_base = env::var("SFT_EVOLVE_API_BASE").map_err(|_| LlmError::MissingApiBase)?;
        let api_key = env::var("SFT_EVOLVE_API_KEY").ok();
        let model =
            env::var("SFT_EVOLVE_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        Ok(Self::new(api_base, api_key, model))
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the nucleus sampling parameter.
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Returns the configured model id.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelBackend for OpenAiChatBackend {
    async fn query(&self, messages: &[Message]) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        };

        let mut request = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| LlmError::ParseError("response contained no choices".to_string()))
    }
}
