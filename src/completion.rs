//! Completion service abstraction and implementations.
//!
//! Defines the [`CompletionService`] trait and concrete implementations:
//! - **[`DisabledService`]**: fails every call; used when no provider is configured.
//! - **[`GeminiService`]**: calls the Gemini `generateContent` API with retry and backoff.
//!
//! A call either yields generated text or a classified [`CompletionError`].
//! Callers never branch on the error beyond [`CompletionError::is_blocked`];
//! its `Display` text is what ends up in summaries and chat responses.
//!
//! # Retry Strategy
//!
//! The Gemini service uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::CompletionConfig;

/// Classified failure of a completion call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The request never produced an HTTP response.
    #[error("Error communicating with AI: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("Error communicating with AI: API request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The provider refused to generate content for this prompt.
    #[error("Content blocked by API: {reason}{}", .message.as_ref().map(|m| format!(" - {}", m)).unwrap_or_default())]
    Blocked {
        reason: String,
        message: Option<String>,
    },

    /// A success response without any candidate text.
    #[error("No valid response or unexpected format from AI.")]
    EmptyResponse,

    #[error("Error communicating with AI: completion provider is disabled")]
    Disabled,
}

impl CompletionError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, CompletionError::Blocked { .. })
    }

    fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Transport(_) => true,
            CompletionError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A text-generation provider.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-1.5-flash-latest"`).
    fn model_name(&self) -> &str;

    /// Generate text for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

// ============ Disabled Service ============

/// A completion service that fails every call with [`CompletionError::Disabled`].
///
/// Used when `completion.provider = "disabled"`. Ingestion still runs and
/// stores the failure text for every file.
pub struct DisabledService;

#[async_trait]
impl CompletionService for DisabledService {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Disabled)
    }
}

// ============ Gemini Service ============

/// Completion service backed by the Gemini REST API.
///
/// Calls `POST {base_url}/models/{model}:generateContent`. The API key is
/// read once, at construction, from the environment variable named by
/// `completion.api_key_env`.
pub struct GeminiService {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiService {
    /// Create a new Gemini service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key variable is unset or the HTTP client
    /// cannot be built.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(k) if !k.trim().is_empty() => k,
            _ => bail!("{} environment variable not set", config.api_key_env),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
            max_retries: config.max_retries,
        })
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message: error_message_from_body(&body_text),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        parse_gemini_response(&json)
    }
}

#[async_trait]
impl CompletionService for GeminiService {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {},
        });

        tracing::debug!(
            "sending {} chars to {} ({})",
            prompt.chars().count(),
            self.model,
            self.endpoint
        );

        let mut attempt = 0u32;
        loop {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    tracing::warn!("completion attempt {} failed, retrying: {}", attempt + 1, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parse a `generateContent` response body.
///
/// Returns the first candidate's first text part, a [`CompletionError::Blocked`]
/// when `promptFeedback.blockReason` is set, or [`CompletionError::EmptyResponse`].
pub fn parse_gemini_response(json: &serde_json::Value) -> Result<String, CompletionError> {
    let text = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str());

    if let Some(text) = text {
        return Ok(text.to_string());
    }

    if let Some(feedback) = json.get("promptFeedback") {
        if let Some(reason) = feedback.get("blockReason").and_then(|r| r.as_str()) {
            tracing::warn!("prompt blocked by provider: {}", reason);
            return Err(CompletionError::Blocked {
                reason: reason.to_string(),
                message: feedback
                    .get("blockReasonMessage")
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
            });
        }
    }

    tracing::warn!("unexpected completion response shape: {}", json);
    Err(CompletionError::EmptyResponse)
}

fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unknown error".to_string())
}

/// Create the appropriate [`CompletionService`] based on configuration.
///
/// | Config Value | Service |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledService`] |
/// | `"gemini"` | [`GeminiService`] |
pub fn create_service(config: &CompletionConfig) -> Result<Box<dyn CompletionService>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledService)),
        "gemini" => Ok(Box::new(GeminiService::new(config)?)),
        other => bail!("Unknown completion provider: {}", other),
    }
}
