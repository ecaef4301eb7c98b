use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::GenerationError;
use super::rate_limiter::RateLimiter;
use crate::agents::messages::ChatMessage;
use crate::config::AppConfig;

/// One chat-completion request
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text produced by the generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
}

/// Contract of the external language-model service
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// OpenRouter chat-completions client
///
/// Every call first waits on the shared [`RateLimiter`].
pub struct OpenRouterClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
}

impl OpenRouterClient {
    pub fn new(config: &AppConfig, rate_limiter: Arc<RateLimiter>) -> Result<Self, GenerationError> {
        let mut headers = HeaderMap::new();
        let referer = HeaderValue::from_str(&config.app_referer)
            .map_err(|e| GenerationError::Other(format!("invalid referer header: {e}")))?;
        let title = HeaderValue::from_str(&config.app_title)
            .map_err(|e| GenerationError::Other(format!("invalid title header: {e}")))?;
        headers.insert("HTTP-Referer", referer);
        headers.insert("X-Title", title);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.llm_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.openrouter_base_url.trim_end_matches('/')),
            api_key: config.openrouter_api_key.clone(),
            rate_limiter,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for OpenRouterClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        self.rate_limiter.acquire().await;

        debug!(model = %request.model, messages = request.messages.len(), "Calling generation service");

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(Generation { content })
    }
}
