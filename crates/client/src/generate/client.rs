//! OpenAI-compatible chat-completions client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{StatusCode, header};
use visarag_core::config::LlmConfig;

use super::types::{ApiError, ChatRequest, ChatResponse, JsonSchemaFormat, ResponseFormat};
use super::{CompletionRequest, GenerationError, TextGenerator};
use crate::ground_truth::error::parse_retry_after;

/// `POST {base_url}/chat/completions` with bearer auth.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ChatCompletionsClient {
    /// # Errors
    ///
    /// Returns `GenerationError::MissingApiKey` if no key is configured.
    pub fn new(config: &LlmConfig, user_agent: &str) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;
        let http = Self::http_client(user_agent, config.timeout())?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
        })
    }

    fn http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, GenerationError> {
        Ok(reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .build()?)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: request.messages.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.schema.as_ref().map(|(name, schema)| ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat { name: (*name).to_string(), schema: schema.clone(), strict: false },
            }),
        }
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => api_error.error.message,
        Err(_) => body.chars().take(200).collect(),
    }
}

/// First non-blank choice content.
fn first_content(response: ChatResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message.content)
        .find(|content| !content.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let start = Instant::now();
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited { retry_after: parse_retry_after(response.headers()) });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http { status: status.as_u16(), message: error_message(&body) });
        }

        let body: ChatResponse = response.json().await.map_err(|e| GenerationError::Malformed(e.to_string()))?;
        if let Some(usage) = &body.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                total_tokens = usage.total_tokens,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "chat completion finished"
            );
        }
        first_content(body)
    }
}
