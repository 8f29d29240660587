//! Generative enhancement: ask a chat model for structured visa content.
//!
//! ### Flow
//!
//! 1. Build system + user messages embedding the grounding context.
//! 2. Submit through the generation [`Scheduler`] with a per-call timeout.
//! 3. Parse the reply (a surrounding markdown fence is tolerated) and run
//!    the artifact's `validate()`.
//!
//! Malformed output is retryable, so with the default attempt budget of 2 it
//! gets exactly one more try with the same prompt. Timeouts are final.

pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::ChatCompletionsClient;
pub use error::GenerationError;
pub use types::ChatMessage;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use visarag_core::VisaQuery;
use visarag_core::config::{LlmConfig, RateLimitConfig};
use visarag_core::model::{GeneratedCatalog, GeneratedRequirements, GroundTruthContext, SchemaViolation};

use crate::scheduler::Scheduler;

/// One model call: messages, sampling settings and an optional output schema.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Schema name and JSON Schema for `response_format`.
    pub schema: Option<(&'static str, serde_json::Value)>,
}

/// Backend that turns a request into raw model text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// A structured artifact the model can be asked to produce.
pub trait GeneratedArtifact: DeserializeOwned + schemars::JsonSchema + Send + 'static {
    const NAME: &'static str;

    fn check(&self) -> Result<(), SchemaViolation>;

    fn output_schema() -> serde_json::Value {
        schemars::schema_for!(Self).to_value()
    }
}

impl GeneratedArtifact for GeneratedRequirements {
    const NAME: &'static str = "generated_requirements";

    fn check(&self) -> Result<(), SchemaViolation> {
        self.validate()
    }
}

impl GeneratedArtifact for GeneratedCatalog {
    const NAME: &'static str = "generated_catalog";

    fn check(&self) -> Result<(), SchemaViolation> {
        self.validate()
    }
}

/// Sampling, timeout and retry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPolicy {
    pub grounded_temperature: f32,
    pub ungrounded_temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default(), &visarag_core::config::LimitsConfig::default().generation)
    }
}

impl GenerationPolicy {
    pub fn from_config(llm: &LlmConfig, limits: &RateLimitConfig) -> Self {
        Self {
            grounded_temperature: llm.grounded_temperature,
            ungrounded_temperature: llm.ungrounded_temperature,
            max_tokens: llm.max_tokens,
            timeout: llm.timeout(),
            max_attempts: limits.max_attempts,
        }
    }

    pub fn temperature(&self, context: &GroundTruthContext) -> f32 {
        if context.is_grounded() { self.grounded_temperature } else { self.ungrounded_temperature }
    }
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse and validate raw model output.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` if the text is not valid JSON for `A`
/// or fails the artifact's contract.
pub fn parse_artifact<A: GeneratedArtifact>(raw: &str) -> Result<A, GenerationError> {
    let artifact: A = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| GenerationError::Malformed(format!("{}: {e}", A::NAME)))?;
    artifact.check().map_err(|e| GenerationError::Malformed(format!("{}: {e}", A::NAME)))?;
    Ok(artifact)
}

/// Scheduler-bound client for requirements and catalog generation.
#[derive(Clone)]
pub struct EnhancementClient {
    generator: Arc<dyn TextGenerator>,
    scheduler: Scheduler,
    policy: GenerationPolicy,
}

impl std::fmt::Debug for EnhancementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancementClient")
            .field("scheduler", &self.scheduler.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl EnhancementClient {
    pub fn new(generator: Arc<dyn TextGenerator>, scheduler: Scheduler, policy: GenerationPolicy) -> Self {
        Self { generator, scheduler, policy }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    pub async fn requirements(
        &self, query: &VisaQuery, context: &GroundTruthContext,
    ) -> Result<GeneratedRequirements, GenerationError> {
        self.generate(prompt::requirements_messages(query, context), context).await
    }

    pub async fn catalog(
        &self, query: &VisaQuery, context: &GroundTruthContext,
    ) -> Result<GeneratedCatalog, GenerationError> {
        self.generate(prompt::catalog_messages(query, context), context).await
    }

    async fn generate<A: GeneratedArtifact>(
        &self, messages: Vec<ChatMessage>, context: &GroundTruthContext,
    ) -> Result<A, GenerationError> {
        let request = CompletionRequest {
            messages,
            temperature: self.policy.temperature(context),
            max_tokens: self.policy.max_tokens,
            schema: Some((A::NAME, A::output_schema())),
        };
        let request = &request;
        let generator = &self.generator;
        let timeout = self.policy.timeout;

        let artifact = self
            .scheduler
            .schedule(self.policy.max_attempts, move |attempt| async move {
                tracing::debug!(artifact = A::NAME, attempt, "requesting generation");
                let raw = tokio::time::timeout(timeout, generator.complete(request))
                    .await
                    .map_err(|_| GenerationError::Timeout(timeout))??;
                parse_artifact::<A>(&raw)
            })
            .await?;
        Ok(artifact)
    }
}
