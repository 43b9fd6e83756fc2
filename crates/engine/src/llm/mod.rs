mod anthropic;
mod openai;
pub mod types;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use propsearch_common::config::{LlmRoleConfig, RetryConfig};

pub use types::{StructuredOutput, TokenUsage, ToolDefinition};

/// Per-call model settings shared by both providers.
#[derive(Clone, Debug)]
pub struct CallSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub timeout: Duration,
}

/// LLM API client with provider dispatch and bounded retry.
pub struct LlmClient {
    http: reqwest::Client,
    provider: String,
    endpoint: String,
    settings: CallSettings,
    retry_config: RetryConfig,
    api_key: String,
}

/// Errors from LLM API calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM HTTP error: {0}")]
    Http(String),

    #[error("LLM auth error: {0}")]
    Auth(String),

    #[error("LLM rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("LLM response parse error: {0}")]
    Parse(String),
}

impl LlmError {
    /// Whether retrying could change the outcome.
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Http(_) | LlmError::RateLimited { .. } | LlmError::Api(_)
        )
    }
}

impl LlmClient {
    /// Create a client for the configured provider.
    /// Reads the API key from the provider's env var; returns None if unset.
    pub fn new(config: &LlmRoleConfig, retry_config: RetryConfig) -> Option<Self> {
        let (env_var, endpoint) = match config.provider.as_str() {
            "anthropic" => ("ANTHROPIC_API_KEY", anthropic::ANTHROPIC_MESSAGES_URL),
            "openai" => ("OPENAI_API_KEY", openai::OPENAI_CHAT_URL),
            other => {
                tracing::warn!(provider = other, "Unknown LLM provider");
                return None;
            }
        };

        let api_key = match std::env::var(env_var) {
            Ok(key) if !key.is_empty() => key,
            _ => {
                tracing::warn!(
                    env_var = env_var,
                    provider = config.provider.as_str(),
                    "API key not set, natural-language extraction disabled"
                );
                return None;
            }
        };

        Some(Self::with_endpoint(config, retry_config, api_key, endpoint))
    }

    /// Create a client against an explicit endpoint (self-hosted gateways, tests).
    pub fn with_endpoint(
        config: &LlmRoleConfig,
        retry_config: RetryConfig,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            provider: config.provider.clone(),
            endpoint: endpoint.into(),
            settings: CallSettings {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                timeout: Duration::from_secs(config.timeout_seconds),
            },
            retry_config,
            api_key: api_key.into(),
        }
    }

    /// Force the model to answer through `tool` and return its arguments.
    pub async fn call_tool(
        &self,
        system: &str,
        user: &str,
        tool: &ToolDefinition,
    ) -> Result<StructuredOutput, LlmError> {
        let mut attempt = 0u32;
        let mut backoff_ms = self.retry_config.initial_backoff_ms;

        loop {
            attempt += 1;

            let err = match self.send_once(system, user, tool).await {
                Ok(output) => return Ok(output),
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= self.retry_config.max_attempts {
                metrics::counter!("llm.api.errors", "provider" => self.provider.clone())
                    .increment(1);
                return Err(err);
            }

            // A provider-requested wait is honoured only up to the backoff cap.
            let wait = match &err {
                LlmError::RateLimited {
                    retry_after: Some(secs),
                } => secs
                    .saturating_mul(1000)
                    .min(self.retry_config.max_backoff_ms),
                _ => backoff_ms,
            };
            tracing::warn!(attempt, wait_ms = wait, error = %err, "LLM call failed, retrying");
            tokio::time::sleep(Duration::from_millis(wait)).await;

            backoff_ms = (backoff_ms as f64 * self.retry_config.backoff_multiplier) as u64;
            backoff_ms = backoff_ms.min(self.retry_config.max_backoff_ms);
        }
    }

    async fn send_once(
        &self,
        system: &str,
        user: &str,
        tool: &ToolDefinition,
    ) -> Result<StructuredOutput, LlmError> {
        match self.provider.as_str() {
            "anthropic" => {
                anthropic::call_tool(
                    &self.http,
                    &self.endpoint,
                    &self.api_key,
                    &self.settings,
                    system,
                    user,
                    tool,
                )
                .await
            }
            "openai" => {
                openai::call_tool(
                    &self.http,
                    &self.endpoint,
                    &self.api_key,
                    &self.settings,
                    system,
                    user,
                    tool,
                )
                .await
            }
            other => Err(LlmError::Api(format!("Unknown provider: {}", other))),
        }
    }
}

/// Object-safe seam over the LLM call so extraction can be tested offline.
pub trait LlmCaller: Send + Sync {
    fn call_tool<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        tool: &'a ToolDefinition,
    ) -> Pin<Box<dyn Future<Output = Result<StructuredOutput, LlmError>> + Send + 'a>>;
}

impl LlmCaller for LlmClient {
    fn call_tool<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        tool: &'a ToolDefinition,
    ) -> Pin<Box<dyn Future<Output = Result<StructuredOutput, LlmError>> + Send + 'a>> {
        Box::pin(LlmClient::call_tool(self, system, user, tool))
    }
}
