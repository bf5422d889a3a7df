//! Chat completion client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use brew_core::{Error, GenerationConfig, GenerationResult, LLMProvider, Result, RetryConfig};

use crate::config::OpenAIConfig;

/// Chat completion client for an OpenAI-compatible API
pub struct OpenAIClient {
    config: OpenAIConfig,
    client: Client,
    generation: GenerationConfig,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

impl ChatResponse {
    /// Text of the first choice; a null or missing content is an empty
    /// answer, not a failure
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

impl OpenAIClient {
    /// Model constants
    pub const GPT_4O_MINI: &'static str = "gpt-4o-mini";
    pub const GPT_4O: &'static str = "gpt-4o";

    /// Create a new client from configuration
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            client,
            generation: GenerationConfig {
                model_id: Self::GPT_4O_MINI.to_string(),
                ..Default::default()
            },
            retry: RetryConfig::default(),
        })
    }

    /// Create a new client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OpenAIConfig::from_env()?;
        Self::new(config)
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.generation.model_id = model_id.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.generation.temperature = Some(temperature);
        self
    }

    /// Per-call timeout
    pub fn with_timeout(mut self, per_call: Duration) -> Self {
        self.generation.timeout = per_call;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Base delay between retries; grows linearly with the attempt number
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Perform one chat completion request
    async fn perform_generation(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let request_body = ChatRequest {
            model: &config.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let tokens_used = body.usage.as_ref().map(|u| u.total_tokens);
        Ok(GenerationResult {
            text: body.into_text(),
            model_id: config.model_id.clone(),
            tokens_used,
        })
    }
}

/// Map a non-success HTTP status to an error; rate limits and server errors
/// are retryable.
fn status_error(status: StatusCode, body: &str) -> Error {
    let message = format!("chat completion failed with status {}: {}", status, body);
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Error::Network(message)
    } else {
        Error::LLMProvider(message)
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let config = self.generation.clone();
        self.generate_with_config(prompt, &config).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let mut attempt = 0;
        loop {
            let outcome = match timeout(config.timeout, self.perform_generation(prompt, config)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!(
                    "chat completion exceeded {}s",
                    config.timeout.as_secs()
                ))),
            };

            match outcome {
                Ok(result) => {
                    debug!(model = %result.model_id, chars = result.text.len(), "generation complete");
                    return Ok(result);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "transient generation failure, retrying");
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.generation.model_id
    }
}
