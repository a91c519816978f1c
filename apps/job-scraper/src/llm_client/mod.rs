/// LLM client: the single point of entry for completion calls.
///
/// No other module talks to the completion API directly; evaluation code
/// depends on the `CompletionService` trait so dev mode and tests can swap
/// the backend out.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retry::RetryDecision;

pub mod prompts;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Returned instead of a completion when dev mode is on.
pub const DEV_MODE_PLACEHOLDER: &str = "This row processed in developer mode.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The server could not be reached: {0}")]
    Connection(String),

    #[error("Rate limited (status 429): {0}")]
    RateLimited(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Rate limits, 5xx and transport failures are worth another attempt.
    pub fn retry_decision(&self) -> RetryDecision {
        match self {
            LlmError::Connection(_) | LlmError::RateLimited(_) => RetryDecision::Retry,
            LlmError::Api { status, .. } if *status >= 500 => RetryDecision::Retry,
            LlmError::Http(e) if e.is_timeout() || e.is_connect() => RetryDecision::Retry,
            _ => RetryDecision::GiveUp,
        }
    }
}

/// Token accounting reported by the completion service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: u32,
}

impl Usage {
    pub fn cached_tokens(&self) -> u32 {
        self.prompt_tokens_details
            .as_ref()
            .map(|d| d.cached_tokens)
            .unwrap_or(0)
    }
}

/// One completion result. `usage` is `None` when no call was made (dev mode).
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// The completion capability consumed by the evaluation step.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<Completion, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// Chat-completions client. A single attempt per call; retrying is the
/// caller's job so every backend shares one retry policy.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            model,
            endpoint: OPENAI_API_URL.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Completion, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    LlmError::Connection(e.to_string())
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimited(message));
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed = parse_chat_response(&body)?;
        debug!(
            "Completion succeeded: prompt_tokens={}, completion_tokens={}",
            parsed.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
            parsed
                .usage
                .as_ref()
                .map(|u| u.completion_tokens)
                .unwrap_or(0)
        );
        Ok(parsed)
    }
}

fn parse_chat_response(body: &str) -> Result<Completion, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(LlmError::EmptyContent)?;
    Ok(Completion {
        text,
        usage: response.usage,
    })
}

/// Stands in for the completion service when dev mode is on.
pub struct DevModeCompletion;

#[async_trait]
impl CompletionService for DevModeCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<Completion, LlmError> {
        Ok(Completion {
            text: DEV_MODE_PLACEHOLDER.to_string(),
            usage: None,
        })
    }
}
