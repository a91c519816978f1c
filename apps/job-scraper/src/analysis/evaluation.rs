//! LLM evaluation of a job description against the fixed prompt sets.
//!
//! Every prompt goes out on its own behind the shared retry loop. A prompt
//! that still fails after retrying leaves only its own column null.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::analysis::models::Evaluations;
use crate::llm_client::prompts::PromptSet;
use crate::llm_client::{Completion, CompletionService, LlmError};
use crate::retry::{retry_with_backoff, RetryPolicy};

pub struct Evaluator {
    completion: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    backend: String,
}

impl Evaluator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        retry: RetryPolicy,
        backend: impl Into<String>,
    ) -> Self {
        Self {
            completion,
            retry,
            backend: backend.into(),
        }
    }

    /// Runs both prompt sets (base first, then candidate experience).
    pub async fn evaluate_all(&self, description_html: &str) -> Evaluations {
        let mut evaluations = self.evaluate(description_html, PromptSet::Base).await;
        evaluations.extend(
            self.evaluate(description_html, PromptSet::CandidateExperience)
                .await,
        );
        evaluations
    }

    pub async fn evaluate(&self, description_html: &str, set: PromptSet) -> Evaluations {
        let system = set.system_message(description_html);
        let mut evaluations = Evaluations::new();

        for prompt in set.prompts() {
            let result = retry_with_backoff(&self.retry, LlmError::retry_decision, |_| {
                self.completion.complete(&system, prompt.prompt)
            })
            .await;

            match result {
                Ok(completion) => {
                    self.log_usage(prompt.column, &completion);
                    evaluations.insert(prompt.column, Some(completion.text));
                }
                Err(e) => {
                    log_failure(prompt.column, &e);
                    evaluations.insert(prompt.column, None);
                }
            }
        }

        evaluations
    }

    fn log_usage(&self, prompt_type: &str, completion: &Completion) {
        if let Some(usage) = &completion.usage {
            info!(
                company = %self.backend,
                prompt_type,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                cached_tokens = usage.cached_tokens(),
                "completion usage"
            );
        }
    }
}

fn log_failure(column: &str, e: &LlmError) {
    match e {
        LlmError::Connection(cause) => {
            error!("[{column}] The completion server could not be reached: {cause}")
        }
        LlmError::RateLimited(_) => {
            warn!("[{column}] Completion service is rate limiting us; giving up on this prompt")
        }
        LlmError::Api { status, message } => {
            error!("[{column}] Non-success status {status} from completion service: {message}")
        }
        other => error!("[{column}] Completion failed: {other}"),
    }
}
