use std::time::Duration;

use async_trait::async_trait;
use tads_models::{BackendTuning, LlmProvider};
use tracing::{debug, warn};

use crate::error::BackendError;

/// Rough token estimate for the overflow preflight (~4 chars per token).
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4 + 1
}

/// A text-completion backend bound to one model.
///
/// Implementations make exactly one network/process call per `complete`;
/// retries are the client's concern.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, BackendError>;

    /// Context window in tokens, for overflow preflight and turn budgets.
    fn context_window(&self) -> usize;
}

/// HTTP backend speaking the OpenAI-style `/chat/completions` protocol.
///
/// Works against llama.cpp's server, Ollama's OpenAI-compatible endpoint,
/// and OpenAI itself; the provider selects auth conventions only. Tuning
/// parameters are forwarded in the request body unmodified; the backend
/// interprets them, this adapter does not.
pub struct HttpBackend {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    tuning: BackendTuning,
    timeout: Duration,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(
        provider: LlmProvider,
        base_url: impl Into<String>,
        model: impl Into<String>,
        tuning: BackendTuning,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
            base_url: base_url.into(),
            model: model.into(),
            tuning,
            timeout,
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            // Opaque tuning passthrough; ignored by backends that do not
            // understand it.
            "n_ctx": self.tuning.context_window,
            "n_batch": self.tuning.batch_size,
            "n_gpu_layers": self.tuning.gpu_layers,
        })
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, BackendError> {
        let prompt_tokens = estimate_tokens(system_prompt) + estimate_tokens(user_prompt);
        if prompt_tokens > self.tuning.context_window {
            return Err(BackendError::Overflow {
                prompt_tokens,
                context_window: self.tuning.context_window,
            });
        }

        debug!(
            provider = self.provider.as_str(),
            model = %self.model,
            prompt_tokens,
            "Requesting completion"
        );

        let mut request = self
            .client
            .post(self.completions_url())
            .json(&self.request_body(system_prompt, user_prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| {
                BackendError::Unavailable(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Completion request failed");
            if is_retryable_status(status.as_u16()) {
                return Err(BackendError::Unavailable(format!("HTTP {status}")));
            }
            return Err(BackendError::MalformedOutput(format!(
                "HTTP {status}: {body}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedOutput(e.to_string()))?;

        let content = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| {
                choice
                    .pointer("/message/content")
                    .or_else(|| choice.get("text"))
            })
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                BackendError::MalformedOutput("no completion content in response".to_string())
            })?;

        if content.trim().is_empty() {
            return Err(BackendError::MalformedOutput(
                "empty completion".to_string(),
            ));
        }

        Ok(content.to_string())
    }

    fn context_window(&self) -> usize {
        self.tuning.context_window
    }
}
