use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rand::Rng;
use tads_models::ModelTier;
use tokio::time::{sleep, Duration};
use tracing::warn;

use crate::backend::CompletionBackend;
use crate::error::BackendError;

/// Bounded exponential backoff for transient backend unavailability.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Retry attempts after the first call (so `max_retries = 3` means up
    /// to four calls total).
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 250,
            max_delay_ms: 5000,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    /// No waiting between attempts; for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * 2.0_f64.powi(attempt as i32);
        let clamped = base.min(self.max_delay_ms as f64);

        let jitter_range = clamped * self.jitter_factor;
        let jitter: f64 = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((clamped + jitter).max(0.0) as u64)
    }
}

/// Per-run cap on logical model calls. Retries of one call count once.
pub struct CallBudget {
    limit: u32,
    used: AtomicU32,
}

impl CallBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            used: AtomicU32::new(0),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    fn try_acquire(&self) -> Result<(), BackendError> {
        let prior = self.used.fetch_add(1, Ordering::SeqCst);
        if prior >= self.limit {
            self.used.fetch_sub(1, Ordering::SeqCst);
            return Err(BackendError::BudgetExhausted { limit: self.limit });
        }
        Ok(())
    }
}

/// Tier-addressed model client. The quick/deep bindings are fixed for the
/// client's lifetime; one run sees one binding.
pub struct ModelClient {
    quick: Arc<dyn CompletionBackend>,
    deep: Arc<dyn CompletionBackend>,
    retry: RetryConfig,
}

impl ModelClient {
    pub fn new(
        quick: Arc<dyn CompletionBackend>,
        deep: Arc<dyn CompletionBackend>,
        retry: RetryConfig,
    ) -> Self {
        Self { quick, deep, retry }
    }

    fn backend(&self, tier: ModelTier) -> &dyn CompletionBackend {
        match tier {
            ModelTier::Quick => self.quick.as_ref(),
            ModelTier::Deep => self.deep.as_ref(),
        }
    }

    pub fn context_window(&self, tier: ModelTier) -> usize {
        self.backend(tier).context_window()
    }

    /// One logical completion against the tier's backend. Only transient
    /// unavailability is retried; overflow and malformed output fail the
    /// call immediately.
    pub async fn complete(
        &self,
        tier: ModelTier,
        system_prompt: &str,
        user_prompt: &str,
        budget: &CallBudget,
    ) -> Result<String, BackendError> {
        budget.try_acquire()?;

        let backend = self.backend(tier);
        let mut last: Option<BackendError> = None;

        for attempt in 0..=self.retry.max_retries {
            match backend.complete(system_prompt, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(BackendError::Unavailable(reason)) => {
                    if attempt < self.retry.max_retries {
                        let delay = self.retry.delay_for_attempt(attempt);
                        warn!(
                            tier = tier.as_str(),
                            attempt = attempt + 1,
                            max = self.retry.max_retries + 1,
                            %reason,
                            delay_ms = delay.as_millis() as u64,
                            "Backend unavailable, retrying"
                        );
                        sleep(delay).await;
                    }
                    last = Some(BackendError::Unavailable(reason));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last.unwrap_or_else(|| BackendError::Unavailable("retries exhausted".to_string())))
    }
}
