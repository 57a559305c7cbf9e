//! Retry policy for backend submissions
//!
//! The decision is a pure function of the attempt count and the error, so it can be
//! tested without a transport. [`retry_with_policy`] is the async loop around it.

use std::future::Future;
use std::time::Duration;

use oasaudit_core::config::RetryConfig;

use super::backend::BackendError;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Capped exponential backoff over transient errors
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier.max(1.0),
        }
    }
}

impl RetryPolicy {
    /// Decide after `attempt` (1-based) failed with `error`
    pub fn decide(&self, attempt: u32, error: &BackendError) -> RetryDecision {
        if attempt >= self.max_attempts || !error.is_retryable() {
            return RetryDecision::GiveUp;
        }
        let delay = error
            .retry_after()
            .unwrap_or_else(|| self.backoff(attempt))
            .min(self.max_delay);
        RetryDecision::RetryAfter(delay)
    }

    /// `initial * multiplier^(attempt - 1)`, capped at `max_delay`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let max = self.max_delay.as_millis() as f64;
        Duration::from_millis(millis.min(max) as u64)
    }
}

/// Outcome of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, BackendError>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds or the policy gives up.
/// The closure receives the 1-based attempt number.
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(error) => error,
        };

        match policy.decide(attempt, &error) {
            RetryDecision::GiveUp => {
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }
            RetryDecision::RetryAfter(delay) => {
                tracing::debug!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying audit submission after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
