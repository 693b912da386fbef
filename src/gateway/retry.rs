//! Bounded retry with exponential backoff for model calls
//!
//! Transient transport failures get a small, bounded number of retries
//! before the pipeline falls back to a degraded result. Parse and input
//! errors are never retried; resending the same bytes cannot fix them.

use std::time::Duration;
use tokio::time::sleep;

use crate::errors::{PipelineError, Result};

/// Default retries after the first failed attempt
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff
const BASE_DELAY_MS: u64 = 500;

/// Maximum delay cap
const MAX_DELAY_MS: u64 = 4_000;

/// Retry policy with exponential backoff and jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt
    max_retries: u32,

    /// Base delay in milliseconds
    base_delay_ms: u64,

    /// Maximum delay cap in milliseconds
    max_delay_ms: u64,

    /// Enable jitter
    enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Create a retry policy with default settings
    pub fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    /// Create a retry policy with custom bounds
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    /// Run an operation, retrying transient failures within the bound.
    ///
    /// Returns the last error unchanged once retries are exhausted so
    /// the caller still sees whether it was a timeout or a transport
    /// refusal.
    pub async fn execute_with_retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !self.is_retryable(&e) || attempt >= self.max_retries {
                        return Err(e);
                    }

                    attempt += 1;
                    let delay = self.calculate_delay(attempt);

                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying model call after transient failure"
                    );

                    sleep(delay).await;
                }
            }
        }
    }

    /// Calculate delay for given retry number (1-based)
    fn calculate_delay(&self, attempt: u32) -> Duration {
        // Binary exponential backoff: base * 2^attempt, capped
        let exponential_delay = self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
        let delay_ms = exponential_delay.min(self.max_delay_ms);

        // ±25% random variation keeps concurrent callers from syncing up
        let final_delay = if self.enable_jitter {
            let jitter = (delay_ms / 4) as i64;
            let random_jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter as f64;
            ((delay_ms as i64) + random_jitter as i64).max(0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Check if an error is worth retrying
    fn is_retryable(&self, error: &PipelineError) -> bool {
        match error {
            // Transient: the next attempt may succeed
            PipelineError::Transport(_) => true,
            PipelineError::Timeout { .. } => true,
            PipelineError::Http(_) => true,
            PipelineError::Generic(_) => true,

            // Permanent: same input will fail the same way
            PipelineError::MalformedReply(_) => false,
            PipelineError::UnknownDiagnosis(_) => false,
            PipelineError::InvalidImage(_) => false,
            PipelineError::Config(_) => false,

            _ => false,
        }
    }

    /// Get configured retry bound
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::new();

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = policy
            .execute_with_retry(move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Ok::<i32, PipelineError>(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(*attempt_count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let policy = RetryPolicy::with_config(2, 10);

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = policy
            .execute_with_retry(move || {
                let count = count_clone.clone();
                async move {
                    let mut attempts = count.lock().unwrap();
                    *attempts += 1;
                    let current = *attempts;
                    drop(attempts);

                    if current < 3 {
                        Err(PipelineError::Transport("503".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*attempt_count.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy::with_config(2, 10);

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result: Result<i32> = policy
            .execute_with_retry(move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Err(PipelineError::Timeout { duration_ms: 30_000 })
                }
            })
            .await;

        // 1 initial attempt + 2 retries
        assert_eq!(*attempt_count.lock().unwrap(), 3);
        assert!(matches!(
            result.unwrap_err(),
            PipelineError::Timeout { duration_ms: 30_000 }
        ));
    }

    #[tokio::test]
    async fn test_malformed_reply_not_retried() {
        let policy = RetryPolicy::new();

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result: Result<i32> = policy
            .execute_with_retry(move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Err(PipelineError::MalformedReply("not json".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(*attempt_count.lock().unwrap(), 1);
    }

    #[test]
    fn test_calculate_delay_progression() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            enable_jitter: false,
        };

        assert_eq!(policy.calculate_delay(1), Duration::from_millis(1_000));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(2_000));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(4_000));
    }

    #[test]
    fn test_delay_cap() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: false,
        };

        assert_eq!(policy.calculate_delay(10), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn test_is_retryable_classification() {
        let policy = RetryPolicy::new();

        assert!(policy.is_retryable(&PipelineError::Transport("503".to_string())));
        assert!(policy.is_retryable(&PipelineError::Timeout { duration_ms: 1 }));
        assert!(!policy.is_retryable(&PipelineError::MalformedReply("x".to_string())));
        assert!(!policy.is_retryable(&PipelineError::Config("x".to_string())));
        assert!(!policy.is_retryable(&PipelineError::InvalidImage("x".to_string())));
    }
}
