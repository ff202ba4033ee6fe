//! Retry logic with exponential backoff.
//!
//! Waiting goes through a [`Sleeper`] so callers can swap the tokio timer for
//! a recording fake in tests.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call (0 = no retries).
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::generation()
    }
}

impl RetryConfig {
    /// Create a config with no retries (fail fast).
    pub fn no_retry() -> Self {
        Self { max_attempts: 0, ..Default::default() }
    }

    /// Policy for text-generation calls: 3 retries, 2s, 4s, 8s.
    pub fn generation() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }

    /// Wait before retry number `retry` (1-based): `initial * multiplier^(retry-1)`,
    /// capped at `max_delay`. No jitter.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let Some(exponent) = retry.checked_sub(1) else {
            return Duration::ZERO;
        };

        let scaled = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent as i32);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled)
    }
}

/// Something that can wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timer backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Fake clock that records every requested delay and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.delays.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,

    /// Whether the operation was retried.
    pub was_retried: bool,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry an async operation while `should_retry` accepts the error.
///
/// Errors rejected by `should_retry` end the loop immediately.
pub async fn retry_async<T, E, F, Fut, P>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    should_retry: P,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempts = 0;
    let max_attempts = config.max_attempts + 1;

    loop {
        attempts += 1;
        let result = operation().await;

        let retryable = matches!(&result, Err(e) if should_retry(e));
        if !retryable || attempts >= max_attempts {
            return RetryResult { result, attempts, was_retried: attempts > 1 };
        }

        let delay = config.delay_for_attempt(attempts);
        tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Retrying after backoff");
        sleeper.sleep(delay).await;
    }
}
