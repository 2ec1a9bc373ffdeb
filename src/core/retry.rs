//! Retry logic with exponential backoff
//!
//! Used by network-bound publishers. Retrying a publish call is only safe
//! because every request carries an idempotency key.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Options for retry behavior
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry manager for executing operations with exponential backoff
pub struct RetryManager {
    options: RetryOptions,
}

impl RetryManager {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    /// Execute the given async operation, retrying transient failures
    pub async fn retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut delay = self.options.initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !is_transient_error(&error) || attempt >= self.options.max_attempts.max(1) {
                        return Err(error);
                    }

                    debug!(attempt, delay_ms = delay.as_millis() as u64, %error, "retrying transient failure");
                    sleep(delay).await;

                    delay = Duration::from_secs_f64(
                        delay.as_secs_f64() * self.options.backoff_multiplier,
                    )
                    .min(self.options.max_delay);
                    attempt += 1;
                }
            }
        }
    }
}

/// Network errors, timeouts and 5xx/429 responses are worth retrying
pub fn is_transient_error<E: std::fmt::Display>(error: &E) -> bool {
    let error_msg = error.to_string().to_lowercase();

    const TRANSIENT_PATTERNS: &[&str] = &[
        "econnrefused",
        "econnreset",
        "etimedout",
        "connection refused",
        "connection reset",
        "network error",
        "timed out",
        "timeout",
        "http 429",
        "http 502",
        "http 503",
        "http 504",
    ];

    TRANSIENT_PATTERNS
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}
