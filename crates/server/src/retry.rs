//! Bounded retry with exponential backoff for upstream HTTP calls.
//!
//! Only transient failures are retried: connection and timeout errors,
//! 5xx responses, and 429s. A 429's `Retry-After` is honoured up to
//! [`MAX_RETRY_AFTER`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Longest `Retry-After` we are willing to sleep inside a request.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any computed delay
    pub max_delay: Duration,
    /// Factor to multiply delay by after each attempt
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Backoff before retry number `retry` (1-based), without jitter.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Errors that know whether they are worth retrying.
pub trait Transient {
    /// Whether another attempt might succeed.
    fn is_transient(&self) -> bool;

    /// Server-requested delay, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Classify a reqwest transport error.
#[must_use]
pub fn is_transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Run `operation` until it succeeds, fails permanently, or retries run out.
pub async fn with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + std::fmt::Display,
{
    let mut retry = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if retry > 0 {
                    debug!(label, retries = retry, "Upstream call succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if retry >= config.max_retries || !error.is_transient() {
                    return Err(error);
                }
                retry += 1;

                let delay = next_delay(config, retry, error.retry_after());
                warn!(
                    label,
                    retry,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "Transient upstream failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Delay before the next attempt: the server's `Retry-After` when present,
/// otherwise exponential backoff with up to 25% random jitter.
fn next_delay(config: &RetryConfig, retry: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(after) = retry_after {
        return after.min(MAX_RETRY_AFTER);
    }

    let base = config.backoff(retry);
    let jitter_cap = u64::try_from(base.as_millis() / 4).unwrap_or(0);
    if jitter_cap == 0 {
        return base;
    }
    let jitter = rand::rng().random_range(0..=jitter_cap);
    (base + Duration::from_millis(jitter)).min(config.max_delay)
}
