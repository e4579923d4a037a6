//! Retry utilities for publish attempts
//!
//! A small higher-order wrapper: run an async operation up to
//! `max_retries + 1` times, sleeping a linearly growing delay between
//! attempts. Sleeping goes through a [`Clock`] so backoff can be observed in
//! tests without waiting.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::clock::Clock;
use super::truncate_text;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Base delay; the wait after attempt `n` (0-based) is `base_delay * (n + 1)`
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Total attempts including the first one
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after the failed attempt with index `attempt`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }
}

/// Execute an operation with retry logic and linear backoff
///
/// `operation` receives the 0-based attempt index. `on_failure` is invoked
/// for every failed attempt, including the last one, before any backoff
/// sleep. Returns the first success or the error of the final attempt.
///
/// # Example
///
/// ```no_run
/// use autoposter::utils::clock::SystemClock;
/// use autoposter::utils::retry::{with_retry, RetryConfig};
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), String> {
/// let config = RetryConfig::new(2, Duration::from_secs(5));
/// let value = with_retry(
///     &config,
///     &SystemClock,
///     |_attempt| async { Ok::<_, String>(42) },
///     |_attempt, _err| {},
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<T, E, F, Fut, H>(
    config: &RetryConfig,
    clock: &dyn Clock,
    mut operation: F,
    mut on_failure: H,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: FnMut(u32, &E),
{
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                on_failure(attempt, &e);

                if attempt >= config.max_retries {
                    warn!(
                        attempts = config.attempts(),
                        error = %truncate_text(&e.to_string(), 100),
                        "Operation failed, retries exhausted"
                    );
                    return Err(e);
                }

                let delay = config.calculate_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    attempts = config.attempts(),
                    delay_secs = delay.as_secs(),
                    error = %truncate_text(&e.to_string(), 100),
                    "Operation failed, will retry"
                );
                clock.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
