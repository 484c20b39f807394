//! Caller-side retry with exponential backoff for turns.
//!
//! The engine never retries a failed generation on its own. Hosts wrap
//! `process_turn` in [`with_retry`], which retries only errors that report
//! themselves as retryable (rate limits, unavailable models, timeouts) and
//! honours a provider's retry-after hint when it is longer than the backoff.

use muse_core::TurnError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for each subsequent delay.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is exhausted. The last error is returned unchanged.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T, TurnError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TurnError>>,
{
    let mut delay = config.initial_delay;
    let max_attempts = config.max_attempts.max(1);

    let mut attempt = 1;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }

        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..500));
        let sleep_time = (delay + jitter).max(err.retry_after().unwrap_or_default());
        tracing::warn!(
            "{} failed on attempt {}/{}: {}; retrying in {:.1}s",
            label,
            attempt,
            max_attempts,
            err,
            sleep_time.as_secs_f64()
        );
        tokio::time::sleep(sleep_time).await;

        delay = Duration::from_secs_f64(
            (delay.as_secs_f64() * config.backoff_factor).min(config.max_delay.as_secs_f64()),
        );
        attempt += 1;
    }
}
