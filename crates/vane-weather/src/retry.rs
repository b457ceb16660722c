//! Retry driver with exponential backoff.
//!
//! `max_attempts` counts total calls to the operation, not retries: a
//! config of 3 makes at most 3 calls. The delay doubles after every failed
//! attempt. Both the in-flight attempt and the inter-attempt wait race the
//! cancellation token, so a cancelled caller gets an answer within one
//! backoff step at worst.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 500;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of calls to the operation.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after every failure.
    pub initial_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }
}

/// Why the retry driver gave up.
///
/// `Cancelled` is deliberately distinct from `Exhausted`: a cancelled caller
/// must never be told the upstream ran out of attempts.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every permitted attempt failed; carries the final attempt's error.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// The cancellation token fired before the operation succeeded.
    #[error("cancelled while retrying")]
    Cancelled,
}

/// Drives `operation` until it succeeds, the attempt budget runs out, or
/// `cancel` fires.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut attempt = 1u32;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let outcome = tokio::select! {
            result = operation() => result,
            () = cancel.cancelled() => return Err(RetryError::Cancelled),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("operation succeeded on attempt {} of {}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(last) if attempt >= max_attempts => {
                tracing::warn!("all {} attempts failed: {}", max_attempts, last);
                return Err(RetryError::Exhausted {
                    attempts: max_attempts,
                    last,
                });
            }
            Err(e) => {
                tracing::debug!(
                    "attempt {} of {} failed: {}, retrying in {:?}",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = cancel.cancelled() => return Err(RetryError::Cancelled),
                }
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}
