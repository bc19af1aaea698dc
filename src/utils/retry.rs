//! Retry utilities for transient network failures
//!
//! Exponential backoff with optional jitter, shared by the playlist fetcher
//! and the playback controller's retry schedule.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::SourceResult;
use crate::utils::jitter::generate_jitter_percent;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Policy for playlist downloads: `retries` extra attempts after the first
    pub fn for_fetches(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            ..Self::default()
        }
    }

    /// Uncapped doubling without jitter, as used by the playback retry schedule
    pub fn exponential(base_delay: Duration) -> Self {
        Self {
            max_attempts: u32::MAX,
            initial_delay: base_delay,
            max_delay: Duration::MAX,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

/// Execute a fallible source operation with retry logic
///
/// Non-retryable errors (see [`SourceError::is_retryable`](crate::errors::SourceError::is_retryable)) are returned
/// immediately; otherwise the last error is returned once attempts run out.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
    operation_name: &str,
) -> SourceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SourceResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        "Operation '{}' succeeded on attempt {}/{}",
                        operation_name, attempt, max_attempts
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_retryable() => {
                debug!(
                    "Operation '{}' failed with non-retryable error: {}",
                    operation_name, err
                );
                return Err(err);
            }
            Err(err) if attempt >= max_attempts => {
                warn!(
                    "Operation '{}' failed after {} attempts: {}",
                    operation_name, max_attempts, err
                );
                return Err(err);
            }
            Err(err) => {
                let delay = calculate_delay(config, attempt);
                warn!(
                    "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name, attempt, max_attempts, delay, err
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): `initial × multiplier^(attempt-1)`
pub fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let exponential_delay =
        config.initial_delay.as_millis() as f64 * config.backoff_multiplier.powi(exponent);

    let delay_ms = exponential_delay.min(config.max_delay.as_millis() as f64) as u64;

    let final_delay = if config.jitter {
        delay_ms.saturating_add(generate_jitter_percent(delay_ms, 25))
    } else {
        delay_ms
    };

    Duration::from_millis(final_delay)
}
