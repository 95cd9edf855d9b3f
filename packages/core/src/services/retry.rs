//! Retry logic with exponential backoff.
//!
//! Only transient storage failures (lock contention) are retried; the caller
//! decides which errors qualify through the `is_retryable` predicate.
//!
//! # Example
//!
//! ```
//! use nodetree_core::services::RetryConfig;
//!
//! let query = RetryConfig::query();
//! assert_eq!(query.max_retries, 3);
//!
//! let none = RetryConfig::no_retry();
//! assert_eq!(none.max_retries, 0);
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for transaction retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Retries after the first attempt (0 = run once)
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::query()
    }
}

impl RetryConfig {
    /// Quick retry for individual transactions.
    /// 3 retries with fast backoff - if it still fails, let the caller handle it.
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            factor: 2.0,
        }
    }

    /// Run once, never retry
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::query()
        }
    }

    /// Fast retry for tests (minimal delays)
    #[must_use]
    pub fn test() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Run `operation`, re-running it while it fails with a retryable error.
///
/// Non-retryable errors are returned immediately; a retryable error is
/// returned once `max_retries` retries have been used up.
pub async fn retry<F, Fut, T, E, P>(
    operation_name: &str,
    config: &RetryConfig,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut delay = config.initial_delay;
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if retries > 0 {
                    info!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, retries
                    );
                }
                return Ok(val);
            }
            Err(err) if is_retryable(&err) && retries < config.max_retries => {
                retries += 1;
                warn!(
                    "Operation '{}' failed (retry {}/{}): {}. Next retry in {:?}...",
                    operation_name, retries, config.max_retries, err, delay
                );
                sleep(delay).await;
                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.factor).min(config.max_delay.as_secs_f64()),
                );
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let attempts = AtomicUsize::new(0);

        let result: Result<&str, String> = retry(
            "flaky",
            &RetryConfig::test(),
            |e: &String| e == "busy",
            || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("busy".to_string())
                } else {
                    Ok("done")
                }
            },
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_returns_immediately() {
        let attempts = AtomicUsize::new(0);

        let result: Result<(), String> = retry(
            "rejected",
            &RetryConfig::test(),
            |e: &String| e == "busy",
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("conflict".to_string())
            },
        )
        .await;

        assert_eq!(result, Err("conflict".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicUsize::new(0);

        let result: Result<(), String> = retry(
            "always-busy",
            &RetryConfig::test().with_max_retries(2),
            |_| true,
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("busy".to_string())
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_presets() {
        assert_eq!(RetryConfig::default(), RetryConfig::query());
        assert_eq!(RetryConfig::no_retry().max_retries, 0);
    }
}
