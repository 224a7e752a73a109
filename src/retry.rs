//! Retry logic with linear backoff
//!
//! Every failed attempt is retried until the attempt budget is spent. The sleep after
//! attempt `i` (0-based) is `base_delay * (i + 1)`, so delays grow strictly and there
//! is no sleep after the last attempt.
//!
//! # Example
//!
//! ```no_run
//! use catalog_crawler::retry::fetch_with_retry;
//! use catalog_crawler::config::RetryConfig;
//!
//! # async fn example() {
//! let config = RetryConfig::default();
//! let result = fetch_with_retry(&config, |_attempt| async {
//!     // Your operation here
//!     Ok::<_, String>(42)
//! })
//! .await;
//! assert_eq!(result.ok(), Some(42));
//! # }
//! ```

use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;

/// All attempts failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// Number of attempts made
    pub attempts: u32,
    /// Error returned by the final attempt
    pub last_error: E,
}

/// Delay to wait after the failed attempt with 0-based index `attempt_index`.
///
/// # Examples
///
/// ```
/// use catalog_crawler::retry::backoff_delay;
/// use std::time::Duration;
///
/// let base = Duration::from_secs(1);
/// assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
/// assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
/// ```
pub fn backoff_delay(base_delay: Duration, attempt_index: u32) -> Duration {
    base_delay.saturating_mul(attempt_index.saturating_add(1))
}

/// Execute an async operation, retrying every failure with linear backoff.
///
/// The operation receives the 0-based index of the current attempt. At least one
/// attempt is made even if `config.max_attempts` is zero.
///
/// # Returns
///
/// The first successful result, or the last error together with the number of
/// attempts once the budget is exhausted.
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt + 1 < max_attempts => {
                let delay = backoff_delay(config.base_delay, attempt);

                tracing::debug!(
                    error = %e,
                    attempt = attempt + 1,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    attempts = attempt + 1,
                    "Operation failed after all retry attempts exhausted"
                );
                return Err(RetryExhausted {
                    attempts: attempt + 1,
                    last_error: e,
                });
            }
        }
    }
}
