//! Bounded retry with exponential backoff
//!
//! Only errors for which [`crate::Error::is_retryable`] holds are retried. Terminal
//! errors (image not found, malformed labels, detection failure) are returned
//! on the first attempt.

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use crate::Result;

/// Retry limits for one class of remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.initial_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Run `operation` until it succeeds, fails terminally, or the policy runs out.
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "object store upload")
/// * `policy` - Attempt count and backoff bounds
/// * `operation` - Async closure performing one attempt
pub async fn retry_transient<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation = operation_name, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                tracing::error!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Operation failed: retries exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let result = retry_transient("test_op", fast(), || async { Ok::<i32, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_errors() {
        let attempts = AtomicU32::new(0);

        let result = retry_transient("test_op", fast(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(Error::StoreRead {
                        key: "a.jpg".into(),
                        message: "connection reset".into(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);

        let result = retry_transient("test_op", fast(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), Error>(Error::StoreWrite {
                    key: "a.jpg".into(),
                    message: "throttled".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(Error::StoreWrite { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_fails_immediately() {
        let attempts = AtomicU32::new(0);

        let result = retry_transient("test_op", fast(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), Error>(Error::ImageNotFound { key: "gone.jpg".into() }) }
        })
        .await;

        assert!(matches!(result, Err(Error::ImageNotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(10), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for(200), Duration::from_millis(2000));
    }
}
