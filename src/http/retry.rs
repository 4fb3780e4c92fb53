//! Retry logic for feed requests.

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::TransportError;

/// Maximum number of attempts for one request.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// How many times and how often a request is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

/// Executes an async operation with retry logic.
///
/// Only transient failures (see [`TransportError::is_retryable`]) are
/// retried. The wait between attempts ends early with
/// [`TransportError::Cancelled`] when `cancel` fires; an attempt that is
/// already running is never interrupted.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, TransportError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => {
                debug!("{}: non-retryable error: {}", operation_name, e);
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                debug!(
                    "{}: giving up after {} attempts: {}",
                    operation_name, attempt, e
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                    operation_name,
                    attempt,
                    max_attempts,
                    e,
                    policy.delay.as_millis()
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(TransportError::Cancelled(operation_name.to_string()));
                    }
                    _ = tokio::time::sleep(policy.delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        }
    }

    fn server_error() -> TransportError {
        TransportError::Status {
            uri: "http://testsource".to_string(),
            status: 503,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, MAX_RETRIES);
        assert_eq!(policy.delay, Duration::from_millis(RETRY_DELAY_MS));
    }

    #[tokio::test]
    async fn test_with_retry_success() {
        let cancel = CancellationToken::new();
        let result = with_retry("test", fast_policy(), &cancel, || async {
            Ok::<_, TransportError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_retry_immediate_failure_on_non_retryable() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let result = with_retry("test", fast_policy(), &cancel, || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TransportError::Status {
                    uri: "http://testsource".to_string(),
                    status: 404,
                })
            }
        })
        .await;

        assert!(matches!(result, Err(TransportError::Status { status: 404, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_retries_on_server_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let result = with_retry("test", fast_policy(), &cancel, || {
            let attempts = Arc::clone(&attempts);
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                if count < 2 { Err(server_error()) } else { Ok(42) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let result = with_retry("test", fast_policy(), &cancel, || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(server_error())
            }
        })
        .await;

        assert!(matches!(result, Err(TransportError::Status { status: 503, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_stops_waiting_when_cancelled() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(60),
        };

        let token = cancel.clone();
        let result = with_retry("test", policy, &cancel, || {
            let attempts = Arc::clone(&attempts);
            let token = token.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                token.cancel();
                Err::<i32, _>(server_error())
            }
        })
        .await;

        assert!(matches!(result, Err(TransportError::Cancelled(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
