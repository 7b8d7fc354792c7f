//! Exponential backoff for transient remote failures.

use super::error::RemoteError;
use crate::cancel::CancellationToken;
use gk_protocol::config_models::RetrySettings;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retries transient failures with exponential backoff.
///
/// Only [`RemoteError::is_transient`] failures are retried; everything else
/// propagates immediately. With the defaults the delays are 1, 2, 4, 8 and
/// 16 seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: Duration::MAX,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1_u32 << shift)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out.
    ///
    /// `operation` receives the 1-based attempt number. A server-provided
    /// retry-after hint lengthens the backoff but never shortens it. Waiting
    /// between attempts observes `cancel`.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RemoteError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RemoteError::Canceled);
            }
            attempt += 1;

            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retry = attempt;
            if !err.is_transient() || retry > self.max_retries {
                if err.is_transient() {
                    warn!(attempts = attempt, error = %err, "retries exhausted");
                } else {
                    debug!(attempt, error = %err, "permanent failure, not retrying");
                }
                return Err(err);
            }

            let mut delay = self.delay_for(retry);
            if let RemoteError::TooManyRequests {
                retry_after: Some(retry_after),
            } = &err
            {
                delay = delay.max(*retry_after);
            }
            warn!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient failure, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(RemoteError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn transport() -> RemoteError {
        RemoteError::Transport("connection reset".to_string())
    }

    #[test]
    fn test_delay_doubles_from_base() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=5).map(|retry| policy.delay_for(retry).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1)).with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for(8), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result = RetryPolicy::default()
            .execute(&CancellationToken::new(), |attempt| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 4 {
                        Err(transport())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(started.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = RetryPolicy::default()
            .execute(&CancellationToken::new(), |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(RemoteError::from_status(400, "bad request"))
                }
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Status { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: Result<(), _> = RetryPolicy::default()
            .execute(&CancellationToken::new(), |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(RemoteError::TooManyRequests { retry_after: None })
                }
            })
            .await;

        assert!(matches!(result, Err(RemoteError::TooManyRequests { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert!(started.elapsed() >= Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_extends_delay() {
        let started = Instant::now();

        let result = RetryPolicy::default()
            .execute(&CancellationToken::new(), |attempt| async move {
                if attempt == 1 {
                    Err(RemoteError::TooManyRequests {
                        retry_after: Some(Duration::from_secs(30)),
                    })
                } else {
                    Ok(())
                }
            })
            .await;

        assert_eq!(result, Ok(()));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        let result: Result<(), _> = RetryPolicy::default()
            .execute(&cancel, |_| async { Err(transport()) })
            .await;

        assert_eq!(result, Err(RemoteError::Canceled));
    }
}
