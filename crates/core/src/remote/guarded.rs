//! A remote client wrapped in rate limiting and retries.

use super::error::RemoteError;
use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;
use super::{RemoteClient, RemoteRequest, RemoteResponse};
use crate::cancel::CancellationToken;
use gk_protocol::config_models::Settings;
use std::sync::Arc;
use tracing::debug;

/// Sends requests through a shared [`RateLimiter`], retrying transient
/// failures with a [`RetryPolicy`]. Every attempt takes its own permit.
pub struct GuardedClient<C> {
    inner: C,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
}

impl<C: RemoteClient> GuardedClient<C> {
    pub fn new(inner: C, retry: RetryPolicy, limiter: Arc<RateLimiter>) -> Self {
        Self {
            inner,
            retry,
            limiter,
        }
    }

    /// Build from the `[retry]` and `[rate_limit]` settings.
    pub fn from_settings(inner: C, settings: &Settings) -> Self {
        Self::new(
            inner,
            RetryPolicy::from(&settings.retry),
            Arc::new(RateLimiter::from(&settings.rate_limit)),
        )
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Send `request`, waiting for a permit before each attempt.
    ///
    /// Non-success statuses are mapped to [`RemoteError`], so a 429 is
    /// retried like a transport failure.
    pub async fn send(
        &self,
        request: &RemoteRequest,
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, RemoteError> {
        self.retry
            .execute(cancel, move |attempt| async move {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RemoteError::Canceled),
                    permit = self.limiter.acquire() => permit?,
                }
                debug!(operation = %request.operation, attempt, "sending remote request");

                tokio::select! {
                    _ = cancel.cancelled() => Err(RemoteError::Canceled),
                    response = self.inner.send(request) => response?.error_for_status(),
                }
            })
            .await
    }
}
