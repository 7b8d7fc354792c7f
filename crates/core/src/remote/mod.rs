//! Remote call plumbing: the client contract plus the retry and rate-limit
//! policies wrapped around it.

pub mod error;
pub mod guarded;
pub mod rate_limit;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::RemoteError;
pub use guarded::GuardedClient;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

/// A request to a remote agent service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    /// Operation or route name.
    pub operation: String,

    pub body: serde_json::Value,
}

impl RemoteRequest {
    pub fn new(operation: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            operation: operation.into(),
            body,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl RemoteResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into a [`RemoteError`].
    pub fn error_for_status(self) -> Result<Self, RemoteError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(RemoteError::from_status(self.status, self.body.to_string()))
        }
    }

    /// The body as text: strings are returned unquoted.
    pub fn text(&self) -> String {
        match &self.body {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Request/response transport to a remote service.
///
/// Implementations report failures using the [`RemoteError`] taxonomy so the
/// retry policy can tell transient failures apart.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_for_status() {
        assert!(RemoteResponse::ok(json!("fine")).error_for_status().is_ok());

        let throttled = RemoteResponse {
            status: 429,
            body: json!(null),
        };
        assert_eq!(
            throttled.error_for_status(),
            Err(RemoteError::TooManyRequests { retry_after: None })
        );
    }

    #[test]
    fn test_response_text() {
        assert_eq!(RemoteResponse::ok(json!("plain")).text(), "plain");
        assert_eq!(RemoteResponse::ok(json!(null)).text(), "");
        assert_eq!(RemoteResponse::ok(json!({"a": 1})).text(), r#"{"a":1}"#);
    }
}
