//! Error classification for HTTP exchanges
//!
//! Maps transport outcomes (status code, body, transport failure) onto a
//! closed taxonomy of error kinds that is independent of which provider
//! raised them. Rate-limit detection beyond HTTP 429 is delegated to a
//! provider-supplied predicate, so adding a provider never touches this
//! module.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::http::transport::TransportError;

/// Closed classification of a failed call, independent of provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Retry budget exhausted, a per-attempt timeout, or another
    /// transport-level failure still eligible for retry
    Timeout,
    /// Rate limited: HTTP 429 or a provider-flagged body
    OverQueryLimit,
    /// Client-side error: 4xx other than 429, or an unbuildable request
    InvalidRequest,
    /// Upstream 5xx
    ServerError,
    /// Unclassified non-2xx or a response that cannot be decoded
    Unknown,
}

impl ErrorKind {
    /// Whether a failure of this kind may be retried under the time budget.
    ///
    /// `OverQueryLimit` is only retriable when the client opted in via
    /// `retry_over_query_limit`.
    pub fn is_retryable(&self, retry_over_query_limit: bool) -> bool {
        match self {
            ErrorKind::ServerError | ErrorKind::Timeout => true,
            ErrorKind::OverQueryLimit => retry_over_query_limit,
            ErrorKind::InvalidRequest | ErrorKind::Unknown => false,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::OverQueryLimit => write!(f, "OverQueryLimit"),
            ErrorKind::InvalidRequest => write!(f, "InvalidRequest"),
            ErrorKind::ServerError => write!(f, "ServerError"),
            ErrorKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Provider-supplied predicate deciding whether a response body is a
/// rate-limit notice, independent of the status code.
///
/// Providers that signal rate limiting only through HTTP 429 can use the
/// [`StatusOnly`] default.
pub trait RateLimitMarker: Send + Sync {
    /// Check whether the decoded body flags a rate limit.
    fn is_rate_limited(&self, body: &Value) -> bool;
}

/// Default marker: relies on HTTP 429 alone, never inspects the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOnly;

impl RateLimitMarker for StatusOnly {
    fn is_rate_limited(&self, _body: &Value) -> bool {
        false
    }
}

/// A failed API call, carrying the original status and body when available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Taxonomy kind driving retry decisions
    pub kind: ErrorKind,
    /// HTTP status code, if a response was received
    pub status: Option<u16>,
    /// Decoded response body, if one was received and parseable
    pub body: Option<Value>,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create an error with no attached response.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// Shorthand for a client-side `InvalidRequest` failure.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Classify a non-2xx response.
    pub fn from_status(status: u16, raw_body: &str, marker: &dyn RateLimitMarker) -> Self {
        let body = serde_json::from_str::<Value>(raw_body).ok();
        let kind = classify_status(status, body.as_ref(), marker);
        let message = extract_message(body.as_ref(), raw_body);

        Self {
            kind,
            status: Some(status),
            body,
            message,
        }
    }

    /// Classify a transport-level failure with no response attached.
    ///
    /// All of these are retriable under the time budget, so they carry the
    /// `Timeout` kind; the retry loop surfaces them once the budget is spent.
    pub fn from_transport(error: TransportError) -> Self {
        Self::new(ErrorKind::Timeout, error.to_string())
    }

    /// Re-tag this error as the terminal `Timeout` surfaced when the retry
    /// budget is exhausted, keeping the last response's status and body.
    pub fn into_budget_timeout(self, budget: Duration) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            status: self.status,
            body: self.body,
            message: format!(
                "retry budget of {:?} exhausted; last error: {}",
                budget, self.message
            ),
        }
    }

    /// Whether this error may be retried under the time budget.
    pub fn is_retryable(&self, retry_over_query_limit: bool) -> bool {
        self.kind.is_retryable(retry_over_query_limit)
    }
}

/// Classify a response status against the closed taxonomy.
///
/// Priority: 429 or a provider-flagged body wins over the status ranges, so
/// a provider that reports rate limits with a 403 or 500 still classifies as
/// `OverQueryLimit`.
pub fn classify_status(status: u16, body: Option<&Value>, marker: &dyn RateLimitMarker) -> ErrorKind {
    let flagged = body.map(|b| marker.is_rate_limited(b)).unwrap_or(false);
    if status == 429 || flagged {
        return ErrorKind::OverQueryLimit;
    }

    match status {
        500..=599 => ErrorKind::ServerError,
        400..=499 => ErrorKind::InvalidRequest,
        _ => ErrorKind::Unknown,
    }
}

/// Pull a human-readable message out of a decoded error body.
fn extract_message(body: Option<&Value>, raw_body: &str) -> String {
    if let Some(json) = body {
        if let Some(message) = json.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    raw_body.to_string()
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API error [{}]: {} ({})",
            self.status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no response".to_string()),
            self.message,
            self.kind
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retryability() {
        assert!(ErrorKind::ServerError.is_retryable(false));
        assert!(ErrorKind::Timeout.is_retryable(false));
        assert!(!ErrorKind::OverQueryLimit.is_retryable(false));
        assert!(ErrorKind::OverQueryLimit.is_retryable(true));
        assert!(!ErrorKind::InvalidRequest.is_retryable(true));
        assert!(!ErrorKind::Unknown.is_retryable(true));
    }

    #[test]
    fn test_status_classification() {
        let marker = StatusOnly;
        assert_eq!(classify_status(429, None, &marker), ErrorKind::OverQueryLimit);
        assert_eq!(classify_status(400, None, &marker), ErrorKind::InvalidRequest);
        assert_eq!(classify_status(404, None, &marker), ErrorKind::InvalidRequest);
        assert_eq!(classify_status(500, None, &marker), ErrorKind::ServerError);
        assert_eq!(classify_status(503, None, &marker), ErrorKind::ServerError);
        assert_eq!(classify_status(302, None, &marker), ErrorKind::Unknown);
    }

    #[test]
    fn test_provider_marker_overrides_status_range() {
        struct MessageMarker;
        impl RateLimitMarker for MessageMarker {
            fn is_rate_limited(&self, body: &Value) -> bool {
                body.get("message")
                    .and_then(|m| m.as_str())
                    .map(|m| m.contains("limit"))
                    .unwrap_or(false)
            }
        }

        let body = json!({"message": "API limit reached"});
        assert_eq!(
            classify_status(403, Some(&body), &MessageMarker),
            ErrorKind::OverQueryLimit
        );
        // Same status without the marker stays a plain client error.
        assert_eq!(
            classify_status(403, Some(&json!({"message": "forbidden"})), &MessageMarker),
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn test_from_status_keeps_body_and_message() {
        let error = ApiError::from_status(400, r#"{"message": "unknown profile"}"#, &StatusOnly);
        assert_eq!(error.kind, ErrorKind::InvalidRequest);
        assert_eq!(error.status, Some(400));
        assert_eq!(error.message, "unknown profile");
        assert_eq!(error.body, Some(json!({"message": "unknown profile"})));
    }

    #[test]
    fn test_from_status_falls_back_to_raw_body() {
        let error = ApiError::from_status(502, "Bad Gateway", &StatusOnly);
        assert_eq!(error.kind, ErrorKind::ServerError);
        assert_eq!(error.message, "Bad Gateway");
        assert!(error.body.is_none());
    }

    #[test]
    fn test_budget_timeout_keeps_last_response() {
        let error = ApiError::from_status(503, r#"{"message": "overloaded"}"#, &StatusOnly);
        let surfaced = error.into_budget_timeout(Duration::from_secs(3));
        assert_eq!(surfaced.kind, ErrorKind::Timeout);
        assert_eq!(surfaced.status, Some(503));
        assert!(surfaced.message.contains("retry budget"));
        assert!(surfaced.message.contains("overloaded"));
    }
}
