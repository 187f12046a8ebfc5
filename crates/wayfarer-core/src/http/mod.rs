//! Shared request engine for routing API providers
//!
//! This module provides the provider-agnostic core with:
//! - Deterministic query-string encoding (stable key order)
//! - Request assembly from logical call descriptions
//! - A time-budgeted retry loop with exponential backoff
//! - Error classification into a closed, provider-independent taxonomy
//! - A narrow transport seam so any HTTP stack can carry the exchange

pub mod builder;
pub mod client;
pub mod encode;
pub mod error;
pub mod retry;
pub mod transport;

pub use builder::{build, PreparedRequest, RequestEcho, RequestSpec};
pub use client::{
    ApiResponse, ClientConfig, Router, DEFAULT_RETRY_TIMEOUT, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};
pub use encode::encode;
pub use error::{classify_status, ApiError, ErrorKind, RateLimitMarker, StatusOnly};
pub use retry::{execute_with_retry, RetryDecision, RetryPolicy, RetryState};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportReply};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
