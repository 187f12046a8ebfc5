//! Wayfarer Core - shared request engine for routing API clients
//!
//! Every provider in the wayfarer family (Graphhopper and siblings) exposes
//! the same three logical operations - directions, isochrones, distance
//! matrix - as thin parameter-marshaling methods. The hard part lives here:
//! turning an operation's parameters into an HTTP request, applying
//! authentication, serializing query data deterministically, retrying on
//! transient failure within a bounded time budget, and classifying failures
//! into a stable taxonomy independent of the provider that raised them.
//!
//! # Main Components
//!
//! - **Error Handling**: typed errors via `thiserror` plus the closed
//!   [`ErrorKind`] taxonomy
//! - **Parameter Encoder**: canonical, order-deterministic query strings
//! - **Request Builder**: [`RequestSpec`] to [`PreparedRequest`] assembly
//! - **Retry Controller**: wall-clock-budgeted exponential backoff
//! - **Router**: the `request` entry point consumed by provider methods
//!
//! # Example
//!
//! ```no_run
//! use wayfarer_core::{ClientConfig, RequestSpec, Result, Router};
//!
//! async fn example() -> Result<()> {
//!     let config = ClientConfig::new("http://localhost:8989")
//!         .with_retry_timeout(std::time::Duration::from_secs(10));
//!     let router = Router::new(config)?;
//!
//!     let spec = RequestSpec::get("/route")
//!         .with_param("profile", "car")
//!         .with_param("point", "49.415776,8.680916")
//!         .with_param("point", "49.420318,8.687872");
//!     let payload = router.request(spec).await?.into_payload()?;
//!     println!("{}", payload);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use http::{
    ApiError, ApiResponse, ClientConfig, ErrorKind, Method, PreparedRequest, RateLimitMarker,
    RequestEcho, RequestSpec, RetryPolicy, Router, StatusCode, StatusOnly, Transport,
    TransportError, TransportReply,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
