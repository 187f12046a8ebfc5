//! Router core orchestrating build, retry, and classification per logical call
//!
//! Every provider-specific method funnels into [`Router::request`]: assemble
//! the request, short-circuit on dry runs, then drive the transport through
//! the time-budgeted retry loop and classify whatever comes back.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::http::builder::{self, PreparedRequest, RequestEcho, RequestSpec};
use crate::http::error::{ApiError, ErrorKind, RateLimitMarker, StatusOnly};
use crate::http::retry::{execute_with_retry, RetryPolicy};
use crate::http::transport::{ReqwestTransport, Transport};
use crate::{Error, Result};

/// Default user agent advertised by clients built on this engine.
pub const DEFAULT_USER_AGENT: &str = concat!("wayfarer/", env!("CARGO_PKG_VERSION"));

/// Default per-attempt connect/read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default wall-clock budget across all attempts of one logical call.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable configuration for one [`Router`] instance.
///
/// There are no process-wide mutable defaults: every knob is fixed here at
/// construction time.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    /// API key, when the endpoint requires one
    pub api_key: Option<String>,
    /// The provider's hosted endpoint that mandates an API key, if any
    pub hosted_url: Option<String>,
    /// Value of the default `User-Agent` header
    pub user_agent: String,
    /// Per-attempt connect/read timeout; `None` disables the inner bound
    pub timeout: Option<Duration>,
    /// Wall-clock budget across all attempts of one logical call
    pub retry_timeout: Duration,
    /// Proxy URL handed to the transport
    pub proxy: Option<String>,
    /// Whether HTTP 429 responses are retried under the budget
    pub retry_over_query_limit: bool,
    /// Backoff shape for the retry loop
    pub retry_policy: RetryPolicy,
}

impl ClientConfig {
    /// Configuration for the given base URL with library defaults.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            hosted_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            proxy: None,
            retry_over_query_limit: false,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Mark the hosted endpoint that requires an API key.
    pub fn with_hosted_url(mut self, hosted_url: impl Into<String>) -> Self {
        self.hosted_url = Some(hosted_url.into());
        self
    }

    /// Set the `User-Agent` header value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set or disable the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry budget.
    pub fn with_retry_timeout(mut self, retry_timeout: Duration) -> Self {
        self.retry_timeout = retry_timeout;
        self
    }

    /// Route exchanges through a proxy.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Opt in to retrying rate-limited calls under the budget.
    pub fn with_retry_over_query_limit(mut self, retry: bool) -> Self {
        self.retry_over_query_limit = retry;
        self
    }

    /// Replace the backoff policy.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Default headers merged into every request. Per-call overrides win.
    pub(crate) fn default_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }

    fn validate(&self) -> Result<()> {
        if let Some(hosted) = &self.hosted_url {
            if self.base_url == *hosted && self.api_key.is_none() {
                return Err(Error::Configuration {
                    message: format!("an API key is required for the hosted endpoint {}", hosted),
                    source: None,
                });
            }
        }
        Ok(())
    }
}

/// Outcome of a logical call: a decoded payload, or the dry-run echo.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Decoded JSON payload from a completed exchange
    Payload(Value),
    /// Description of the request that would have been sent
    DryRun(RequestEcho),
}

impl ApiResponse {
    /// The decoded payload; fails if this was a dry run.
    pub fn into_payload(self) -> Result<Value> {
        match self {
            ApiResponse::Payload(value) => Ok(value),
            ApiResponse::DryRun(echo) => Err(Error::Api(ApiError::invalid_request(format!(
                "dry run produced no payload: {}",
                echo
            )))),
        }
    }

    /// The dry-run echo, if this call was a dry run.
    pub fn dry_run_echo(&self) -> Option<&RequestEcho> {
        match self {
            ApiResponse::DryRun(echo) => Some(echo),
            ApiResponse::Payload(_) => None,
        }
    }
}

/// Shared request engine consumed by every provider-specific method.
///
/// Holds no mutable state beyond the immutable config and the shared
/// transport, so one instance may serve concurrent calls whenever the
/// transport itself is safe for concurrent use.
pub struct Router {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    rate_limit_marker: Arc<dyn RateLimitMarker>,
}

impl Router {
    /// Build a router with the production `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::build(
            config.timeout,
            config.proxy.as_deref(),
        )?);
        Self::with_transport(config, transport)
    }

    /// Build a router around a custom transport. Validates the configuration
    /// before anything can touch the network.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            rate_limit_marker: Arc::new(StatusOnly),
        })
    }

    /// Install the provider-supplied rate-limit body predicate.
    pub fn with_rate_limit_marker(mut self, marker: Arc<dyn RateLimitMarker>) -> Self {
        self.rate_limit_marker = marker;
        self
    }

    /// The configuration this router was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Entry point for one logical call.
    ///
    /// Dry-run specs are assembled and echoed back without any network I/O;
    /// everything else performs exactly one transport exchange per retry
    /// attempt.
    pub async fn request(&self, spec: RequestSpec) -> Result<ApiResponse> {
        let prepared = builder::build(&spec, &self.config).map_err(Error::Api)?;

        if spec.dry_run {
            log::debug!("dry run: {}", prepared.echo());
            return Ok(ApiResponse::DryRun(prepared.echo()));
        }

        log::debug!("{} {}", prepared.method, prepared.url);

        let budget = self.config.retry_timeout;
        let started = Instant::now();
        let payload = execute_with_retry(
            || self.attempt(&prepared, budget.saturating_sub(started.elapsed())),
            &self.config.retry_policy,
            budget,
            self.config.retry_over_query_limit,
        )
        .await
        .map_err(Error::Api)?;

        Ok(ApiResponse::Payload(payload))
    }

    /// One transport exchange, classified. The attempt is bounded by the
    /// configured connect/read timeout or the remaining budget, whichever is
    /// tighter, so a hanging exchange cannot outlive the caller's patience.
    async fn attempt(
        &self,
        prepared: &PreparedRequest,
        remaining: Duration,
    ) -> std::result::Result<Value, ApiError> {
        let per_attempt = match self.config.timeout {
            Some(timeout) => timeout.min(remaining),
            None => remaining,
        };

        let reply = self
            .transport
            .exchange(prepared, Some(per_attempt))
            .await
            .map_err(ApiError::from_transport)?;

        if (200..300).contains(&reply.status) {
            if reply.body.trim().is_empty() {
                return Ok(Value::Null);
            }
            // A 2xx body that cannot be decoded at all will not improve on a
            // re-send, so it is terminal rather than retriable.
            return serde_json::from_str(&reply.body).map_err(|e| {
                ApiError::new(
                    ErrorKind::Unknown,
                    format!("response body could not be decoded: {}", e),
                )
            });
        }

        Err(ApiError::from_status(
            reply.status,
            &reply.body,
            self.rate_limit_marker.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{TransportError, TransportReply};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport double returning a fixed reply and counting exchanges.
    struct FixedTransport {
        status: u16,
        body: String,
        calls: AtomicUsize,
    }

    impl FixedTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn exchange(
            &self,
            _request: &PreparedRequest,
            _timeout: Option<Duration>,
        ) -> std::result::Result<TransportReply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TransportReply {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn fast_config() -> ClientConfig {
        ClientConfig::new("https://router.example.com/api/1")
            .with_retry_timeout(Duration::from_millis(200))
            .with_retry_policy(
                RetryPolicy::default()
                    .with_base_delay(Duration::from_millis(20))
                    .with_jitter(false),
            )
    }

    #[test]
    fn test_hosted_url_requires_api_key() {
        let config = ClientConfig::new("https://router.example.com/api/1")
            .with_hosted_url("https://router.example.com/api/1");
        let transport = FixedTransport::new(200, "{}");

        let result = Router::with_transport(config, transport);
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_hosted_url_with_key_is_accepted() {
        let config = ClientConfig::new("https://router.example.com/api/1")
            .with_hosted_url("https://router.example.com/api/1")
            .with_api_key("secret");
        let transport = FixedTransport::new(200, "{}");
        assert!(Router::with_transport(config, transport).is_ok());
    }

    #[test]
    fn test_self_hosted_url_needs_no_key() {
        let config = ClientConfig::new("http://localhost:8989")
            .with_hosted_url("https://router.example.com/api/1");
        let transport = FixedTransport::new(200, "{}");
        assert!(Router::with_transport(config, transport).is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_performs_no_exchange() {
        let transport = FixedTransport::new(200, r#"{"status":"OK"}"#);
        let router = Router::with_transport(fast_config(), transport.clone()).unwrap();

        let spec = RequestSpec::get("/route")
            .with_param("profile", "car")
            .dry_run(true);
        let response = router.request(spec).await.unwrap();

        let echo = response.dry_run_echo().expect("expected dry-run echo");
        assert_eq!(echo.method, "GET");
        assert_eq!(
            echo.url,
            "https://router.example.com/api/1/route?profile=car"
        );
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_returns_payload_unchanged() {
        let body = r#"{"status":"OK","results":[{"distance": 1207.4}]}"#;
        let transport = FixedTransport::new(200, body);
        let router = Router::with_transport(fast_config(), transport.clone()).unwrap();

        let response = router.request(RequestSpec::get("/route")).await.unwrap();
        assert_eq!(
            response.into_payload().unwrap(),
            json!({"status": "OK", "results": [{"distance": 1207.4}]})
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_without_opt_in_fails_immediately() {
        let transport = FixedTransport::new(429, r#"{"message":"too many requests"}"#);
        let router = Router::with_transport(fast_config(), transport.clone()).unwrap();

        let error = router.request(RequestSpec::get("/route")).await.unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::OverQueryLimit));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_with_opt_in_retries_until_budget() {
        let config = fast_config().with_retry_over_query_limit(true);
        let transport = FixedTransport::new(429, r#"{"message":"too many requests"}"#);
        let router = Router::with_transport(config, transport.clone()).unwrap();

        let error = router.request(RequestSpec::get("/route")).await.unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Timeout));
        assert!(transport.calls() > 1);
    }

    #[tokio::test]
    async fn test_invalid_request_is_not_retried() {
        let transport = FixedTransport::new(400, r#"{"message":"unknown profile"}"#);
        let router = Router::with_transport(fast_config(), transport.clone()).unwrap();

        let error = router.request(RequestSpec::get("/route")).await.unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::InvalidRequest));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_terminal() {
        let transport = FixedTransport::new(200, "<html>not json</html>");
        let router = Router::with_transport(fast_config(), transport.clone()).unwrap();

        let error = router.request(RequestSpec::get("/route")).await.unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Unknown));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_success_body_decodes_to_null() {
        let transport = FixedTransport::new(204, "");
        let router = Router::with_transport(fast_config(), transport.clone()).unwrap();

        let response = router.request(RequestSpec::get("/route")).await.unwrap();
        assert_eq!(response.into_payload().unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_server_errors_retry_until_budget_elapses() {
        let budget = Duration::from_millis(300);
        let config = fast_config().with_retry_timeout(budget);
        let transport = FixedTransport::new(503, r#"{"message":"overloaded"}"#);
        let router = Router::with_transport(config, transport.clone()).unwrap();

        let start = std::time::Instant::now();
        let error = router.request(RequestSpec::get("/route")).await.unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(error.kind(), Some(ErrorKind::Timeout));
        assert!(transport.calls() > 1);
        assert!(elapsed > budget, "gave up too early: {:?}", elapsed);
        assert!(elapsed < budget * 2, "slept past the budget: {:?}", elapsed);
    }
}
