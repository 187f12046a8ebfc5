//! End-to-end tests for the request engine through the public API only.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use wayfarer_core::{
    ApiResponse, ClientConfig, Error, ErrorKind, PreparedRequest, RequestSpec, RetryPolicy, Router,
    Transport, TransportError, TransportReply,
};

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
    ) -> Result<TransportReply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransportReply {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

fn config(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url)
        .with_retry_timeout(Duration::from_millis(300))
        .with_retry_policy(
            RetryPolicy::default()
                .with_base_delay(Duration::from_millis(25))
                .with_jitter(false),
        )
}

#[tokio::test]
async fn dry_run_assembles_everything_but_sends_nothing() {
    let transport = FixedTransport::new(200, r#"{"status":"OK","results":[]}"#);
    let router = Router::with_transport(config("https://httpbin.org"), transport.clone()).unwrap();

    let spec = RequestSpec::get("/directions")
        .with_param("c", "d")
        .with_param("a", "b")
        .with_param("1", "2")
        .dry_run(true);
    let response = router.request(spec).await.unwrap();

    match response {
        ApiResponse::DryRun(echo) => {
            assert_eq!(echo.method, "GET");
            assert_eq!(echo.url, "https://httpbin.org/directions?1=2&a=b&c=d");
            assert!(echo.body.is_none());
        }
        ApiResponse::Payload(_) => panic!("dry run must not produce a payload"),
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn retriable_503_fails_inside_the_budget_window() {
    let retry_timeout = Duration::from_millis(300);
    let transport = FixedTransport::new(503, r#"{"message":"upstream overloaded"}"#);
    let router = Router::with_transport(
        config("https://httpbin.org").with_retry_timeout(retry_timeout),
        transport.clone(),
    )
    .unwrap();

    let start = Instant::now();
    let error = router
        .request(RequestSpec::post("/post").with_body(json!({"a": "b"})))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(error.kind(), Some(ErrorKind::Timeout));
    assert_eq!(error.status(), Some(503));
    assert!(transport.calls() > 1, "503 must be retried");
    assert!(
        elapsed > retry_timeout && elapsed < retry_timeout * 2,
        "elapsed {:?} outside ({:?}, {:?})",
        elapsed,
        retry_timeout,
        retry_timeout * 2
    );
}

#[tokio::test]
async fn rate_limit_without_opt_in_fails_on_first_attempt() {
    let transport = FixedTransport::new(429, r#"{"message":"quota exceeded"}"#);
    let router = Router::with_transport(config("https://httpbin.org"), transport.clone()).unwrap();

    let error = router.request(RequestSpec::get("/get")).await.unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::OverQueryLimit));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn hosted_url_without_key_fails_before_any_network_access() {
    let hosted = "https://router.example.com/api/1";
    let transport = FixedTransport::new(200, "{}");
    let result = Router::with_transport(
        config(hosted).with_hosted_url(hosted),
        transport.clone(),
    );

    assert!(matches!(result, Err(Error::Configuration { .. })));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn success_payload_is_structurally_unchanged() {
    let body = r#"{"paths":[{"distance":1207.4,"points":"abc"}],"info":{"took":12}}"#;
    let transport = FixedTransport::new(200, body);
    let router = Router::with_transport(config("https://httpbin.org"), transport.clone()).unwrap();

    let payload = router
        .request(RequestSpec::get("/route"))
        .await
        .unwrap()
        .into_payload()
        .unwrap();

    assert_eq!(
        payload,
        json!({"paths": [{"distance": 1207.4, "points": "abc"}], "info": {"took": 12}})
    );
    assert_eq!(transport.calls(), 1);
}
