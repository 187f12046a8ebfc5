//! Transport seam for performing a single HTTP exchange
//!
//! The engine depends only on this narrow contract, not on a specific HTTP
//! stack: one exchange in, a status/body reply or a typed transport failure
//! out. [`ReqwestTransport`] is the production implementation; tests plug in
//! counting doubles.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::http::builder::PreparedRequest;

/// Transport-level failure with no HTTP response attached.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established (refused, DNS, TLS)
    #[error("connection failed: {0}")]
    Connect(String),

    /// The per-attempt timeout elapsed before a response arrived
    #[error("attempt timed out: {0}")]
    Timeout(String),

    /// Any other I/O failure while sending or reading
    #[error("transport failure: {0}")]
    Io(String),
}

/// Raw outcome of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// HTTP status code
    pub status: u16,
    /// Response body, undecoded
    pub body: String,
}

/// Performs one HTTP exchange.
///
/// Implementations must be safe for concurrent use; the engine shares one
/// transport across all logical calls of a client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the prepared request, bounded by `timeout` when given.
    async fn exchange(
        &self,
        request: &PreparedRequest,
        timeout: Option<Duration>,
    ) -> Result<TransportReply, TransportError>;
}

/// Production transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from a configured `reqwest` client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client honoring the per-attempt timeout and proxy settings.
    /// The `User-Agent` header travels with each prepared request instead of
    /// being pinned on the client.
    pub fn build(timeout: Option<Duration>, proxy: Option<&str>) -> crate::Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| crate::Error::Configuration {
                message: format!("invalid proxy URL: {}", proxy_url),
                source: Some(anyhow::anyhow!(e)),
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| crate::Error::Configuration {
            message: "failed to build HTTP client".to_string(),
            source: Some(anyhow::anyhow!(e)),
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn exchange(
        &self,
        request: &PreparedRequest,
        timeout: Option<Duration>,
    ) -> Result<TransportReply, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        Ok(TransportReply { status, body })
    }
}

fn classify_send_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Io(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_bad_proxy() {
        let result = ReqwestTransport::build(None, Some("not a url"));
        assert!(matches!(result, Err(crate::Error::Configuration { .. })));
    }

    #[test]
    fn test_build_without_extras() {
        assert!(ReqwestTransport::build(Some(Duration::from_secs(5)), None).is_ok());
    }
}
