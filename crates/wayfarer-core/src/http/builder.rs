//! Request assembly from logical call descriptions
//!
//! Turns a [`RequestSpec`] plus client configuration into a
//! [`PreparedRequest`]: method, fully-qualified URL with canonical query
//! string, merged headers, and optional JSON body.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::http::client::ClientConfig;
use crate::http::encode::encode;
use crate::http::error::ApiError;

/// Logical, provider-agnostic description of one API call before HTTP-level
/// assembly. Built fresh per call by provider code, consumed by the call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method; only GET and POST survive build-time validation
    pub method: Method,
    /// Path appended verbatim to the configured base URL
    pub path: String,
    /// Ordered query parameters; repeated keys stay repeated
    pub query: Vec<(String, String)>,
    /// JSON body; omitted entirely when `None`
    pub body: Option<Value>,
    /// Per-call header overrides; win per-key over the defaults
    pub headers: Option<HashMap<String, String>>,
    /// Assemble everything, send nothing
    pub dry_run: bool,
}

impl RequestSpec {
    /// Describe a GET call to the given path.
    pub fn get(path: impl Into<String>) -> Self {
        Self::with_method(Method::GET, path)
    }

    /// Describe a POST call to the given path.
    pub fn post(path: impl Into<String>) -> Self {
        Self::with_method(Method::POST, path)
    }

    /// Describe a call with an explicit method. Validation happens at build
    /// time so the error surfaces through the normal taxonomy.
    pub fn with_method(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: None,
            dry_run: false,
        }
    }

    /// Replace the query parameter list.
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Append one query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set per-call header overrides.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Toggle dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Fully assembled request, ready for the transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl PreparedRequest {
    /// Structural description for dry runs: method, full URL, body.
    pub fn echo(&self) -> RequestEcho {
        RequestEcho {
            method: self.method.to_string(),
            url: self.url.clone(),
            body: self.body.clone(),
        }
    }
}

/// Description of a request that was assembled but not sent, suitable for
/// display or assertion in tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEcho {
    pub method: String,
    pub url: String,
    pub body: Option<Value>,
}

impl fmt::Display for RequestEcho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "{} {} {}", self.method, self.url, body),
            None => write!(f, "{} {}", self.method, self.url),
        }
    }
}

/// Assemble a [`PreparedRequest`] from a spec and client configuration.
///
/// The URL is the configured base joined to the spec path by plain
/// concatenation; a doubled slash is a caller error and is not repaired.
pub fn build(spec: &RequestSpec, config: &ClientConfig) -> Result<PreparedRequest, ApiError> {
    if spec.method != Method::GET && spec.method != Method::POST {
        return Err(ApiError::invalid_request(format!(
            "unsupported HTTP method: {}",
            spec.method
        )));
    }

    let mut url = format!("{}{}", config.base_url, spec.path);
    if !spec.query.is_empty() {
        url.push('?');
        url.push_str(&encode(&spec.query));
    }

    let mut headers = config.default_headers();
    if let Some(overrides) = &spec.headers {
        for (key, value) in overrides {
            headers.insert(key.clone(), value.clone());
        }
    }

    Ok(PreparedRequest {
        method: spec.method.clone(),
        url,
        headers,
        body: spec.body.clone(),
    })
}
