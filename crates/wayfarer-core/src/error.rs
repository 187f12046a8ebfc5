//! Error types for the wayfarer core library
//!
//! Two layers: [`Error`] is what callers match on, and the closed
//! [`ErrorKind`] taxonomy inside [`ApiError`] classifies failed calls
//! independently of which provider raised them.

use thiserror::Error;

use crate::http::error::{ApiError, ErrorKind};

/// Main error type for wayfarer operations
#[derive(Error, Debug)]
pub enum Error {
    /// Construction-time misconfiguration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A failed API call, classified into the closed taxonomy
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    /// The taxonomy kind for API failures; `None` for configuration errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Api(error) => Some(error.kind),
            Error::Configuration { .. } => None,
        }
    }

    /// The HTTP status code attached to the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(error) => error.status,
            Error::Configuration { .. } => None,
        }
    }
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;
