use http::{HeaderName, Method, StatusCode};
use micro_transport::protocol::TransportError;
use std::error::Error;
use thiserror::Error;

/// Error type returned by user supplied status and header handlers.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// A request that can't be issued, detected before any network activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid method: {method:?}, expect one of GET, HEAD, DELETE, OPTIONS, POST, PUT, PATCH")]
    InvalidMethod { method: Option<Method> },

    #[error("invalid uri: {reason}")]
    InvalidUri { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

impl RequestError {
    pub fn invalid_method(method: Option<Method>) -> Self {
        Self::InvalidMethod { method }
    }

    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}

/// The terminal error of a materialized response stream.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request error: {source}")]
    Request {
        #[from]
        source: RequestError,
    },

    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: TransportError,
    },

    #[error("request body has already been consumed")]
    BodyConsumed,

    #[error("header handler for {name} failed: {source}")]
    Header { name: HeaderName, source: BoxError },

    #[error("status handler for {status} failed: {source}")]
    Status { status: StatusCode, source: BoxError },
}

impl ClientError {
    /// Returns the status code when a status handler rejected the response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
