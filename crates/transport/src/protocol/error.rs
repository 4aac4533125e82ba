use std::error::Error;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Top-level error of one exchange issued through a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid uri: {reason}")]
    InvalidUri { reason: String },

    #[error("unsupported uri scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("connect error: {source}")]
    Connect { source: io::Error },

    #[error("no response head after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: SendError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: ParseError,
    },

    #[error("body error: {source}")]
    Body { source: Box<dyn Error + Send + Sync> },
}

impl TransportError {
    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }

    pub fn unsupported_scheme<S: ToString>(scheme: S) -> Self {
        Self::UnsupportedScheme { scheme: scheme.to_string() }
    }

    pub fn connect<E: Into<io::Error>>(e: E) -> Self {
        Self::Connect { source: e.into() }
    }

    pub fn body<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Body { source: e.into() }
    }
}

/// Errors raised while decoding a response.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid status code: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("connection closed before the body completed")]
    IncompleteBody,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while encoding and writing a request.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
