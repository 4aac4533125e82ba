//! An asynchronous micro HTTP/1.1 client transport
//!
//! This crate is the network half of `micro-webclient`: it turns an `http::Request`
//! into bytes on a tokio TCP socket and hands the response back as soon as its head
//! is parsed, with a body that is read from the socket only as fast as it is consumed.
//!
//! # Features
//!
//! - HTTP/1.1 requests with length delimited or chunked payloads
//! - Responses delimited by content-length, chunked transfer encoding or connection close
//! - Demand driven response bodies implementing `http_body::Body`
//! - Interim `1xx` responses skipped transparently
//! - A timeout bounding the wait for the response head
//!
//! # Example
//!
//! ```no_run
//! use http::Request;
//! use http_body_util::BodyExt;
//! use micro_transport::transport::{HttpTransport, Transport};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let transport = HttpTransport::new();
//! let request = Request::get("http://127.0.0.1:8080/hello").body(None)?;
//!
//! let response = transport.issue(request, Some(Duration::from_secs(5))).await?;
//! let body = response.into_body().collect().await?.to_bytes();
//! println!("{}", String::from_utf8_lossy(&body));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`transport`]: the [`Transport`](transport::Transport) trait and [`HttpTransport`](transport::HttpTransport)
//! - [`connection`]: one request/response exchange over a byte stream
//! - [`codec`]: request encoding and response decoding
//! - [`protocol`]: framing types, bodies and errors
//!
//! # Limitations
//!
//! - HTTP/1.1 only, and no TLS: `https` uris are rejected
//! - No connection pooling, every request opens and closes its own connection
//! - Maximum response head size: 16KB
//! - Maximum number of response headers: 64

pub mod codec;
pub mod connection;
pub mod protocol;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
