//! A fluent, non-blocking HTTP client.
//!
//! A call is described step by step with immutable values and runs only when its body
//! stream is polled:
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use http::Method;
//! use micro_webclient::WebClient;
//! use std::io;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), micro_webclient::ClientError> {
//! let client = WebClient::new();
//!
//! let mut chunks = client
//!     .uri("http://127.0.0.1:8080/items")
//!     .method_with_timeout(Method::GET, Duration::from_secs(5))
//!     .header("accept", "text/plain")
//!     .retrieve()?
//!     .on_status(404, |status| Some(io::Error::other(format!("missing: {}", status.body_as_text()))))
//!     .on_header("x-trace", |value| async move {
//!         println!("trace id {value:?}");
//!         Ok::<_, io::Error>(())
//!     })
//!     .with_timing(|elapsed| async move { println!("took {elapsed:?}") })
//!     .into_stream();
//!
//! while let Some(chunk) = chunks.try_next().await? {
//!     println!("{} bytes", chunk.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Without a status handler for the received status the body streams through chunk by
//! chunk. With one, the body is buffered and the handler decides between failing the
//! stream and letting the buffered body through as a single chunk.
//!
//! The network side lives in [`micro_transport`]; any [`Transport`](micro_transport::transport::Transport)
//! can be plugged in with [`WebClientBuilder::transport`].

mod body;
mod client;
mod error;
mod hooks;
mod request;
mod response;
mod status;
mod stream;

#[cfg(test)]
mod mock;

pub use client::WebClient;
pub use client::WebClientBuilder;
pub use error::BoxError;
pub use error::ClientError;
pub use error::RequestError;
pub use micro_transport;
pub use request::Request;
pub use response::Response;
pub use status::ResponseStatus;
pub use stream::ResponseStream;
