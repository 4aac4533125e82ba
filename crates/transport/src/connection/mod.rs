//! One HTTP/1.1 exchange over an established byte stream
//!
//! [`HttpConnection`] writes a single request and reads back its response. The response
//! head is returned as soon as it is parsed; the payload is read lazily by a spawned
//! task that pulls one chunk from the socket each time the consumer of the
//! [`ResponseBody`](crate::protocol::body::ResponseBody) asks for one.
//!
//! Connections are never reused: once the payload ends, fails or is dropped, the task
//! finishes and both halves of the stream are closed.

mod http_connection;

pub use http_connection::HttpConnection;
