//! HTTP/1.1 codec for the client side of an exchange
//!
//! Requests are encoded and responses decoded as streams of [`Message`](crate::protocol::Message)s
//! with `tokio_util` framing, so a connection can write a request head followed by its
//! payload items and read back a response head followed by its payload items.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`RequestEncoder`]: encodes outgoing requests
//!   - head encoding via the `header` module
//!   - payload framing via the `body` module
//!
//! - Response handling:
//!   - [`ResponseDecoder`]: decodes incoming responses
//!   - head parsing via the `header` module
//!   - payload decoding via the `body` module
//!
//! # Example
//!
//! ```
//! use micro_transport::codec::ResponseDecoder;
//! use micro_transport::protocol::Message;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = ResponseDecoder::new();
//! let mut buffer = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");
//! let head = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(head, Some(Message::Header(_))));
//! ```

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
