//! Payload framing for both directions of an exchange.
//!
//! - [`PayloadEncoder`]: frames the request payload, either with a known
//!   `content-length` or with chunked transfer encoding
//! - [`PayloadDecoder`]: reads the response payload, delimited by length, by chunked
//!   transfer encoding or by the peer closing the connection

mod chunked_decoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
