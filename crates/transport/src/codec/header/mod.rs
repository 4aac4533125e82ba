//! Request head encoding and response head decoding.
//!
//! - [`HeaderEncoder`]: writes the request line and header fields, completing `host`
//!   and the payload framing headers
//! - [`HeaderDecoder`]: parses the status line and header fields of a response and
//!   works out how its payload is delimited

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
