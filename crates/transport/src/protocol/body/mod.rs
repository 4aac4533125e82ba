//! HTTP body handling for both directions of an exchange.
//!
//! - [`RequestBody`]: the optional payload sent with a request. It is a plain
//!   `http_body::Body`, either a single buffer or a boxed stream of chunks.
//! - [`ResponseBody`]: the payload of a response. When produced by a live
//!   connection it is the receiving end of a demand driven channel: a chunk is
//!   read from the socket only after the consumer asks for one, and dropping the
//!   body stops the reader task which closes the connection.
//!
//! Both bodies are consumed at most once, the `http_body::Body` contract.

mod body_channel;
mod request_body;
mod response_body;

pub(crate) use body_channel::create_body_sender_receiver;
pub use request_body::RequestBody;
pub use response_body::ResponseBody;
