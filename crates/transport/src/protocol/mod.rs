//! Core HTTP protocol abstractions for the client side.
//!
//! This module provides the building blocks the codec and the connection share:
//! message framing types, request and response heads, streaming bodies and errors.
//!
//! # Architecture
//!
//! - **Message Handling** ([`message`]): [`Message`], [`PayloadItem`] and [`PayloadSize`]
//! - **Request Heads** ([`request`]): [`RequestHead`] and request-line helpers
//! - **Response Heads** ([`response`]): [`ResponseHead`]
//! - **Bodies** ([`body`]): [`RequestBody`](body::RequestBody) sent upstream and
//!   [`ResponseBody`](body::ResponseBody) streamed back to the caller
//! - **Error Handling** ([`error`]): [`TransportError`], [`ParseError`], [`SendError`]

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHead;
pub use request::is_bodiless_method;
pub use request::request_target;

mod response;
pub use response::ResponseHead;
pub use response::is_informational;

mod error;
pub use error::ParseError;
pub use error::SendError;
pub use error::TransportError;

pub mod body;
