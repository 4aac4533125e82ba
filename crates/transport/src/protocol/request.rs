//! HTTP request head handling.
//!
//! The client never parses requests, it only serializes them, so the request
//! head is the standard `http::Request` with an empty body placeholder plus a
//! couple of helpers the encoder needs.

use http::{Method, Request, Uri};

/// Type alias for the head of an outgoing HTTP request.
///
/// The payload travels separately as [`Message::Payload`](crate::protocol::Message) items.
pub type RequestHead = Request<()>;

/// Returns the request-target written on the request line.
///
/// Only the origin form is emitted: path plus optional query, `/` when the
/// uri carries no path.
pub fn request_target(uri: &Uri) -> &str {
    match uri.path_and_query() {
        Some(path_and_query) if !path_and_query.as_str().is_empty() => path_and_query.as_str(),
        _ => "/",
    }
}

/// Returns true when a response to this method never carries a payload.
#[inline]
pub fn is_bodiless_method(method: &Method) -> bool {
    matches!(method, &Method::HEAD)
}
