//! HTTP response head handling implementation.
//!
//! This module provides type definitions for HTTP response heads.
//! It uses the standard `http::Response` type with an empty body placeholder
//! to represent the status line and headers before the body is attached.

use http::{Response, StatusCode};

/// Type alias for HTTP response heads.
///
/// The actual response body is attached later with `Response::map` once the
/// connection has set up the body channel.
pub type ResponseHead = Response<()>;

/// Interim responses (`1xx`) other than `101 Switching Protocols` precede the final
/// response and are skipped by the connection.
#[inline]
pub fn is_informational(status: StatusCode) -> bool {
    status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS
}
