//! HTTP request head encoder.
//!
//! Serializes the request line and the header fields of a [`RequestHead`], fixing up
//! `host`, `content-length` and `transfer-encoding` from the uri and the [`PayloadSize`].

use crate::protocol::{PayloadSize, RequestHead, SendError, request_target};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

const CHUNKED_VALUE: HeaderValue = HeaderValue::from_static("chunked");

/// Encoder for HTTP request heads implementing the [`Encoder`] trait.
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<(RequestHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes the request line and headers into `dst`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the HTTP version is not HTTP/1.1 (the only version the client speaks)
    /// - the payload size is close delimited, which a request can't be
    /// - the uri carries no authority and no `host` header is set
    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        if head.version() != Version::HTTP_11 {
            error!(http_version = ?head.version(), "unsupported http version");
            return Err(io::Error::from(ErrorKind::Unsupported).into());
        }

        if !head.headers().contains_key(header::HOST) {
            let host = head
                .uri()
                .authority()
                .map(|authority| HeaderValue::from_str(authority.as_str()))
                .ok_or_else(|| SendError::invalid_body("request uri has no authority for the host header"))?
                .map_err(|e| SendError::invalid_body(format!("invalid host header: {e}")))?;
            head.headers_mut().insert(header::HOST, host);
        }

        match payload_size {
            PayloadSize::Length(n) => {
                head.headers_mut().remove(header::TRANSFER_ENCODING);
                head.headers_mut().insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Chunked => {
                head.headers_mut().remove(header::CONTENT_LENGTH);
                head.headers_mut().insert(header::TRANSFER_ENCODING, CHUNKED_VALUE);
            }
            PayloadSize::Empty => {}
            PayloadSize::UntilEof => {
                error!("request payload can't be close delimited");
                return Err(SendError::invalid_body("request payload can't be close delimited"));
            }
        }

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "{} {} HTTP/1.1\r\n", head.method().as_str(), request_target(head.uri()))?;

        for (header_name, header_value) in head.headers() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writer over `BytesMut` for the `write!` based request line.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
