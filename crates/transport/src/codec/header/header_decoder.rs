//! HTTP response head decoder.
//!
//! Parses the status line and header fields of a response with `httparse`, then
//! decides how the payload that follows is delimited.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 16KB
//! - Only HTTP/1.0 and HTTP/1.1 responses are accepted
//!
//! # Implementation Details
//!
//! Header names and values are not copied out of the parser. The decoder records the
//! byte ranges `httparse` found, splits the head off the read buffer as one frozen
//! `Bytes`, then slices every value out of it.

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Response, StatusCode};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, ResponseHead};

/// Maximum number of headers allowed in a response
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire head section
const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Decoder for HTTP response heads implementing the [`Decoder`] trait.
///
/// `head_request` must be set when the response answers a `HEAD` request: such a
/// response announces a length but never carries a payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDecoder {
    head_request: bool,
}

impl HeaderDecoder {
    pub fn new(head_request: bool) -> Self {
        Self { head_request }
    }
}

impl Decoder for HeaderDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a response head from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((head, payload_size)))` if a complete head was parsed
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if parsing failed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // shortest valid head: "HTTP/1.1 200 \r\n\r\n"
        if src.len() < 17 {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut header_index = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];

        let (body_offset, version, code, header_count) = {
            let mut res = httparse::Response::new(&mut headers);
            let parsed = res.parse(src).map_err(|e| match e {
                Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
                e => ParseError::invalid_header(e.to_string()),
            })?;

            match parsed {
                Status::Complete(body_offset) => {
                    HeaderIndex::record(src, res.headers, &mut header_index);
                    (body_offset, res.version, res.code, res.headers.len())
                }
                Status::Partial => {
                    ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                    return Ok(None);
                }
            }
        };

        trace!(head_size = body_offset, "parsed response head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match version {
            Some(0) => http::Version::HTTP_10,
            Some(1) => http::Version::HTTP_11,
            _ => return Err(ParseError::InvalidVersion(version)),
        };

        let status = code.and_then(|code| StatusCode::from_u16(code).ok()).ok_or(ParseError::InvalidStatus(code))?;

        let mut head = Response::new(());
        *head.status_mut() = status;
        *head.version_mut() = version;

        let head_bytes = src.split_to(body_offset).freeze();
        let header_map = head.headers_mut();
        header_map.reserve(header_count);
        for index in &header_index[..header_count] {
            let name = HeaderName::from_bytes(&head_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
            let value =
                HeaderValue::from_maybe_shared(head_bytes.slice(index.value.0..index.value.1)).map_err(ParseError::invalid_header)?;
            header_map.append(name, value);
        }

        let payload_size = parse_payload(&head, self.head_request)?;

        Ok(Some((head, payload_size)))
    }
}

/// Byte ranges of a header's name and value within the read buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            let name_end = name_start + header.name.len();
            indices.name = (name_start, name_end);
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            let value_end = value_start + header.value.len();
            indices.value = (value_start, value_end);
        }
    }
}

/// Determines how the response payload is delimited.
///
/// refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
fn parse_payload(head: &ResponseHead, head_request: bool) -> Result<PayloadSize, ParseError> {
    let status = head.status();
    if head_request || status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return Ok(PayloadSize::new_empty());
    }

    let te_header = head.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = head.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::UntilEof),

        (te_value @ Some(_), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::new_chunked())
            } else {
                Ok(PayloadSize::UntilEof)
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length =
                cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            if length == 0 { Ok(PayloadSize::new_empty()) } else { Ok(PayloadSize::new_length(length)) }
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}

/// Checks if chunked is the final transfer-coding.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii() == CHUNKED;
        }
    }
    false
}
