//! Decoder for response payloads.
//!
//! The framing is chosen from the [`PayloadSize`] the head decoder reported:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Payloads that run until the server closes the connection
//! - Responses with no body

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use std::cmp;
use tokio_util::codec::Decoder;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Fixed content length, `remaining` bytes still to read
    Length { remaining: u64 },

    Chunked(ChunkedDecoder),

    /// Everything until the connection closes, finished by `decode_eof`
    UntilEof,

    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length { remaining: size } }
    }

    pub fn until_eof() -> Self {
        Self { kind: Kind::UntilEof }
    }

    /// Returns true when the connection closing is the regular end of this payload.
    pub fn is_close_delimited(&self) -> bool {
        matches!(self.kind, Kind::UntilEof)
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => Self::fix_length(size),
            PayloadSize::Chunked => Self::chunked(),
            PayloadSize::Empty => Self::empty(),
            PayloadSize::UntilEof => Self::until_eof(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Returns the next piece of payload that is already buffered.
    ///
    /// A close delimited payload never reports `Eof` from here, the end of the stream does.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length { remaining: 0 } | Kind::NoBody => Ok(Some(PayloadItem::Eof)),
            Kind::Length { remaining } => {
                if src.is_empty() {
                    return Ok(None);
                }
                let len = cmp::min(*remaining, src.len() as u64);
                *remaining -= len;
                trace!(len, remaining = *remaining, "read length delimited bytes");
                Ok(Some(PayloadItem::Chunk(src.split_to(len as usize).freeze())))
            }
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::UntilEof => {
                if src.is_empty() {
                    return Ok(None);
                }
                Ok(Some(PayloadItem::Chunk(src.split().freeze())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn length_stops_at_content_length() {
        let mut decoder = PayloadDecoder::fix_length(5);
        let mut buffer = BytesMut::from(&b"hel"[..]);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"hel"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"lo trailing");
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"lo"));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(&buffer[..], &b" trailing"[..]);
    }

    #[test]
    fn until_eof_drains_the_buffer() {
        let mut decoder = PayloadDecoder::from(PayloadSize::UntilEof);
        let mut buffer = BytesMut::from(&b"streamed"[..]);

        assert!(decoder.is_close_delimited());
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"streamed"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn no_body_is_immediately_finished() {
        let mut decoder = PayloadDecoder::empty();
        let mut buffer = BytesMut::new();

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }
}
