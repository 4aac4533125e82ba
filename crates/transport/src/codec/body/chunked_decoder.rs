//! Decoder for chunked transfer encoding.
//!
//! Follows [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding):
//! every chunk is a hex size line (optionally carrying extensions), the chunk data and a CRLF.
//! A zero sized chunk starts the trailer section, which ends with an empty line.
//! Extensions and trailer fields are skipped.

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use std::cmp;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Hex digits allowed in a chunk size, enough for a `u64`.
const MAX_SIZE_DIGITS: u8 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Reading hex digits, `digits` counts how many were seen
    Size { size: u64, digits: u8 },
    /// Skipping whitespace or extensions until the CR of the size line
    SizeTail { size: u64 },
    /// Expecting the LF that ends the size line
    SizeLf { size: u64 },
    /// Copying chunk data, `remaining` bytes left
    Data { remaining: u64 },
    /// Expecting the CR after the chunk data
    DataCr,
    /// Expecting the LF after the chunk data
    DataLf,
    /// At the start of a trailer line, an immediate CRLF ends the message
    TrailerStart,
    /// Inside a trailer field, skipped up to its CR
    TrailerField,
    /// Expecting the LF after a trailer field
    TrailerFieldLf,
    /// Expecting the LF of the final empty line
    EndLf,
    /// The whole payload has been read
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size { size: 0, digits: 0 } }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Returns the next chunk as soon as any of its data is buffered, so a large chunk
    /// may be delivered as several items.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if let State::End = self.state {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            if let State::Data { remaining } = self.state {
                let len = cmp::min(remaining, src.len() as u64);
                let bytes = src.split_to(len as usize).freeze();
                let remaining = remaining - len;
                self.state = if remaining == 0 { State::DataCr } else { State::Data { remaining } };
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }

            let byte = src.get_u8();
            self.state = self.state.next(byte)?;
        }
    }
}

impl State {
    fn next(self, byte: u8) -> Result<State, ParseError> {
        let state = match (self, byte) {
            (State::Size { digits, .. }, b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F') if digits >= MAX_SIZE_DIGITS => {
                return Err(ParseError::invalid_body("chunk size overflow"));
            }
            (State::Size { size, digits }, b'0'..=b'9') => State::Size { size: size * 16 + u64::from(byte - b'0'), digits: digits + 1 },
            (State::Size { size, digits }, b'a'..=b'f') => {
                State::Size { size: size * 16 + u64::from(byte - b'a' + 10), digits: digits + 1 }
            }
            (State::Size { size, digits }, b'A'..=b'F') => {
                State::Size { size: size * 16 + u64::from(byte - b'A' + 10), digits: digits + 1 }
            }
            (State::Size { digits: 0, .. }, _) => return Err(ParseError::invalid_body("missing chunk size")),
            (State::Size { size, .. } | State::SizeTail { size }, b'\r') => State::SizeLf { size },
            (State::Size { size, .. }, b' ' | b'\t' | b';') | (State::SizeTail { size }, _) => State::SizeTail { size },
            (State::Size { .. }, _) => return Err(ParseError::invalid_body("invalid chunk size")),
            (State::SizeLf { size: 0 }, b'\n') => State::TrailerStart,
            (State::SizeLf { size }, b'\n') => State::Data { remaining: size },
            (State::SizeLf { .. }, _) => return Err(ParseError::invalid_body("invalid chunk size LF")),
            (State::DataCr, b'\r') => State::DataLf,
            (State::DataCr, _) => return Err(ParseError::invalid_body("invalid chunk body CR")),
            (State::DataLf, b'\n') => State::Size { size: 0, digits: 0 },
            (State::DataLf, _) => return Err(ParseError::invalid_body("invalid chunk body LF")),
            (State::TrailerStart, b'\r') => State::EndLf,
            (State::TrailerField, b'\r') => State::TrailerFieldLf,
            (State::TrailerStart | State::TrailerField, _) => State::TrailerField,
            (State::TrailerFieldLf, b'\n') => State::TrailerStart,
            (State::TrailerFieldLf, _) => return Err(ParseError::invalid_body("invalid trailer LF")),
            (State::EndLf, b'\n') => State::End,
            (State::EndLf, _) => return Err(ParseError::invalid_body("invalid chunk end LF")),
            (State::Data { .. } | State::End, _) => self,
        };
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_basic() {
        let mut buffer: BytesMut = BytesMut::from(&b"10\r\n1234567890abcdef\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"1234567890abcdef"));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_multiple_chunks() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hello"));

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b", world"));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_extensions_and_trailers_are_skipped() {
        let mut buffer: BytesMut = BytesMut::from(&b"5;chunk-ext=value\r\nhello\r\n0\r\nTrailer: value\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hello"));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_trailer_split_across_reads() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhello\r\n0\r\nX-Trailer: v\r"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hello"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"\nX-Other: w\r\n\r\n");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_trailer_without_lf_is_rejected() {
        let mut buffer: BytesMut = BytesMut::from(&b"0\r\nX-Trailer: v\rX"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }

    #[test]
    fn test_incomplete_chunk() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhel"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hel"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"lo\r\n0\r\n\r\n");

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"lo"));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut buffer: BytesMut = BytesMut::from(&b"xyz\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }

    #[test]
    fn test_size_overflow() {
        let mut buffer: BytesMut = BytesMut::from(&b"fffffffffffffffff\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }

    #[test]
    fn test_missing_crlf() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhelloBad"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hello"));

        assert!(decoder.decode(&mut buffer).is_err());
    }

    #[test]
    fn test_zero_size_chunk() {
        let mut buffer: BytesMut = BytesMut::from(&b"0\r\n\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).unwrap().unwrap().is_eof());
    }
}
