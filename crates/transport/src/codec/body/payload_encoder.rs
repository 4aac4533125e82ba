use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::warn;

/// Frames the payload items of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// content-length payload, `remaining` bytes still expected
    Length { remaining: u64, eof: bool },

    /// transfer-encoding chunked payload
    Chunked { eof: bool },

    /// the request carries no payload
    NoBody,
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked { eof: false } }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length { remaining: size, eof: false } }
    }

    /// Picks the framing announced by the request head.
    ///
    /// # Errors
    ///
    /// A request payload can't be delimited by closing the connection.
    pub fn for_size(payload_size: PayloadSize) -> Result<Self, SendError> {
        match payload_size {
            PayloadSize::Length(size) => Ok(Self::fix_length(size)),
            PayloadSize::Chunked => Ok(Self::chunked()),
            PayloadSize::Empty => Ok(Self::empty()),
            PayloadSize::UntilEof => Err(SendError::invalid_body("request payload can't be close delimited")),
        }
    }

    pub fn is_finish(&self) -> bool {
        match &self.kind {
            Kind::Length { eof, .. } | Kind::Chunked { eof } => *eof,
            Kind::NoBody => true,
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match (&mut self.kind, item) {
            (Kind::NoBody, PayloadItem::Chunk(bytes)) if bytes.has_remaining() => {
                Err(SendError::invalid_body("request without payload received a chunk"))
            }
            (Kind::NoBody, _) => Ok(()),

            (Kind::Length { eof: true, .. } | Kind::Chunked { eof: true }, _) => {
                warn!("encode payload_item but the payload already finished");
                Ok(())
            }

            (Kind::Length { remaining, .. }, PayloadItem::Chunk(mut bytes)) => {
                let len = bytes.remaining() as u64;
                if len > *remaining {
                    return Err(SendError::invalid_body(format!("payload exceeds content-length by {} bytes", len - *remaining)));
                }
                *remaining -= len;
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let n = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(n);
                }
                Ok(())
            }
            (Kind::Length { remaining, eof }, PayloadItem::Eof) => {
                if *remaining != 0 {
                    return Err(SendError::invalid_body(format!("payload is {remaining} bytes shorter than content-length")));
                }
                *eof = true;
                Ok(())
            }

            (Kind::Chunked { .. }, PayloadItem::Chunk(mut bytes)) => {
                // an empty chunk would read as the last chunk
                if !bytes.has_remaining() {
                    return Ok(());
                }
                write!(ChunkWriter(dst), "{:X}\r\n", bytes.remaining())?;
                dst.reserve(bytes.remaining() + 2);
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let n = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(n);
                }
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            (Kind::Chunked { eof }, PayloadItem::Eof) => {
                *eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}

struct ChunkWriter<'a>(&'a mut BytesMut);

impl Write for ChunkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
