use bytes::{Buf, Bytes};

/// Represents a HTTP message that can either be a head or payload.
///
/// The generic parameter `T` is the head type: a request head on the encoding side,
/// a response head on the decoding side. `Data` is the payload buffer type.
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the head of the message
    Header(T),
    /// Contains a chunk of payload data or EOF marker
    Payload(PayloadItem<Data>),
}

/// Represents an item in the HTTP message payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// How the payload of a message is delimited on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes, announced by `content-length`
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// The message carries no payload at all
    Empty,
    /// Payload ends when the peer closes the connection, only valid for responses
    UntilEof,
}

impl PayloadSize {
    #[inline]
    pub fn new_length(length: u64) -> Self {
        PayloadSize::Length(length)
    }

    #[inline]
    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    #[inline]
    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the message has no payload
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }
}

impl PayloadItem {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
