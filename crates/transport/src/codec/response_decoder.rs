//! HTTP response decoder module
//!
//! Decodes the response of one exchange as a stream of [`Message`]s: the head first,
//! then the payload items. Decoding happens in two phases:
//!
//! 1. Head parsing through [`HeaderDecoder`], which also picks the payload framing
//! 2. Payload parsing through [`PayloadDecoder`] until `Eof`
//!
//! A response without payload yields only its head. When the read side reaches end of
//! stream, a close delimited payload is finished with `Eof` while any other unfinished
//! payload fails with [`ParseError::IncompleteBody`].

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHead, is_bodiless_method};
use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

/// A decoder for HTTP responses that handles both the head and the payload
///
/// # State Machine
///
/// The decoder keeps its state in the `payload_decoder` field:
/// - `None`: currently parsing a head
/// - `Some(PayloadDecoder)`: currently parsing a payload
#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    /// Creates a decoder for the response to a request that was not `HEAD`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder for the response to a request sent with `method`.
    pub fn for_method(method: &Method) -> Self {
        Self { header_decoder: HeaderDecoder::new(is_bodiless_method(method)), payload_decoder: None }
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder::new(false), payload_decoder: None }
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    /// Attempts to decode the next part of a response from `src`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: decoded a response head
    /// - `Ok(Some(Message::Payload(_)))`: decoded a payload chunk or the payload end
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the response is malformed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some((head, payload_size)) => {
                if !payload_size.is_empty() {
                    self.payload_decoder = Some(payload_size.into());
                }
                Some(Message::Header((head, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }

        match self.payload_decoder.as_ref().map(PayloadDecoder::is_close_delimited) {
            Some(true) => {
                debug!("connection closed, close delimited payload finished");
                self.payload_decoder.take();
                Ok(Some(Message::Payload(PayloadItem::Eof)))
            }
            Some(false) => {
                warn!("connection closed before the payload completed");
                Err(ParseError::IncompleteBody)
            }
            None if src.is_empty() => Ok(None),
            None => {
                warn!(remaining = src.len(), "connection closed inside a response head");
                Err(ParseError::invalid_header("connection closed before the response head completed"))
            }
        }
    }
}
