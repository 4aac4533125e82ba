use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, PayloadSize, RequestHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes one request: its head first, then every payload item up to `Eof`.
#[derive(Debug)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for RequestEncoder {
    fn default() -> Self {
        Self { header_encoder: HeaderEncoder, payload_encoder: None }
    }
}

impl<D: Buf> Encoder<Message<(RequestHead, PayloadSize), D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(RequestHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive request head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                let payload_encoder = PayloadEncoder::for_size(payload_size)?;
                self.header_encoder.encode((head, payload_size), dst)?;
                if !payload_encoder.is_finish() {
                    self.payload_encoder = Some(payload_encoder);
                }
                Ok(())
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    if payload_item.is_eof() {
                        return Ok(());
                    }
                    error!("expect request head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, Request};
    use crate::protocol::PayloadItem;

    #[test]
    fn encodes_head_and_chunked_payload() {
        let head = Request::builder().method(Method::POST).uri("http://localhost:3000/upload").body(()).unwrap();
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head, PayloadSize::Chunked)), &mut dst).unwrap();
        encoder.encode(Message::<(RequestHead, PayloadSize), _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc"))), &mut dst).unwrap();
        encoder.encode(Message::<(RequestHead, PayloadSize), Bytes>::Payload(PayloadItem::Eof), &mut dst).unwrap();

        assert_eq!(
            String::from_utf8(dst.to_vec()).unwrap(),
            "POST /upload HTTP/1.1\r\nhost: localhost:3000\r\ntransfer-encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n"
        );
    }

    #[test]
    fn eof_after_bodiless_head_is_ignored() {
        let head = Request::builder().method(Method::GET).uri("http://localhost/").body(()).unwrap();
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head, PayloadSize::Empty)), &mut dst).unwrap();
        encoder.encode(Message::<(RequestHead, PayloadSize), Bytes>::Payload(PayloadItem::Eof), &mut dst).unwrap();

        assert_eq!(&dst[..], &b"GET / HTTP/1.1\r\nhost: localhost\r\n\r\n"[..]);
    }

    #[test]
    fn payload_before_head_fails() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        let result = encoder.encode(
            Message::<(RequestHead, PayloadSize), _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"early"))),
            &mut dst,
        );
        assert!(result.is_err());
    }
}
