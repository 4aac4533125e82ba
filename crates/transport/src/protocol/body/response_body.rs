use crate::protocol::TransportError;
use crate::protocol::body::body_channel::BodyReceiver;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::StreamBody;
use http_body_util::combinators::UnsyncBoxBody;
use std::error::Error;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The payload of a response, consumed at most once.
///
/// Bodies read from a live connection pull one chunk from the socket per poll.
/// Dropping such a body before its end aborts the exchange.
pub struct ResponseBody {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Channel(BodyReceiver),
    Stream(UnsyncBoxBody<Bytes, TransportError>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: Kind::Once(Some(bytes)) }
    }

    /// Wraps any lazy sequence of chunks, used by alternative transports and tests.
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>> + 'static,
    {
        let frames = stream.map_ok(Frame::data).map_err(TransportError::body);
        Self { inner: Kind::Stream(UnsyncBoxBody::new(StreamBody::new(frames))) }
    }

    pub(crate) fn channel(receiver: BodyReceiver) -> Self {
        Self { inner: Kind::Channel(receiver) }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Once(bytes) => f.debug_tuple("ResponseBody::Once").field(&bytes.as_ref().map(Bytes::len)).finish(),
            Kind::Channel(receiver) => f.debug_tuple("ResponseBody::Channel").field(receiver).finish(),
            Kind::Stream(_) => f.write_str("ResponseBody::Stream"),
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::once(bytes)
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from_static(value.as_bytes())) }
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = TransportError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Channel(receiver) => Pin::new(receiver).poll_frame(cx).map_err(TransportError::from),
            Kind::Stream(box_body) => Pin::new(box_body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::Channel(receiver) => receiver.is_end_stream(),
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Channel(receiver) => receiver.size_hint(),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::io;

    fn check_send<T: Send>() {}

    #[test]
    fn is_send() {
        check_send::<ResponseBody>();
    }

    #[tokio::test]
    async fn string_body_is_a_single_frame() {
        let mut body = ResponseBody::from("Hello world".to_string());

        assert_eq!(body.size_hint().exact(), Some(11));
        assert!(!body.is_end_stream());

        let bytes = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(bytes, Bytes::from("Hello world"));

        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn empty_str_is_an_empty_body() {
        let mut body = ResponseBody::from("");

        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn stream_body_collects_all_chunks() {
        let chunks: Vec<Result<Bytes, io::Error>> =
            vec![Ok(Bytes::from(vec![1])), Ok(Bytes::from(vec![2])), Ok(Bytes::from(vec![3]))];
        let body = ResponseBody::stream(futures::stream::iter(chunks));

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), [1, 2, 3]);
    }
}
