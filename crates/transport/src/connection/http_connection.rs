use bytes::Bytes;

use futures::{SinkExt, StreamExt};
use http::{Request, Response};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{Instrument, debug, error, trace, warn};

use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::protocol::body::{RequestBody, ResponseBody, create_body_sender_receiver};
use crate::protocol::{
    Message, ParseError, PayloadItem, PayloadSize, RequestHead, ResponseHead, SendError, TransportError, is_informational,
};

use tokio_util::codec::{FramedRead, FramedWrite};

const DEFAULT_READ_CAPACITY: usize = 8 * 1024;

/// A client side HTTP/1.1 connection carrying exactly one exchange
///
/// # Type Parameters
///
/// * `R`: The async readable half of the stream
/// * `W`: The async writable half of the stream
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, ResponseDecoder>,
    framed_write: FramedWrite<W, RequestEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_capacity(reader, writer, DEFAULT_READ_CAPACITY)
    }

    pub fn with_capacity(reader: R, writer: W, read_capacity: usize) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, ResponseDecoder::new(), read_capacity),
            framed_write: FramedWrite::new(writer, RequestEncoder::new()),
        }
    }

    /// Sends `request` and waits for the head of its final response.
    ///
    /// A `None` body sends the request without any payload. The returned body streams the
    /// payload from the connection on demand; dropping it before the end closes the
    /// connection.
    ///
    /// # Errors
    ///
    /// Fails when the request can't be written, or the response head is malformed or
    /// never arrives.
    pub async fn exchange(mut self, request: Request<Option<RequestBody>>) -> Result<Response<ResponseBody>, TransportError> {
        let (parts, body) = request.into_parts();
        let head = RequestHead::from_parts(parts, ());
        *self.framed_read.decoder_mut() = ResponseDecoder::for_method(head.method());

        self.send_request(head, body).await?;
        let (head, payload_size) = self.read_head().await?;
        trace!(status = %head.status(), ?payload_size, "received response head");

        if payload_size.is_empty() {
            return Ok(head.map(|()| ResponseBody::empty()));
        }

        let Self { framed_read, framed_write } = self;
        let (mut body_sender, body_receiver) = create_body_sender_receiver(framed_read, payload_size);

        tokio::spawn(
            async move {
                match body_sender.start().await {
                    Ok(true) => trace!("response payload finished, closing connection"),
                    Ok(false) => debug!("response body dropped before its end, closing connection"),
                    Err(e) => warn!(cause = %e, "failed to read response payload"),
                }
                drop(framed_write);
            }
            .in_current_span(),
        );

        Ok(head.map(|()| ResponseBody::channel(body_receiver)))
    }

    async fn send_request(&mut self, head: RequestHead, body: Option<RequestBody>) -> Result<(), SendError> {
        let Some(mut body) = body else {
            self.framed_write.send(Message::<_, Bytes>::Header((head, PayloadSize::Empty))).await?;
            return Ok(());
        };

        let payload_size = match body.size_hint().exact() {
            Some(length) => PayloadSize::Length(length),
            None => PayloadSize::Chunked,
        };

        self.framed_write.feed(Message::<_, Bytes>::Header((head, payload_size))).await?;

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    let Ok(data) = frame.into_data() else {
                        trace!("skip non data frame of request body");
                        continue;
                    };
                    self.framed_write.send(Message::Payload(PayloadItem::Chunk(data))).await?;
                }
                Some(Err(e)) => {
                    error!(cause = %e, "failed to read request body");
                    return Err(SendError::invalid_body(format!("resolve request body error: {e}")));
                }
                None => {
                    self.framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
                    return Ok(());
                }
            }
        }
    }

    async fn read_head(&mut self) -> Result<(ResponseHead, PayloadSize), ParseError> {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((head, payload_size)))) => {
                    if is_informational(head.status()) {
                        debug!(status = %head.status(), "skip interim response");
                        continue;
                    }
                    return Ok((head, payload_size));
                }
                Some(Ok(Message::Payload(_))) => {
                    error!("receive payload before the response head");
                    return Err(ParseError::invalid_body("need response head while receive payload"));
                }
                Some(Err(e)) => return Err(e),
                None => return Err(ParseError::invalid_header("connection closed before the response head")),
            }
        }
    }
}

impl<R, W> std::fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("decoder", self.framed_read.decoder())
            .field("encoder", self.framed_write.encoder())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    async fn exchange_with(
        request: Request<Option<RequestBody>>,
        response: &'static [u8],
    ) -> (Response<ResponseBody>, tokio::task::JoinHandle<Vec<u8>>) {
        let (client, mut server) = duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(client);

        let server = tokio::spawn(async move {
            let mut received = vec![0; 4096];
            let n = server.read(&mut received).await.unwrap();
            received.truncate(n);
            server.write_all(response).await.unwrap();
            server.shutdown().await.unwrap();
            received
        });

        let response = HttpConnection::new(reader, writer).exchange(request).await.unwrap();
        (response, server)
    }

    #[tokio::test]
    async fn get_streams_length_delimited_body() {
        let request = Request::builder().uri("http://local.test/items").body(None).unwrap();

        let (response, server) = exchange_with(request, b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"hello"));

        let sent = String::from_utf8(server.await.unwrap()).unwrap();
        assert_eq!(sent, "GET /items HTTP/1.1\r\nhost: local.test\r\n\r\n");
    }

    #[tokio::test]
    async fn post_sends_length_and_skips_interim_response() {
        let request =
            Request::builder().method(Method::POST).uri("http://local.test/").body(Some(RequestBody::from("payload"))).unwrap();

        let (response, server) = exchange_with(
            request,
            b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r\n0\r\n\r\n",
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"ok"));

        let sent = String::from_utf8(server.await.unwrap()).unwrap();
        assert!(sent.contains("content-length: 7\r\n"));
        assert!(sent.ends_with("\r\n\r\npayload"));
    }

    #[tokio::test]
    async fn head_response_has_empty_body() {
        let request = Request::builder().method(Method::HEAD).uri("http://local.test/").body(None).unwrap();

        let (response, _server) = exchange_with(request, b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n").await;

        assert!(response.body().is_end_stream());
    }

    #[tokio::test]
    async fn truncated_body_reports_error() {
        let request = Request::builder().uri("http://local.test/").body(None).unwrap();

        let (response, _server) = exchange_with(request, b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc").await;

        let mut body = response.into_body();
        assert_eq!(body.frame().await.unwrap().unwrap().into_data().unwrap(), Bytes::from_static(b"abc"));
        assert!(matches!(
            body.frame().await.unwrap(),
            Err(TransportError::ResponseError { source: ParseError::IncompleteBody })
        ));
    }
}
