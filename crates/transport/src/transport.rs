//! The seam between the fluent client and the network.
//!
//! [`Transport`] issues one request and resolves once the response head is known.
//! [`HttpTransport`] is the plaintext HTTP/1.1 implementation over tokio TCP sockets;
//! other implementations (in-memory fakes, instrumented wrappers) plug in the same way.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{CONNECTION, USER_AGENT};
use http::{HeaderValue, Request, Response, Uri};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info_span, Instrument};

use crate::connection::HttpConnection;
use crate::protocol::TransportError;
use crate::protocol::body::{RequestBody, ResponseBody};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_BUFFER_CAPACITY: usize = 8 * 1024;
const DEFAULT_USER_AGENT: &str = concat!("micro-webclient/", env!("CARGO_PKG_VERSION"));
const DEFAULT_HTTP_PORT: u16 = 80;

/// Issues HTTP requests.
///
/// A `None` request body means the request carries no payload at all, while
/// `Some(RequestBody::empty())` is an explicit zero length payload.
///
/// `timeout` bounds the time from issuing the request to receiving the response
/// head. Reading the body is not covered.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn issue(
        &self,
        request: Request<Option<RequestBody>>,
        timeout: Option<Duration>,
    ) -> Result<Response<ResponseBody>, TransportError>;
}

/// HTTP/1.1 over plain TCP, one connection per request.
///
/// Every request is sent with `connection: close`, and a `user-agent` is added
/// unless the request already carries one.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    connect_timeout: Duration,
    read_buffer_capacity: usize,
    user_agent: HeaderValue,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    async fn connect_and_exchange(
        &self,
        host: &str,
        port: u16,
        request: Request<Option<RequestBody>>,
    ) -> Result<Response<ResponseBody>, TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_elapsed| TransportError::connect(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")))?
            .map_err(TransportError::connect)?;
        stream.set_nodelay(true).map_err(TransportError::connect)?;
        debug!(host, port, "connected");

        let (reader, writer) = stream.into_split();
        HttpConnection::with_capacity(reader, writer, self.read_buffer_capacity).exchange(request).await
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn issue(
        &self,
        mut request: Request<Option<RequestBody>>,
        timeout: Option<Duration>,
    ) -> Result<Response<ResponseBody>, TransportError> {
        let (host, port) = host_and_port(request.uri())?;

        let headers = request.headers_mut();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, self.user_agent.clone());
        }

        let span = info_span!("issue", method = %request.method(), uri = %request.uri());
        let exchange = self.connect_and_exchange(&host, port, request).instrument(span);

        match timeout {
            Some(limit) => {
                let started = Instant::now();
                tokio::time::timeout(limit, exchange)
                    .await
                    .map_err(|_elapsed| TransportError::Timeout { elapsed: started.elapsed() })?
            }
            None => exchange.await,
        }
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    connect_timeout: Duration,
    read_buffer_capacity: usize,
    user_agent: HeaderValue,
}

impl HttpTransportBuilder {
    fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity;
        self
    }

    pub fn user_agent(mut self, user_agent: HeaderValue) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn build(self) -> HttpTransport {
        HttpTransport {
            connect_timeout: self.connect_timeout,
            read_buffer_capacity: self.read_buffer_capacity,
            user_agent: self.user_agent,
        }
    }
}

fn host_and_port(uri: &Uri) -> Result<(String, u16), TransportError> {
    match uri.scheme_str() {
        Some("http") => {}
        Some(scheme) => return Err(TransportError::unsupported_scheme(scheme)),
        None => return Err(TransportError::invalid_uri(format!("{uri} is not absolute"))),
    }

    let host = uri.host().ok_or_else(|| TransportError::invalid_uri(format!("{uri} has no host")))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    Ok((host.to_string(), uri.port_u16().unwrap_or(DEFAULT_HTTP_PORT)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&received).to_string();
            let Some(head_end) = text.find("\r\n\r\n") else { continue };
            let head = text[..head_end].to_ascii_lowercase();
            let body = &text[head_end + 4..];
            let content_length =
                head.lines().find_map(|line| line.strip_prefix("content-length: ")).and_then(|value| value.trim().parse::<usize>().ok());

            let complete = if head.contains("transfer-encoding: chunked") {
                body.ends_with("0\r\n\r\n")
            } else {
                body.len() >= content_length.unwrap_or(0)
            };
            if complete {
                break;
            }
        }
        String::from_utf8(received).unwrap()
    }

    async fn serve_once(response: &'static [u8]) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            stream.write_all(response).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });
        (addr, handle)
    }

    fn request(method: Method, addr: SocketAddr, body: Option<RequestBody>) -> Request<Option<RequestBody>> {
        Request::builder().method(method).uri(format!("http://{addr}/path?x=1")).body(body).unwrap()
    }

    #[tokio::test]
    async fn get_sends_close_and_user_agent() {
        let (addr, server) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi").await;

        let response = HttpTransport::new().issue(request(Method::GET, addr, None), None).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.into_body().collect().await.unwrap().to_bytes(), Bytes::from_static(b"hi"));

        let sent = server.await.unwrap();
        assert!(sent.starts_with("GET /path?x=1 HTTP/1.1\r\n"));
        assert!(sent.contains("connection: close\r\n"));
        assert!(sent.contains(&format!("user-agent: {DEFAULT_USER_AGENT}\r\n")));
        assert!(!sent.contains("content-length"));
    }

    #[tokio::test]
    async fn empty_body_is_sent_with_zero_length() {
        let (addr, server) = serve_once(b"HTTP/1.1 204 No Content\r\n\r\n").await;

        let response = HttpTransport::new().issue(request(Method::POST, addr, Some(RequestBody::empty())), None).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(server.await.unwrap().contains("content-length: 0\r\n"));
    }

    #[tokio::test]
    async fn stream_body_is_sent_chunked() {
        let (addr, server) = serve_once(b"HTTP/1.0 200 OK\r\n\r\nuntil close").await;
        let chunks: Vec<Result<Bytes, io::Error>> = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let body = RequestBody::stream(futures::stream::iter(chunks));

        let response = HttpTransport::new().issue(request(Method::PUT, addr, Some(body)), None).await.unwrap();

        assert_eq!(response.into_body().collect().await.unwrap().to_bytes(), Bytes::from_static(b"until close"));
        let sent = server.await.unwrap();
        assert!(sent.contains("transfer-encoding: chunked\r\n"));
        assert!(sent.ends_with("2\r\nab\r\n2\r\ncd\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn chunked_body_with_trailer_ends_without_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\nX-Checksum: 5d41\r\n\r\n")
                .await
                .unwrap();
            let mut buf = [0u8; 16];
            tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await
        });

        let response = HttpTransport::new().issue(request(Method::GET, addr, None), None).await.unwrap();
        let body = tokio::time::timeout(Duration::from_secs(5), response.into_body().collect()).await.unwrap().unwrap();

        assert_eq!(body.to_bytes(), Bytes::from_static(b"hello"));
        assert!(matches!(server.await.unwrap(), Ok(Ok(0))));
    }

    #[tokio::test]
    async fn missing_head_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let result = HttpTransport::new().issue(request(Method::GET, addr, None), Some(Duration::from_millis(100))).await;

        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        server.abort();
    }

    #[tokio::test]
    async fn dropped_body_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            stream.write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n").await.unwrap();
            let mut buf = [0u8; 16];
            tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await
        });

        let response = HttpTransport::new().issue(request(Method::GET, addr, None), None).await.unwrap();
        drop(response);

        let read = server.await.unwrap();
        assert!(matches!(read, Ok(Ok(0))));
    }

    #[tokio::test]
    async fn https_is_unsupported() {
        let uri = "https://127.0.0.1/";
        let request = Request::builder().uri(uri).body(None).unwrap();

        let result = HttpTransport::new().issue(request, None).await;

        assert!(matches!(result, Err(TransportError::UnsupportedScheme { scheme }) if scheme == "https"));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = HttpTransport::new().issue(request(Method::GET, addr, None), None).await;

        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn default_port_and_ipv6_host() {
        let uri: Uri = "http://[::1]/".parse().unwrap();
        assert_eq!(host_and_port(&uri).unwrap(), ("::1".to_string(), 80));

        let uri: Uri = "/relative".parse().unwrap();
        assert!(matches!(host_and_port(&uri), Err(TransportError::InvalidUri { .. })));
    }
}
