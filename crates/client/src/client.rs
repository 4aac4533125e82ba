use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Uri};
use micro_transport::transport::{HttpTransport, Transport};

use crate::error::RequestError;
use crate::request::Request;

/// The entry point of the fluent chain.
///
/// A `WebClient` holds the transport and the defaults applied to every request it
/// creates. It is cheap to clone and can be shared between tasks.
#[derive(Clone)]
pub struct WebClient {
    transport: Arc<dyn Transport>,
    default_timeout: Option<Duration>,
    default_headers: HeaderMap,
}

impl WebClient {
    /// A client over [`HttpTransport`] with its default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> WebClientBuilder {
        WebClientBuilder::new()
    }

    /// Starts a request to `uri` with no method, the default headers and no body.
    ///
    /// An invalid `uri` is reported when the request is retrieved.
    pub fn uri<U>(&self, uri: U) -> Request
    where
        U: TryInto<Uri>,
        <U as TryInto<Uri>>::Error: Into<http::Error>,
    {
        match uri.try_into() {
            Ok(uri) => Request::new(Arc::clone(&self.transport), uri, self.default_headers.clone(), self.default_timeout),
            Err(e) => {
                let e: http::Error = e.into();
                Request::invalid(Arc::clone(&self.transport), RequestError::invalid_uri(e))
            }
        }
    }
}

impl Default for WebClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WebClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebClient")
            .field("default_timeout", &self.default_timeout)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

pub struct WebClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    default_timeout: Option<Duration>,
    default_headers: HeaderMap,
}

impl WebClientBuilder {
    fn new() -> Self {
        Self { transport: None, default_timeout: None, default_headers: HeaderMap::new() }
    }

    /// Replaces the default [`HttpTransport`].
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Bounds the wait for the response head of requests that set no timeout themselves.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Adds a header sent ahead of the headers of every request.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.append(name, value);
        self
    }

    pub fn build(self) -> WebClient {
        let transport = self.transport.unwrap_or_else(|| Arc::new(HttpTransport::new()));
        WebClient { transport, default_timeout: self.default_timeout, default_headers: self.default_headers }
    }
}

impl fmt::Debug for WebClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebClientBuilder")
            .field("default_timeout", &self.default_timeout)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use bytes::Bytes;
    use futures::TryStreamExt;
    use http::{Method, StatusCode};
    use std::io;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one connection: reads the request head, answers with `response` and
    /// returns what it received.
    async fn serve_once(response: &'static str) -> (Uri, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|window| window == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).to_string()
        });

        (format!("http://{addr}/items").parse().unwrap(), server)
    }

    #[test]
    fn invalid_uri_is_reported_by_retrieve() {
        let client = WebClient::new();

        let error = client.uri("http://exa mple.test/").method(Method::GET).retrieve().unwrap_err();

        assert!(matches!(error, RequestError::InvalidUri { .. }));
    }

    #[tokio::test]
    async fn streams_a_chunked_body_over_http() {
        let (uri, server) =
            serve_once("HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n").await;
        let client = WebClient::builder()
            .default_header(HeaderName::from_static("accept"), HeaderValue::from_static("text/plain"))
            .default_timeout(Duration::from_secs(5))
            .build();

        let chunks: Vec<Bytes> = client.uri(uri).method(Method::GET).header("x-trace", "abc").retrieve().unwrap().into_stream().try_collect().await.unwrap();

        assert_eq!(chunks.concat(), b"hello world");
        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /items http/1.1\r\n"));
        assert!(request.contains("accept: text/plain\r\n"));
        assert!(request.contains("x-trace: abc\r\n"));
    }

    #[tokio::test]
    async fn status_handler_sees_the_error_body_over_http() {
        let (uri, server) = serve_once("HTTP/1.1 404 Not Found\r\ncontent-length: 12\r\n\r\nno such item").await;
        let client = WebClient::new();

        let error = client
            .uri(uri)
            .method(Method::DELETE)
            .retrieve()
            .unwrap()
            .on_status(400, |status| Some(io::Error::other(status.body_as_text().to_string())))
            .bytes()
            .await
            .unwrap_err();

        match error {
            ClientError::Status { status, source } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(source.to_string(), "no such item");
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }
}
