//! The response side of the fluent chain.
//!
//! A [`Response`] describes a call that has not happened yet together with the hooks
//! to run against its result. [`Response::into_stream`] materializes it:
//!
//! 1. the request is issued and the response head awaited
//! 2. header handlers run, in registration order, for the headers present
//! 3. the status handler is looked up, exact code first and then the status class
//! 4. with a status handler the body is buffered and handed to it inside a
//!    [`ResponseStatus`]; the handler either fails the stream or lets the buffered body
//!    through as a single chunk. Without one the body streams through chunk by chunk
//! 5. the timing handler fires once the stream reaches its end

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt, stream};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::BodyExt;
use micro_transport::protocol::body::RequestBody;
use micro_transport::transport::Transport;
use tracing::{debug, trace, warn};

use crate::body::OnceBody;
use crate::error::{BoxError, ClientError, RequestError};
use crate::hooks::{HeaderHandlers, StatusHandlers, TimingHandler};
use crate::status::ResponseStatus;
use crate::stream::ResponseStream;

/// What the request sends as payload.
#[derive(Debug, Clone)]
pub(crate) enum PendingBody {
    /// no payload at all
    Absent,
    /// an explicit zero length payload
    Empty,
    Once(OnceBody),
}

/// A fully described call that has not been issued.
pub(crate) struct Exchange {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: PendingBody,
    pub(crate) timeout: Option<Duration>,
}

impl Exchange {
    async fn request(&self) -> Result<http::Request<Option<RequestBody>>, ClientError> {
        let body = match &self.body {
            PendingBody::Absent => None,
            PendingBody::Empty => Some(RequestBody::empty()),
            PendingBody::Once(once) => Some(once.take().await.ok_or(ClientError::BodyConsumed)?),
        };

        let mut request = http::Request::new(body);
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        Ok(request)
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// An immutable response description with its hooks.
///
/// Every hook registration returns a new `Response`; the receiver is left unchanged and
/// stays usable on its own.
#[derive(Debug, Clone)]
pub struct Response {
    exchange: Arc<Exchange>,
    status_handlers: StatusHandlers,
    header_handlers: HeaderHandlers,
    timing_handler: Option<TimingHandler>,
    error: Option<RequestError>,
}

impl Response {
    pub(crate) fn new(exchange: Exchange) -> Self {
        Self {
            exchange: Arc::new(exchange),
            status_handlers: StatusHandlers::default(),
            header_handlers: HeaderHandlers::default(),
            timing_handler: None,
            error: None,
        }
    }

    /// Registers `handler` for the status `code`.
    ///
    /// A code that is a multiple of 100 also handles every status of its class that has
    /// no handler of its own, so `400` covers a `409` but a `404` handler wins for `404`.
    /// Returning `Some(error)` fails the response stream with [`ClientError::Status`].
    pub fn on_status<F, E>(&self, code: u16, handler: F) -> Self
    where
        F: Fn(ResponseStatus) -> Option<E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self { status_handlers: self.status_handlers.with(code, handler), ..self.clone() }
    }

    /// Registers `handler` for the header `name`, run with the header's first value when the
    /// response carries it. An error fails the response stream with [`ClientError::Header`].
    pub fn on_header<K, F, Fut, E>(&self, name: K, handler: F) -> Self
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: Into<http::Error>,
        F: Fn(HeaderValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        match name.try_into() {
            Ok(name) => Self { header_handlers: self.header_handlers.with(name, handler), ..self.clone() },
            Err(e) => {
                let e: http::Error = e.into();
                Self { error: Some(RequestError::invalid_header(e)), ..self.clone() }
            }
        }
    }

    /// Sets the handler receiving the total time of the call, replacing any earlier one.
    pub fn with_timing<F, Fut>(&self, handler: F) -> Self
    where
        F: Fn(Duration) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self { timing_handler: Some(TimingHandler::new(handler)), ..self.clone() }
    }

    /// Materializes the call as a lazy stream of body chunks.
    pub fn into_stream(self) -> ResponseStream {
        let timing = self.timing_handler.clone();
        let inner = stream::once(self.materialize()).try_flatten().boxed();
        ResponseStream::new(inner, timing)
    }

    /// Materializes the call and gathers the whole body.
    ///
    /// # Errors
    ///
    /// Fails with the terminal error of the response stream.
    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        let buffer = self
            .into_stream()
            .try_fold(BytesMut::new(), |mut buffer, chunk| async move {
                buffer.extend_from_slice(&chunk);
                Ok(buffer)
            })
            .await?;
        Ok(buffer.freeze())
    }

    async fn materialize(self) -> Result<BoxStream<'static, Result<Bytes, ClientError>>, ClientError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }

        let exchange = &self.exchange;
        let request = exchange.request().await?;
        debug!(method = %exchange.method, uri = %exchange.uri, "issue request");

        let response = exchange.transport.issue(request, exchange.timeout).await?;
        let (parts, body) = response.into_parts();
        debug!(status = %parts.status, "received response head");

        self.header_handlers.run(&parts.headers).await?;

        let Some(status_handler) = self.status_handlers.find(parts.status) else {
            trace!(status = %parts.status, "no status handler, stream the body");
            return Ok(body.into_data_stream().map_err(ClientError::from).boxed());
        };

        let buffered = body.collect().await?.to_bytes();
        trace!(status = %parts.status, len = buffered.len(), "buffered body for status handler");

        let status = if buffered.is_empty() {
            ResponseStatus::without_body(parts.status, parts.headers)
        } else {
            ResponseStatus::with_body(parts.status, parts.headers, buffered.clone())
        };

        match status_handler(status) {
            Some(source) => {
                warn!(status = %parts.status, cause = %source, "status handler rejected the response");
                Err(ClientError::Status { status: parts.status, source })
            }
            None => Ok(stream::once(async move { Ok(buffered) }).boxed()),
        }
    }
}
