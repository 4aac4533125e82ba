use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use micro_transport::protocol::body::RequestBody;
use micro_transport::transport::Transport;
use tracing::debug;

use crate::body::OnceBody;
use crate::error::{BoxError, RequestError};
use crate::response::{Exchange, PendingBody, Response};

/// An immutable description of a single HTTP call.
///
/// Every builder method returns a new `Request` and leaves the receiver unchanged, so a
/// partially configured request can be shared and extended from several places. Invalid
/// input (a malformed uri or header) is kept and reported by [`Request::retrieve`].
#[derive(Clone)]
pub struct Request {
    transport: Arc<dyn Transport>,
    uri: Uri,
    method: Option<Method>,
    timeout: Option<Duration>,
    headers: HeaderMap,
    body: Option<OnceBody>,
    error: Option<RequestError>,
}

impl Request {
    pub(crate) fn new(transport: Arc<dyn Transport>, uri: Uri, headers: HeaderMap, timeout: Option<Duration>) -> Self {
        Self { transport, uri, method: None, timeout, headers, body: None, error: None }
    }

    pub(crate) fn invalid(transport: Arc<dyn Transport>, error: RequestError) -> Self {
        Self { error: Some(error), ..Self::new(transport, Uri::default(), HeaderMap::new(), None) }
    }

    pub fn method(&self, method: Method) -> Self {
        Self { method: Some(method), ..self.clone() }
    }

    /// Sets the method and bounds the wait for the response head by `timeout`.
    pub fn method_with_timeout(&self, method: Method, timeout: Duration) -> Self {
        Self { method: Some(method), timeout: Some(timeout), ..self.clone() }
    }

    /// Appends a header, keeping any value already set under the same name.
    pub fn header<K, V>(&self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        <V as TryInto<HeaderValue>>::Error: Into<http::Error>,
    {
        if self.error.is_some() {
            return self.clone();
        }

        let header = name.try_into().map_err(Into::<http::Error>::into).and_then(|name| {
            let value = value.try_into().map_err(Into::<http::Error>::into)?;
            Ok((name, value))
        });

        match header {
            Ok((name, value)) => {
                let mut headers = self.headers.clone();
                headers.append(name, value);
                Self { headers, ..self.clone() }
            }
            Err(e) => Self { error: Some(RequestError::invalid_header(e)), ..self.clone() },
        }
    }

    /// Sets the payload, sent by `POST`, `PUT` and `PATCH` only.
    ///
    /// The body is shared by every request and response derived from this one and is sent
    /// at most once.
    pub fn body<B: Into<RequestBody>>(&self, body: B) -> Self {
        Self { body: Some(OnceBody::from(body.into())), ..self.clone() }
    }

    /// Sets a lazily produced payload, sent with chunked transfer encoding.
    pub fn body_stream<S, E>(&self, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.body(RequestBody::stream(stream))
    }

    pub fn method_ref(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn uri_ref(&self) -> &Uri {
        &self.uri
    }

    pub fn headers_ref(&self) -> &HeaderMap {
        &self.headers
    }

    /// Turns the description into a [`Response`] without any network activity.
    ///
    /// `GET`, `HEAD`, `DELETE` and `OPTIONS` are sent without payload and never touch the
    /// body. `POST`, `PUT` and `PATCH` send the body, or an explicit empty payload when
    /// none is set.
    ///
    /// # Errors
    ///
    /// Fails when the uri or a header was invalid, or the method is unset or not one of
    /// the methods above.
    pub fn retrieve(&self) -> Result<Response, RequestError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        let Some(method) = self.method.clone() else {
            return Err(RequestError::invalid_method(None));
        };

        let body = match method {
            Method::GET | Method::HEAD | Method::DELETE | Method::OPTIONS => PendingBody::Absent,
            Method::POST | Method::PUT | Method::PATCH => self.body.clone().map_or(PendingBody::Empty, PendingBody::Once),
            _ => return Err(RequestError::invalid_method(Some(method))),
        };

        debug!(method = %method, uri = %self.uri, timeout = ?self.timeout, "retrieve");
        Ok(Response::new(Exchange {
            transport: Arc::clone(&self.transport),
            method,
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            body,
            timeout: self.timeout,
        }))
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("uri", &self.uri)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
