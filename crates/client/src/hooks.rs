//! Hook registries attached to a [`Response`](crate::Response).
//!
//! Every registry is a persistent value: registering a hook returns an extended copy
//! and leaves the original untouched. Registering the same status code or header name
//! twice replaces the earlier hook.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::executor;
use futures::future::BoxFuture;
use futures::{FutureExt, TryFutureExt};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::runtime::Handle;
use tracing::{Instrument, debug, trace, warn};

use crate::error::{BoxError, ClientError};
use crate::status::ResponseStatus;

pub(crate) type StatusFn = dyn Fn(ResponseStatus) -> Option<BoxError> + Send + Sync;
type HeaderFn = dyn Fn(HeaderValue) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync;
type TimingFn = dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync;

/// Status handlers keyed by exact code; a code that is a multiple of 100 also serves
/// as the fallback for its whole class.
#[derive(Clone, Default)]
pub(crate) struct StatusHandlers {
    handlers: HashMap<u16, Arc<StatusFn>>,
}

impl StatusHandlers {
    pub(crate) fn with<F, E>(&self, code: u16, handler: F) -> Self
    where
        F: Fn(ResponseStatus) -> Option<E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let mut handlers = self.handlers.clone();
        handlers.insert(code, Arc::new(move |status: ResponseStatus| -> Option<BoxError> { handler(status).map(Into::into) }));
        Self { handlers }
    }

    /// Finds the handler for `status`: the exact code first, then its class.
    pub(crate) fn find(&self, status: StatusCode) -> Option<Arc<StatusFn>> {
        let code = status.as_u16();
        self.handlers.get(&code).or_else(|| self.handlers.get(&(code - code % 100))).cloned()
    }
}

impl fmt::Debug for StatusHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.handlers.keys().collect();
        codes.sort_unstable();
        f.debug_tuple("StatusHandlers").field(&codes).finish()
    }
}

/// Header handlers in registration order.
#[derive(Clone, Default)]
pub(crate) struct HeaderHandlers {
    handlers: Vec<(HeaderName, Arc<HeaderFn>)>,
}

impl HeaderHandlers {
    pub(crate) fn with<F, Fut, E>(&self, name: HeaderName, handler: F) -> Self
    where
        F: Fn(HeaderValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let handler: Arc<HeaderFn> = Arc::new(move |value: HeaderValue| -> BoxFuture<'static, Result<(), BoxError>> {
            handler(value).map_err(Into::into).boxed()
        });

        let mut handlers = self.handlers.clone();
        match handlers.iter_mut().find(|(registered, _)| *registered == name) {
            Some(entry) => entry.1 = handler,
            None => handlers.push((name, handler)),
        }
        Self { handlers }
    }

    /// Runs, one after another, the handler of every registered header present in
    /// `headers` with the first value of that header.
    pub(crate) async fn run(&self, headers: &HeaderMap) -> Result<(), ClientError> {
        for (name, handler) in &self.handlers {
            let Some(value) = headers.get(name) else {
                continue;
            };

            trace!(header = %name, "run header handler");
            handler(value.clone()).await.map_err(|source| {
                warn!(header = %name, cause = %source, "header handler failed");
                ClientError::Header { name: name.clone(), source }
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for HeaderHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.iter().map(|(name, _)| name)).finish()
    }
}

/// Receives the elapsed time of a materialized response.
#[derive(Clone)]
pub(crate) struct TimingHandler {
    handler: Arc<TimingFn>,
}

impl TimingHandler {
    pub(crate) fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Duration) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self { handler: Arc::new(move |elapsed: Duration| -> BoxFuture<'static, ()> { handler(elapsed).boxed() }) }
    }

    /// Starts the handler without waiting for it.
    ///
    /// Inside a tokio runtime it is spawned in the current span, otherwise it is driven
    /// on a detached thread. The calling thread never blocks on it.
    pub(crate) fn fire(&self, elapsed: Duration) {
        debug!(elapsed_ms = elapsed.as_millis(), "response finished, fire timing handler");
        let timing = (self.handler)(elapsed).in_current_span();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(timing);
            }
            Err(_) => {
                let spawned = thread::Builder::new().name("micro-webclient-timing".into()).spawn(move || executor::block_on(timing));
                if let Err(e) = spawned {
                    warn!(cause = %e, "failed to start timing handler thread");
                }
            }
        }
    }
}

impl fmt::Debug for TimingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimingHandler")
    }
}
