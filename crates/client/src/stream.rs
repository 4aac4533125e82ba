use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Instant;

use bytes::Bytes;
use futures::Stream;
use futures::stream::{BoxStream, FusedStream};
use pin_project_lite::pin_project;

use crate::error::ClientError;
use crate::hooks::TimingHandler;

pin_project! {
    /// The lazily produced body chunks of a materialized [`Response`](crate::Response).
    ///
    /// Nothing is sent before the first poll. The stream yields the body chunks and ends,
    /// or yields a single error and ends; it is fused afterwards. The timing handler, if
    /// any, fires once with the time elapsed since the first poll: when the stream ends,
    /// fails, or is dropped before its end. Dropping the stream aborts the exchange.
    pub struct ResponseStream {
        #[pin]
        inner: BoxStream<'static, Result<Bytes, ClientError>>,
        timing: Option<TimingProbe>,
        terminated: bool,
    }

    impl PinnedDrop for ResponseStream {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(probe) = this.timing.take() {
                probe.finish();
            }
        }
    }
}

impl ResponseStream {
    pub(crate) fn new(inner: BoxStream<'static, Result<Bytes, ClientError>>, timing: Option<TimingHandler>) -> Self {
        Self { inner, timing: timing.map(TimingProbe::new), terminated: false }
    }
}

impl Stream for ResponseStream {
    type Item = Result<Bytes, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.terminated {
            return Poll::Ready(None);
        }

        if let Some(probe) = this.timing.as_mut() {
            probe.start();
        }

        let next = ready!(this.inner.poll_next(cx));
        if !matches!(next, Some(Ok(_))) {
            *this.terminated = true;
            if let Some(probe) = this.timing.take() {
                probe.finish();
            }
        }

        Poll::Ready(next)
    }
}

impl FusedStream for ResponseStream {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream").field("timing", &self.timing).field("terminated", &self.terminated).finish_non_exhaustive()
    }
}

/// Measures a materialization from its first poll.
#[derive(Debug)]
struct TimingProbe {
    handler: TimingHandler,
    started: Option<Instant>,
}

impl TimingProbe {
    fn new(handler: TimingHandler) -> Self {
        Self { handler, started: None }
    }

    fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Fires the handler, unless the stream was never polled.
    fn finish(self) {
        if let Some(started) = self.started {
            self.handler.fire(started.elapsed());
        }
    }
}
