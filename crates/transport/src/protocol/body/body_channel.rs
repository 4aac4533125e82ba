use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHead};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt, channel::mpsc};
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, error, trace};

type ResponseMessage = Result<Message<(ResponseHead, PayloadSize)>, ParseError>;

/// Splits the remaining response payload into a reader half driven by the connection task
/// and a [`Body`] half handed to the caller.
pub(crate) fn create_body_sender_receiver<S>(payload_stream: S, payload_size: PayloadSize) -> (BodySender<S>, BodyReceiver)
where
    S: Stream<Item = ResponseMessage> + Unpin,
{
    let (signal_sender, signal_receiver) = mpsc::channel(1);
    let (data_sender, data_receiver) = mpsc::channel(1);

    (BodySender::new(payload_stream, signal_receiver, data_sender), BodyReceiver::new(signal_sender, data_receiver, payload_size))
}

pub(crate) enum BodyRequestSignal {
    RequestData,
}

pub(crate) struct BodySender<S> {
    payload_stream: S,
    signal_receiver: mpsc::Receiver<BodyRequestSignal>,
    data_sender: mpsc::Sender<Result<PayloadItem, ParseError>>,
    eof: bool,
}

impl<S> BodySender<S>
where
    S: Stream<Item = ResponseMessage> + Unpin,
{
    pub fn new(
        payload_stream: S,
        signal_receiver: mpsc::Receiver<BodyRequestSignal>,
        data_sender: mpsc::Sender<Result<PayloadItem, ParseError>>,
    ) -> Self {
        Self { payload_stream, signal_receiver, data_sender, eof: false }
    }

    /// Reads one payload item per demand signal until EOF, an error, or the receiver is dropped.
    ///
    /// Returns `Ok(true)` when the body was read to the end, `Ok(false)` when the consumer
    /// went away first.
    pub(crate) async fn start(&mut self) -> Result<bool, ParseError> {
        if self.eof {
            return Ok(true);
        }

        while let Some(signal) = self.signal_receiver.next().await {
            match signal {
                BodyRequestSignal::RequestData => match self.read_data().await {
                    Ok(payload_item) => {
                        self.eof = payload_item.is_eof();
                        if let Err(e) = self.data_sender.send(Ok(payload_item)).await {
                            debug!("response body receiver dropped, {}", e);
                            return Ok(false);
                        }

                        if self.eof {
                            return Ok(true);
                        }
                    }

                    Err(e) => {
                        error!("failed to read data from response stream, {}", e);
                        let reason = e.to_string();
                        if let Err(send_error) = self.data_sender.send(Err(e)).await {
                            debug!("failed to send error through channel, {}", send_error);
                        }
                        return Err(ParseError::invalid_body(reason));
                    }
                },
            }
        }

        debug!("response body dropped before eof, abort the exchange");
        Ok(false)
    }

    pub(crate) async fn read_data(&mut self) -> Result<PayloadItem, ParseError> {
        match self.payload_stream.next().await {
            Some(Ok(Message::Payload(payload_item))) => Ok(payload_item),
            Some(Ok(Message::Header(_))) => {
                error!("should not receive response head in BodySender");
                Err(ParseError::invalid_body("should not receive response head in BodySender"))
            }
            Some(Err(e)) => Err(e),
            None => Err(ParseError::IncompleteBody),
        }
    }
}

#[derive(Debug)]
pub(crate) struct BodyReceiver {
    signal_sender: mpsc::Sender<BodyRequestSignal>,
    data_receiver: mpsc::Receiver<Result<PayloadItem, ParseError>>,
    payload_size: PayloadSize,
    in_flight: bool,
    eof: bool,
}

impl BodyReceiver {
    pub(crate) fn new(
        signal_sender: mpsc::Sender<BodyRequestSignal>,
        data_receiver: mpsc::Receiver<Result<PayloadItem, ParseError>>,
        payload_size: PayloadSize,
    ) -> Self {
        Self { signal_sender, data_receiver, payload_size, in_flight: false, eof: false }
    }
}

impl Body for BodyReceiver {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if this.eof {
            return Poll::Ready(None);
        }

        if !this.in_flight {
            match Pin::new(&mut this.signal_sender).poll_ready(cx) {
                Poll::Ready(Ok(())) => {
                    if let Err(e) = Pin::new(&mut this.signal_sender).start_send(BodyRequestSignal::RequestData) {
                        error!("failed to send request_more through channel, {}", e);
                        this.eof = true;
                        return Poll::Ready(Some(Err(ParseError::invalid_body("response reader has stopped"))));
                    }
                    trace!("requested next response chunk");
                    this.in_flight = true;
                }
                Poll::Ready(Err(e)) => {
                    error!("failed to prepare request_more through channel, {}", e);
                    this.eof = true;
                    return Poll::Ready(Some(Err(ParseError::invalid_body("response reader has stopped"))));
                }
                Poll::Pending => return Poll::Pending,
            }
        }

        match this.data_receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(PayloadItem::Chunk(bytes)))) => {
                this.in_flight = false;
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            Poll::Ready(Some(Ok(PayloadItem::Eof))) => {
                this.in_flight = false;
                this.eof = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.in_flight = false;
                this.eof = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.in_flight = false;
                this.eof = true;
                Poll::Ready(Some(Err(ParseError::IncompleteBody)))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.eof
    }

    fn size_hint(&self) -> SizeHint {
        match self.payload_size {
            PayloadSize::Length(length) => SizeHint::with_exact(length),
            PayloadSize::Empty => SizeHint::with_exact(0),
            PayloadSize::Chunked | PayloadSize::UntilEof => SizeHint::new(),
        }
    }
}
