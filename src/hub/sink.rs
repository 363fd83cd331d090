//! Client Sinks
//!
//! A sink is the hub's end of one subscriber connection. It is a bounded
//! channel: the transport drains the [`ClientStream`] half and the hub
//! writes frames into the [`ClientSink`] half. Dropping the last sink
//! clone closes the stream, which ends the transport response.

use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::error::SinkError;
use super::messages::Frame;

/// Unique identifier for a subscribed client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Create a connected sink/stream pair with room for `buffer` frames
///
/// # Panics
///
/// Panics if `buffer` is zero.
pub fn channel(buffer: usize) -> (ClientSink, ClientStream) {
    let (tx, rx) = mpsc::channel(buffer);
    let id = ClientId::new();
    (ClientSink { id, tx }, ClientStream { id, rx })
}

/// Writable half of a client connection
#[derive(Debug, Clone)]
pub struct ClientSink {
    id: ClientId,
    tx: mpsc::Sender<Frame>,
}

impl ClientSink {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Write a frame, waiting at most `timeout` for buffer space
    pub async fn send(&self, frame: Frame, timeout: Duration) -> Result<(), SinkError> {
        match tokio::time::timeout(timeout, self.tx.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SinkError::Closed),
            Err(_) => Err(SinkError::TimedOut(timeout)),
        }
    }

    /// Write a frame only if there is room right now
    pub fn try_send(&self, frame: Frame) -> Result<(), SinkError> {
        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => SinkError::TimedOut(Duration::ZERO),
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Readable half of a client connection
#[derive(Debug)]
pub struct ClientStream {
    id: ClientId,
    rx: mpsc::Receiver<Frame>,
}

impl ClientStream {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Receive the next frame; `None` once the hub has closed the sink
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

impl Stream for ClientStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::messages::StreamEvent;

    fn frame() -> Frame {
        Frame::encode(&StreamEvent::connected("abc")).unwrap()
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let (sink, mut stream) = channel(4);
        assert_eq!(sink.id(), stream.id());

        sink.send(frame(), Duration::from_millis(50)).await.unwrap();
        let received = stream.recv().await.unwrap();
        assert_eq!(received, frame());
    }

    #[tokio::test]
    async fn test_send_to_dropped_stream_fails() {
        let (sink, stream) = channel(4);
        drop(stream);

        assert!(sink.is_closed());
        let result = sink.send(frame(), Duration::from_millis(50)).await;
        assert_eq!(result, Err(SinkError::Closed));
    }

    #[tokio::test]
    async fn test_stalled_client_times_out() {
        let (sink, _stream) = channel(1);
        let timeout = Duration::from_millis(20);

        sink.send(frame(), timeout).await.unwrap();
        let result = sink.send(frame(), timeout).await;
        assert_eq!(result, Err(SinkError::TimedOut(timeout)));
    }

    #[tokio::test]
    async fn test_dropping_sink_ends_stream() {
        let (sink, mut stream) = channel(4);
        sink.try_send(frame()).unwrap();
        drop(sink);

        assert!(stream.recv().await.is_some());
        assert!(stream.recv().await.is_none());
    }
}
