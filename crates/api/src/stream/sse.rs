//! Server-sent-events transport for job streams.
//!
//! The HTTP response body is a [`ReceiverStream`] fed by a bounded channel;
//! the [`StreamDispatcher`] runs on its own task and writes into that channel
//! through [`SseConnection`]. When the client disconnects, axum drops the
//! body, the channel closes, and the next send reports
//! [`TransportError::Disconnected`].

use std::convert::Infallible;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::sse::{Event as SseEvent, Sse};
use ragstream_core::event::Event;
use ragstream_events::{CompletionSignal, EventReceiver};
use ragstream_worker::JobWorker;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use super::dispatcher::{ClientConnection, StreamDispatcher, TransportError};

/// Frames buffered between the dispatcher and the response body.
const SSE_BUFFER: usize = 64;

pub type SseBody = ReceiverStream<Result<SseEvent, Infallible>>;

pub struct SseConnection {
    tx: mpsc::Sender<Result<SseEvent, Infallible>>,
}

impl SseConnection {
    /// Create a connection and the body stream it feeds.
    pub fn channel() -> (Self, SseBody) {
        let (tx, rx) = mpsc::channel(SSE_BUFFER);
        (Self { tx }, ReceiverStream::new(rx))
    }
}

#[async_trait]
impl ClientConnection for SseConnection {
    async fn send(&mut self, event: &Event) -> Result<(), TransportError> {
        let frame = SseEvent::default().data(event.to_wire_json());
        self.tx
            .send(Ok(frame))
            .await
            .map_err(|_| TransportError::Disconnected)
    }
}

/// Start `worker` and return the SSE response that streams its events.
pub fn stream_job(
    job_id: Uuid,
    worker: JobWorker,
    events: EventReceiver,
    signal: CompletionSignal,
    poll_interval: Duration,
) -> Sse<SseBody> {
    let (connection, body) = SseConnection::channel();
    let dispatcher =
        StreamDispatcher::new(connection, events, signal).with_poll_interval(poll_interval);

    tokio::spawn(async move {
        let outcome = dispatcher.run(worker).await;
        tracing::info!(job_id = %job_id, ?outcome, "Job stream closed");
    });

    Sse::new(body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tokio_stream::StreamExt;

    use super::*;

    #[tokio::test]
    async fn each_event_becomes_one_frame() {
        let (mut connection, mut body) = SseConnection::channel();
        connection.send(&Event::log("<div class='log-item'>a</div>")).await.unwrap();
        connection.send(&Event::finished()).await.unwrap();
        drop(connection);

        let mut frames = 0;
        while let Some(frame) = body.next().await {
            assert!(frame.is_ok());
            frames += 1;
        }
        assert_eq!(frames, 2);
    }

    #[tokio::test]
    async fn dropped_body_is_a_disconnect() {
        let (mut connection, body) = SseConnection::channel();
        drop(body);
        assert_matches!(
            connection.send(&Event::answer("late")).await,
            Err(TransportError::Disconnected)
        );
    }
}
