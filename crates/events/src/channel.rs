//! Single-producer, single-consumer event channel backed by
//! `tokio::sync::mpsc::unbounded_channel`.
//!
//! The sender half is cheap to clone so the worker and the output capture it
//! owns can both push; they still form one logical producer because the
//! capture only runs inside the worker's engine call.

use std::time::Duration;

use ragstream_core::event::Event;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Result of a poll on the [`EventReceiver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    /// The oldest unconsumed event.
    Ready(Event),
    /// Nothing arrived within the wait budget.
    Empty,
    /// Every sender is gone and the queue is drained.
    Disconnected,
}

/// Producer half. `push` never blocks.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

/// Consumer half, owned by the stream dispatcher.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl EventSender {
    /// Append an event.
    ///
    /// If the receiver has been dropped (the client went away) the event is
    /// discarded; the producer is expected to run to completion regardless.
    pub fn push(&self, event: Event) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            tracing::trace!(kind = ?event.kind(), "Event dropped, receiver closed");
        }
    }

    /// Whether the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventReceiver {
    /// Wait at most `timeout` for the next event.
    pub async fn poll_with_timeout(&mut self, timeout: Duration) -> Polled {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => Polled::Ready(event),
            Ok(None) => Polled::Disconnected,
            Err(_elapsed) => Polled::Empty,
        }
    }

    /// Take the next event without waiting.
    pub fn try_pop(&mut self) -> Polled {
        match self.rx.try_recv() {
            Ok(event) => Polled::Ready(event),
            Err(TryRecvError::Empty) => Polled::Empty,
            Err(TryRecvError::Disconnected) => Polled::Disconnected,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
