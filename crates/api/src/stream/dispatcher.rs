//! Request-side loop that forwards a job's events to its client.
//!
//! State machine:
//!
//! ```text
//! Running --(poll, signal set)--> Draining
//! Running|Draining --(finished forwarded)--> Closed
//! Draining --(poll empty)--> Closed
//! any --(channel disconnected | send failed)--> Closed
//! ```

use std::time::Duration;

use async_trait::async_trait;
use ragstream_core::event::Event;
use ragstream_events::{CompletionSignal, EventReceiver, Polled};
use ragstream_worker::JobWorker;

/// Default bounded wait per poll before the completion signal is re-checked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Running,
    Draining,
    Closed,
}

/// Why the dispatcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The `finished` event was forwarded.
    Finished,
    /// The worker signalled completion and the channel stayed empty.
    Drained,
    /// Every producer handle was dropped before `finished` arrived.
    ProducerGone,
    /// Writing to the client failed.
    ClientGone,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("client disconnected")]
    Disconnected,
}

/// One persistent connection to the client that submitted the job.
#[async_trait]
pub trait ClientConnection: Send {
    /// Write one event as its own message.
    async fn send(&mut self, event: &Event) -> Result<(), TransportError>;
}

pub struct StreamDispatcher<C> {
    connection: C,
    events: EventReceiver,
    signal: CompletionSignal,
    poll_interval: Duration,
    state: DispatchState,
}

impl<C: ClientConnection> StreamDispatcher<C> {
    pub fn new(connection: C, events: EventReceiver, signal: CompletionSignal) -> Self {
        Self {
            connection,
            events,
            signal,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: DispatchState::Running,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Start `worker` on its own task and forward its events until the
    /// stream closes. The worker is not cancelled if the client goes away.
    pub async fn run(mut self, worker: JobWorker) -> DispatchOutcome {
        let _worker = worker.spawn();
        self.drain().await
    }

    /// Forward events until a terminal condition.
    pub async fn drain(&mut self) -> DispatchOutcome {
        loop {
            match self.events.poll_with_timeout(self.poll_interval).await {
                Polled::Ready(event) => {
                    let finished = event.is_finished();
                    if let Err(e) = self.connection.send(&event).await {
                        tracing::debug!(error = %e, "Stopping stream, client write failed");
                        return self.close(DispatchOutcome::ClientGone);
                    }
                    if finished {
                        return self.close(DispatchOutcome::Finished);
                    }
                }
                Polled::Empty if self.state == DispatchState::Draining => {
                    tracing::warn!("Worker completed without a finished event reaching the stream");
                    return self.close(DispatchOutcome::Drained);
                }
                Polled::Empty => {}
                Polled::Disconnected => return self.close(DispatchOutcome::ProducerGone),
            }

            if self.state == DispatchState::Running && self.signal.is_set() {
                self.state = DispatchState::Draining;
            }
        }
    }

    fn close(&mut self, outcome: DispatchOutcome) -> DispatchOutcome {
        self.state = DispatchState::Closed;
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
