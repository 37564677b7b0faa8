//! One-shot completion flag shared between a job worker and its dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    set: AtomicBool,
    notify: Notify,
}

/// Set exactly once by the worker after it has pushed its `finished` event.
///
/// Kept separate from the event itself so the dispatcher can tell "the
/// worker is done and the channel is drained" apart from "nothing arrived
/// yet".
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    inner: Arc<Inner>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `false` if it was already set.
    pub fn set(&self) -> bool {
        let first = !self.inner.set.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub fn is_set(&self) -> bool {
        self.inner.set.load(Ordering::Acquire)
    }

    /// Resolve once the flag is set (immediately if it already is).
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
