//! The engine's shared progress output binding.
//!
//! A [`Console`] always has exactly one current target. By default that is
//! a [`LogSink`] forwarding to `tracing`. [`Console::redirect`] swaps the
//! target for the lifetime of the returned [`RedirectGuard`]; dropping the
//! guard (normally, on error, or while unwinding) restores the previous
//! target. Redirections are exclusive: a second caller waits until the
//! first guard is dropped.

use std::sync::{Arc, Mutex, PoisonError};

use ragstream_core::progress::{Block, ConsoleSink, Progress};
use tokio::sync::OwnedMutexGuard;

/// Default console target: progress goes to the service log.
#[derive(Debug, Default)]
pub struct LogSink;

impl ConsoleSink for LogSink {
    fn write_text(&self, chunk: &str) {
        for line in chunk.lines().filter(|l| !l.trim().is_empty()) {
            tracing::info!(target: "ragstream_engine::console", "{line}");
        }
    }

    fn write_block(&self, block: &Block) {
        tracing::info!(target: "ragstream_engine::console", ?block, "Progress block");
    }
}

pub struct Console {
    default: Arc<dyn ConsoleSink>,
    redirected: Mutex<Option<Arc<dyn ConsoleSink>>>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::with_default_target(Arc::new(LogSink))
    }
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_target(target: Arc<dyn ConsoleSink>) -> Self {
        Self {
            default: target,
            redirected: Mutex::new(None),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Bind `target` until the returned guard is dropped.
    ///
    /// Waits while another redirection is active.
    pub async fn redirect(self: &Arc<Self>, target: Arc<dyn ConsoleSink>) -> RedirectGuard {
        let permit = Arc::clone(&self.gate).lock_owned().await;
        let previous = self.slot().replace(target);
        RedirectGuard {
            console: Arc::clone(self),
            previous,
            _permit: permit,
        }
    }

    /// Whether a redirection is currently in effect.
    pub fn is_redirected(&self) -> bool {
        self.slot().is_some()
    }

    pub fn print(&self, progress: &Progress) {
        self.current().print(progress);
    }

    pub fn write_text(&self, chunk: &str) {
        self.current().write_text(chunk);
    }

    pub fn write_block(&self, block: &Block) {
        self.current().write_block(block);
    }

    pub fn flush(&self) {
        self.current().flush();
    }

    fn current(&self) -> Arc<dyn ConsoleSink> {
        self.slot()
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.default))
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn ConsoleSink>>> {
        self.redirected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("redirected", &self.is_redirected())
            .finish()
    }
}

/// Restores the console's previous target when dropped.
#[must_use = "the redirection ends as soon as the guard is dropped"]
pub struct RedirectGuard {
    console: Arc<Console>,
    previous: Option<Arc<dyn ConsoleSink>>,
    _permit: OwnedMutexGuard<()>,
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        *self.console.slot() = self.previous.take();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
