//! The question-answering engine seam.

use std::sync::Arc;

use async_trait::async_trait;
use ragstream_core::job::Query;

use crate::console::Console;

/// Errors produced while answering a query.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine ran and reported a failure of its own (e.g. the graph
    /// database was unreachable).
    #[error("{0}")]
    Failed(String),

    #[error("Failed to start engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Engine timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Engine exited with code {code}: {stderr}")]
    Exited { code: i32, stderr: String },

    /// The engine finished without following the output protocol.
    #[error("Engine protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that answers questions and reports progress on a [`Console`].
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// The console this engine prints progress to, if it has one.
    fn console(&self) -> Option<Arc<Console>>;

    /// Run the query to completion and return the answer text.
    async fn answer(&self, query: &Query) -> Result<String, EngineError>;
}
