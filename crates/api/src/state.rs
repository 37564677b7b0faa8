use std::sync::Arc;

use ragstream_engine::{GraphProbe, QueryEngine};
use ragstream_media::{ImageDescriber, ImageSegmenter, SpeechRecognizer};

use crate::auth::session::SessionStore;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every collaborator sits behind an `Arc<dyn ...>` so
/// tests can substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Verified graph sessions keyed by the id in the access token.
    pub sessions: Arc<SessionStore>,
    /// Checks graph credentials at login.
    pub graph: Arc<dyn GraphProbe>,
    /// Question-answering engine shared by all jobs.
    pub engine: Arc<dyn QueryEngine>,
    pub speech: Arc<dyn SpeechRecognizer>,
    pub segmenter: Arc<dyn ImageSegmenter>,
    pub describer: Arc<dyn ImageDescriber>,
}
