pub mod artifacts;
pub mod ask;
pub mod auth;
pub mod health;
pub mod media;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login      open a graph session (public)
/// /auth/logout     close the session (requires auth)
///
/// /ask             submit a question, stream events (requires auth)
///
/// /voice           speech to text (requires auth, no request timeout)
/// /image           segment and describe an image (requires auth)
/// ```
///
/// `timeout` wraps every route except `/voice`, whose audio is streamed to
/// the recognizer in real time and so takes as long as the recording.
pub fn api_routes(timeout: TimeoutLayer) -> Router<AppState> {
    Router::new()
        // Graph session login and logout.
        .nest("/auth", auth::router())
        // Question submission with a server-sent event stream.
        .merge(ask::router())
        // Image uploads.
        .merge(media::image_router())
        .layer(timeout)
        // Voice uploads (added after the timeout layer, so not wrapped).
        .merge(media::voice_router())
}
