use axum::routing::post;
use axum::Router;

use crate::handlers::ask;
use crate::state::AppState;

/// ```text
/// POST /ask   -> ask (text/event-stream)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/ask", post(ask::ask))
}
