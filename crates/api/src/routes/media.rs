//! Route definitions for voice and image uploads.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::{image, voice};
use crate::state::AppState;

/// Upper bound for a single upload request body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// ```text
/// POST /voice   -> recognize (multipart field `audio`)
/// ```
pub fn voice_router() -> Router<AppState> {
    Router::new()
        .route("/voice", post(voice::recognize))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// ```text
/// POST /image   -> upload (multipart field `image`)
/// ```
pub fn image_router() -> Router<AppState> {
    Router::new()
        .route("/image", post(image::upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
