//! Static serving of stored uploads and segmentation results.

use axum::Router;
use tower_http::services::ServeDir;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Mount the artifact directories at the root level.
///
/// ```text
/// GET /uploads/{file}     original images
/// GET /segmented/{file}   segmented images
/// ```
pub fn router(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .nest_service("/segmented", ServeDir::new(&config.segmented_dir))
}
