//! Handler for medical image upload: segmentation, then description.

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::Json;
use ragstream_core::error::CoreError;
use ragstream_media::SegmentationParams;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::upload::{allowed_extension, take_file};
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// Returned as the description when the vision service fails.
pub const DESCRIPTION_UNAVAILABLE: &str =
    "Image description could not be generated, but segmentation completed.";

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub success: bool,
    /// URL path of the stored upload (under `/uploads`).
    pub original_image: String,
    /// URL path of the segmented image (under `/segmented`).
    pub segmented_image: String,
    pub segmentation_info: serde_json::Value,
    pub description: String,
}

/// POST /api/v1/image
///
/// Multipart field `image`. Stores the upload, segments it, describes the
/// segmented result and returns links to both images.
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthSession,
    mut multipart: Multipart,
) -> AppResult<Json<ImageResponse>> {
    let upload = take_file(&mut multipart, "image")
        .await?
        .ok_or_else(|| AppError::BadRequest("No image file uploaded.".into()))?;
    if upload.file_name.is_empty() {
        return Err(AppError::BadRequest("No image file selected.".into()));
    }
    let ext = allowed_extension(&upload.file_name, ALLOWED_IMAGE_EXTENSIONS).ok_or_else(|| {
        AppError::BadRequest(
            "Unsupported file type. Please upload PNG, JPG, JPEG, GIF, BMP, or TIFF files.".into(),
        )
    })?;

    let stem = Uuid::new_v4().simple().to_string();
    let original_name = format!("{stem}.{ext}");
    store(&state.config.upload_dir, &original_name, &upload.bytes).await?;
    tracing::info!(
        session_id = %auth.session_id,
        file_name = %upload.file_name,
        stored_as = %original_name,
        "Image uploaded",
    );

    let segmentation = state
        .segmenter
        .segment(&upload.bytes, &upload.file_name, &SegmentationParams::default())
        .await
        .map_err(|e| AppError::Core(CoreError::Upstream(format!("Image segmentation failed: {e}"))))?;

    let segmented_name = format!("{stem}_segmented.{ext}");
    store(&state.config.segmented_dir, &segmented_name, &segmentation.image).await?;

    let description = match state.describer.describe(&segmentation.image).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(stored_as = %segmented_name, error = %e, "Image description failed");
            DESCRIPTION_UNAVAILABLE.to_string()
        }
    };

    Ok(Json(ImageResponse {
        success: true,
        original_image: format!("/uploads/{original_name}"),
        segmented_image: format!("/segmented/{segmented_name}"),
        segmentation_info: segmentation.info,
        description,
    }))
}

async fn store(dir: &Path, name: &str, bytes: &[u8]) -> AppResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create {}: {e}", dir.display())))?;
    tokio::fs::write(dir.join(name), bytes)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store {name}: {e}")))
}
