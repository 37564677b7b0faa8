//! Handler for voice questions: speech to text.

use axum::extract::{Multipart, State};
use axum::Json;
use ragstream_core::error::CoreError;
use ragstream_media::MediaError;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::upload::take_file;
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub success: bool,
    pub text: String,
}

/// POST /api/v1/voice
///
/// Multipart field `audio` (WAV). Returns the recognized text.
pub async fn recognize(
    State(state): State<AppState>,
    auth: AuthSession,
    mut multipart: Multipart,
) -> AppResult<Json<VoiceResponse>> {
    let upload = take_file(&mut multipart, "audio")
        .await?
        .ok_or_else(|| AppError::BadRequest("No audio file uploaded.".into()))?;
    if upload.file_name.is_empty() {
        return Err(AppError::BadRequest("No audio file selected.".into()));
    }

    tracing::info!(
        session_id = %auth.session_id,
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        "Recognizing voice upload",
    );

    match state.speech.recognize(&upload.bytes).await {
        Ok(text) => Ok(Json(VoiceResponse {
            success: true,
            text,
        })),
        Err(MediaError::NothingRecognized) => Err(AppError::BadRequest(
            "Speech recognition failed. Please retry or check the audio file format.".into(),
        )),
        Err(MediaError::UnsupportedAudio(reason)) => Err(AppError::Core(CoreError::Validation(
            format!("Unsupported audio file: {reason}"),
        ))),
        Err(e) => Err(AppError::Core(CoreError::Upstream(format!(
            "Speech recognition error: {e}"
        )))),
    }
}
