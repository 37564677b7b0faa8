//! Handler for question submission with a live event stream.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::Sse;
use axum::Json;
use ragstream_core::job::JobRequest;
use ragstream_events::CompletionSignal;
use ragstream_worker::JobWorker;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthSession;
use crate::state::AppState;
use crate::stream::sse::{stream_job, SseBody};

/// POST /api/v1/ask
///
/// Validate the question, start a worker for it, and stream the job's
/// events as `text/event-stream`. Invalid input is rejected before any
/// worker starts.
pub async fn ask(
    State(state): State<AppState>,
    auth: AuthSession,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> AppResult<Sse<SseBody>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let job = request.into_job(auth.credentials)?;
    let job_id = job.id;

    tracing::info!(
        job_id = %job_id,
        session_id = %auth.session_id,
        question_chars = job.query.question.chars().count(),
        "Job accepted",
    );

    let (events, receiver) = ragstream_events::channel();
    let signal = CompletionSignal::new();
    let worker = JobWorker::new(Arc::clone(&state.engine), job, events, signal.clone());

    Ok(stream_job(
        job_id,
        worker,
        receiver,
        signal,
        state.config.stream_poll_interval(),
    ))
}
