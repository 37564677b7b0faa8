//! JWT-based session extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ragstream_core::error::CoreError;
use ragstream_core::job::GraphCredentials;
use uuid::Uuid;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Graph session resolved from a JWT Bearer token in the `Authorization`
/// header.
///
/// Rejects with 401 when the header is missing or malformed, the token is
/// invalid or expired, or the session it names no longer exists.
///
/// ```ignore
/// async fn my_handler(auth: AuthSession) -> AppResult<Json<()>> {
///     tracing::info!(session_id = %auth.session_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: Uuid,
    pub credentials: GraphCredentials,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let invalid = || AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()));
        let claims = validate_token(token, &state.config.jwt).map_err(|_| invalid())?;
        let session_id: Uuid = claims.sub.parse().map_err(|_| invalid())?;

        let session = state.sessions.get(session_id).await.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Not connected to the graph database. Please log in.".into(),
            ))
        })?;

        Ok(AuthSession {
            session_id,
            credentials: session.credentials,
        })
    }
}
