//! Handlers for the `/auth` resource (graph login, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ragstream_core::error::CoreError;
use ragstream_core::job::GraphCredentials;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`. Blank fields fall back to the
/// server's configured graph defaults.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub graph: GraphInfo,
}

/// The graph connection the session is bound to (never the password).
#[derive(Debug, Serialize)]
pub struct GraphInfo {
    pub uri: String,
    pub user: String,
}

impl LoginRequest {
    fn into_credentials(self, defaults: &GraphCredentials) -> GraphCredentials {
        let pick = |value: Option<String>, default: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        GraphCredentials {
            uri: pick(self.uri, &defaults.uri),
            user: pick(self.user, &defaults.user),
            // Passwords are used verbatim; only a missing one takes the default.
            password: self.password.unwrap_or_else(|| defaults.password.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Verify graph credentials and open a session. Returns an access token
/// bound to the session.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let credentials = input.into_credentials(&state.config.graph_defaults);

    if let Err(e) = state.graph.verify(&credentials).await {
        tracing::warn!(uri = %credentials.uri, user = %credentials.user, error = %e, "Graph login failed");
        return Err(AppError::Core(CoreError::Unauthorized(format!(
            "Connection failed: {e}"
        ))));
    }

    let session = state.sessions.create(credentials).await;
    let access_token = generate_access_token(session.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(
        session_id = %session.id,
        uri = %session.credentials.uri,
        user = %session.credentials.user,
        "Graph session opened",
    );

    Ok(Json(LoginResponse {
        access_token,
        expires_in: state.config.jwt.expires_in(),
        graph: GraphInfo {
            uri: session.credentials.uri,
            user: session.credentials.user,
        },
    }))
}

/// POST /api/v1/auth/logout
///
/// Drop the caller's graph session. Tokens naming it stop working.
pub async fn logout(State(state): State<AppState>, auth: AuthSession) -> AppResult<StatusCode> {
    state.sessions.remove(auth.session_id).await;
    tracing::info!(session_id = %auth.session_id, "Graph session closed");
    Ok(StatusCode::NO_CONTENT)
}
