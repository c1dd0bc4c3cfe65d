use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;

use super::run_blocking;
use crate::middleware::session::session_set_cookie;
use crate::middleware::CurrentSession;
use crate::state::AppState;
use crate::utils::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub file_count: usize,
}

pub async fn current_session(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<SessionResponse>, ApiError> {
    let files = state.files.clone();
    let session_id = session.id().to_string();
    let records = run_blocking(move || files.get_files(&session)).await?;

    Ok(Json(SessionResponse {
        session_id,
        file_count: records.len(),
    }))
}

/// Client-initiated termination: delete the session's files and expire the
/// cookie.
pub async fn terminate_session(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, ApiError> {
    let registry = state.registry.clone();
    let id = session.id();
    run_blocking(move || registry.terminate(&session)).await?;
    info!("session {} terminated by client", id);

    let expired = session_set_cookie(&state.settings.session.cookie_name, "", 0);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, expired)]).into_response())
}
