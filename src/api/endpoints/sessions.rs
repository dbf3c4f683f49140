//! Session endpoints.
//!
//! - `POST /api/sessions` — start a session
//! - `GET /api/sessions/:id` — transcript and sticky model snapshot

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::session::TriageSession;

/// `POST /api/sessions`
pub async fn create(
    State(ctx): State<ApiContext>,
) -> Result<(StatusCode, Json<TriageSession>), ApiError> {
    let session = ctx.lock_sessions()?.create();
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /api/sessions/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<TriageSession>, ApiError> {
    let id = parse_session_id(&id)?;
    let session = ctx.lock_sessions()?.snapshot(id)?;
    Ok(Json(session))
}

pub(crate) fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid session ID: {raw}")))
}
