//! Model availability diagnostics.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::gateway::ModelAvailability;

/// `GET /api/models` — generation-capable models visible to the API key,
/// and whether the recommended one is among them.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<ModelAvailability>, ApiError> {
    let pipeline = ctx.pipeline.clone();
    let availability = tokio::task::spawn_blocking(move || pipeline.available_models()).await??;
    Ok(Json(availability))
}
