//! Daily pet-care tip.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct TipResponse {
    pub tip: String,
}

/// `GET /api/tip` — one short tip; falls back to a fixed one offline.
pub async fn daily(State(ctx): State<ApiContext>) -> Result<Json<TipResponse>, ApiError> {
    let pipeline = ctx.pipeline.clone();
    let tip = tokio::task::spawn_blocking(move || pipeline.tip()).await?;
    Ok(Json(TipResponse { tip }))
}
