//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::catalog::CatalogStatus;
use crate::pipeline::MatchOptions;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub api_key_configured: bool,
    pub model_candidates: Vec<String>,
    pub catalog_size: usize,
    pub catalog: CatalogStatus,
    pub active_sessions: usize,
    pub match_options: MatchOptions,
}

/// `GET /api/health` — connection and configuration check.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let catalog = ctx.pipeline.catalog();
    let active_sessions = ctx.lock_sessions()?.len();

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        api_key_configured: ctx.config.api_key.is_some(),
        model_candidates: ctx.config.model_candidates.clone(),
        catalog_size: catalog.len(),
        catalog: catalog.status().clone(),
        active_sessions,
        match_options: *ctx.pipeline.options(),
    }))
}
