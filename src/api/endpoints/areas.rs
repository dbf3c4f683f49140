//! Preset areas for callers without device geolocation.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::geo::GeoPoint;
use crate::models::{PresetArea, PRESET_AREAS};

#[derive(Serialize)]
pub struct AreasResponse {
    pub areas: &'static [PresetArea],
    /// Used when a triage request carries no location at all.
    pub default_location: GeoPoint,
}

/// `GET /api/areas` — manual location picker entries.
pub async fn list(State(ctx): State<ApiContext>) -> Json<AreasResponse> {
    Json(AreasResponse {
        areas: PRESET_AREAS,
        default_location: ctx.config.default_location,
    })
}
