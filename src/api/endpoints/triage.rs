//! `POST /api/triage` — run one chat turn.
//!
//! Request problems (empty or oversized text, bad coordinates, unknown
//! area or session) are rejected up front. Once the pipeline runs, the
//! response is always a complete report, degraded if need be.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::sessions::parse_session_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::AppConfig;
use crate::geo::GeoPoint;
use crate::models::find_area;
use crate::pipeline::TriageReport;
use crate::session::LocationChoice;

/// Request body limit, in characters.
pub const MAX_REQUEST_CHARS: usize = 2_000;

#[derive(Debug, Deserialize)]
pub struct TriageRequest {
    /// Omit to start a new session.
    pub session_id: Option<String>,
    pub symptoms: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Preset area name, used when no coordinates are given.
    pub area: Option<String>,
}

#[derive(Serialize)]
pub struct TriageResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub report: TriageReport<'static>,
}

pub async fn run(
    State(ctx): State<ApiContext>,
    Json(req): Json<TriageRequest>,
) -> Result<Json<TriageResponse>, ApiError> {
    if req.symptoms.trim().is_empty() {
        return Err(ApiError::BadRequest("Symptoms cannot be empty".into()));
    }
    if req.symptoms.chars().count() > MAX_REQUEST_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Symptoms too long (max {MAX_REQUEST_CHARS} chars)"
        )));
    }
    let location = resolve_location(&req, &ctx.config)?;
    let session_id = req.session_id.as_deref().map(parse_session_id).transpose()?;

    let mut turn = ctx.begin_turn(session_id)?;
    let id = turn.id();

    // The turn is checked back in on the blocking thread, so it completes
    // even if the client disconnects and this future is dropped.
    let pipeline = ctx.pipeline.clone();
    let symptoms = req.symptoms;
    let report = tokio::task::spawn_blocking(move || {
        let report = pipeline.run(turn.session_mut(), &symptoms, location);
        turn.finish();
        report
    })
    .await?;

    Ok(Json(TriageResponse {
        session_id: id,
        report,
    }))
}

/// Device coordinates win over an area name; with neither, the configured
/// default location is used.
fn resolve_location(req: &TriageRequest, config: &AppConfig) -> Result<LocationChoice, ApiError> {
    match (req.lat, req.lon) {
        (Some(lat), Some(lon)) => GeoPoint::new(lat, lon)
            .map(|point| LocationChoice::Device { point })
            .map_err(|e| ApiError::BadRequest(e.to_string())),
        (Some(_), None) | (None, Some(_)) => Err(ApiError::BadRequest(
            "lat and lon must be given together".into(),
        )),
        (None, None) => match req.area.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(name) => find_area(name)
                .map(|area| LocationChoice::Area {
                    name: area.name.to_string(),
                    point: area.point(),
                })
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown area: {name}"))),
            None => Ok(LocationChoice::Default {
                point: config.default_location,
            }),
        },
    }
}
