//! One triage turn: sanitize → model gateway → parser → matcher.
//!
//! Every failure is absorbed here. The caller always receives a complete
//! `TriageReport` it can render.

use serde::Serialize;

use super::gateway::{GatewayError, GatewayOutcome, ModelAvailability, ModelGateway};
use super::maps::{navigation_url, search_url};
use super::matcher::{match_facilities, MatchOptions, MatchReason, MatchStatus};
use super::parser::parse_triage_response;
use super::prompt::build_triage_prompt;
use super::sanitize::sanitize_symptoms;
use crate::catalog::FacilityCatalog;
use crate::models::{FacilityRecord, MessageRole, TriageResult, Urgency};
use crate::session::{LocationChoice, TriageSession};

const CATALOG_EMPTY_NOTICE: &str = "目前無法取得動物醫院資料，請改用下方地圖搜尋附近醫院。";
const NO_MATCHES_NOTICE: &str = "附近沒有符合條件的動物醫院，請改用下方地圖搜尋。";
const NO_INPUT_ADVICE: &str = "請描述毛孩的症狀，例如出現多久、精神與食慾狀況。";

/// Where the triage result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriageSource {
    Model { model: String },
    SystemBusy,
    NotConfigured,
    NoInput,
}

impl TriageSource {
    /// True when the result is a built-in fallback rather than model output.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Model { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedFacility<'a> {
    pub facility: &'a FacilityRecord,
    pub distance_km: f64,
    pub reason: MatchReason,
    pub navigation_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageReport<'a> {
    pub result: TriageResult,
    pub source: TriageSource,
    pub degraded: bool,
    pub location: LocationChoice,
    pub match_status: MatchStatus,
    pub facilities: Vec<RankedFacility<'a>>,
    /// Fallback map search for the result's keywords.
    pub map_search_url: String,
    /// User-facing explanation when `facilities` is empty.
    pub notice: Option<&'static str>,
}

pub struct TriagePipeline {
    gateway: ModelGateway,
    catalog: &'static FacilityCatalog,
    options: MatchOptions,
}

impl TriagePipeline {
    pub fn new(
        gateway: ModelGateway,
        catalog: &'static FacilityCatalog,
        options: MatchOptions,
    ) -> Self {
        Self {
            gateway,
            catalog,
            options,
        }
    }

    pub fn catalog(&self) -> &'static FacilityCatalog {
        self.catalog
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Run one chat turn for `session`.
    ///
    /// Blocks for the whole model fallover chain, retries included.
    pub fn run(
        &self,
        session: &mut TriageSession,
        symptoms: &str,
        location: LocationChoice,
    ) -> TriageReport<'static> {
        let sanitized = sanitize_symptoms(symptoms);
        if sanitized.was_modified {
            tracing::debug!(session = %session.id, "Symptom text was sanitized");
        }

        let (result, source) = if sanitized.text.is_empty() {
            (no_input_result(), TriageSource::NoInput)
        } else {
            session.push_message(MessageRole::User, symptoms.trim());
            let prompt = build_triage_prompt(&sanitized.text);
            triage_from_outcome(self.gateway.query(&mut session.sticky_model, &prompt))
        };
        session.push_message(MessageRole::Assistant, result.advice.clone());
        session.location = Some(location.clone());

        let origin = location.point();
        let catalog: &'static FacilityCatalog = self.catalog;
        let report = match_facilities(catalog.records(), &result, &origin, &self.options);
        let facilities: Vec<RankedFacility<'static>> = report
            .matches
            .into_iter()
            .map(|m| RankedFacility {
                facility: m.facility,
                distance_km: m.distance_km,
                reason: m.reason,
                navigation_url: m.facility.position.as_ref().map(navigation_url),
            })
            .collect();

        let notice = match report.status {
            MatchStatus::CatalogEmpty => Some(CATALOG_EMPTY_NOTICE),
            MatchStatus::NoMatches => Some(NO_MATCHES_NOTICE),
            MatchStatus::Found => None,
        };

        tracing::info!(
            session = %session.id,
            urgency = %result.urgency,
            source = ?source,
            facilities = facilities.len(),
            "Triage turn complete"
        );

        TriageReport {
            map_search_url: search_url(&result.search_keywords),
            degraded: source.is_degraded(),
            result,
            source,
            location,
            match_status: report.status,
            facilities,
            notice,
        }
    }

    /// Daily tip; never fails.
    pub fn tip(&self) -> String {
        self.gateway.tip()
    }

    pub fn available_models(&self) -> Result<ModelAvailability, GatewayError> {
        self.gateway.available_models()
    }
}

fn triage_from_outcome(outcome: GatewayOutcome) -> (TriageResult, TriageSource) {
    match outcome {
        GatewayOutcome::Answered { model, text } => {
            (parse_triage_response(&text), TriageSource::Model { model })
        }
        GatewayOutcome::Exhausted { .. } => (TriageResult::system_busy(), TriageSource::SystemBusy),
        GatewayOutcome::Unconfigured => {
            (TriageResult::not_configured(), TriageSource::NotConfigured)
        }
    }
}

fn no_input_result() -> TriageResult {
    TriageResult {
        urgency: Urgency::Low,
        advice: NO_INPUT_ADVICE.to_string(),
        animal_type: crate::models::DEFAULT_ANIMAL_TYPE.to_string(),
        search_keywords: crate::models::DEFAULT_SEARCH_KEYWORDS.to_string(),
    }
}
