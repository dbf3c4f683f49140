//! Turns the model's marker-formatted reply into a `TriageResult`.
//!
//! Each field is located independently, so a reply missing one marker
//! still yields the others. Nothing here can fail: absent or empty fields
//! fall back to their defaults.

use super::prompt::{ANIMAL_TYPE_MARKER, RESPONSE_MARKER, SEARCH_KEYWORDS_MARKER, URGENCY_MARKER};
use crate::models::{TriageResult, Urgency, DEFAULT_ANIMAL_TYPE, DEFAULT_SEARCH_KEYWORDS};

/// Parse a raw model reply.
pub fn parse_triage_response(raw: &str) -> TriageResult {
    TriageResult {
        urgency: parse_urgency(raw),
        advice: parse_advice(raw),
        animal_type: field_after(raw, ANIMAL_TYPE_MARKER, &[SEARCH_KEYWORDS_MARKER])
            .unwrap_or_else(|| DEFAULT_ANIMAL_TYPE.to_string()),
        search_keywords: field_after(raw, SEARCH_KEYWORDS_MARKER, &[])
            .unwrap_or_else(|| DEFAULT_SEARCH_KEYWORDS.to_string()),
    }
}

/// Priority scan: HIGH wins over MEDIUM if both literals appear.
fn parse_urgency(raw: &str) -> Urgency {
    let declares = |level: Urgency| raw.contains(&format!("{URGENCY_MARKER} {level}"));
    if declares(Urgency::High) {
        Urgency::High
    } else if declares(Urgency::Medium) {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Advice runs from `RESPONSE:` to the next marker. Without the marker the
/// whole reply is the advice.
fn parse_advice(raw: &str) -> String {
    match raw.find(RESPONSE_MARKER) {
        Some(_) => field_after(raw, RESPONSE_MARKER, &[ANIMAL_TYPE_MARKER, SEARCH_KEYWORDS_MARKER])
            .unwrap_or_default(),
        None => raw.trim().to_string(),
    }
}

/// Text after the first `marker`, up to the nearest of the `terminators`
/// that follows it (or end of text), trimmed of whitespace and markdown
/// bold asterisks. `None` when the marker is absent or the value is empty.
fn field_after(raw: &str, marker: &str, terminators: &[&str]) -> Option<String> {
    let start = raw.find(marker)? + marker.len();
    let rest = &raw[start..];
    let end = terminators
        .iter()
        .filter_map(|t| rest.find(t))
        .min()
        .unwrap_or(rest.len());
    let value = rest[..end].trim_matches(|c: char| c.is_whitespace() || c == '*');
    (!value.is_empty()).then(|| value.to_string())
}
