use serde::{Deserialize, Serialize};

use super::enums::Urgency;

/// Label used when the model names no animal.
pub const DEFAULT_ANIMAL_TYPE: &str = "特寵";
/// Catalog/map query used when the model gives no keywords.
pub const DEFAULT_SEARCH_KEYWORDS: &str = "動物醫院";

/// Structured triage for one chat turn. Built fresh per turn, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub urgency: Urgency,
    pub advice: String,
    pub animal_type: String,
    pub search_keywords: String,
}

impl TriageResult {
    /// Result used when no model could be reached.
    ///
    /// Biased to HIGH so the emergency-capable facilities are shown.
    pub fn system_busy() -> Self {
        Self {
            urgency: Urgency::High,
            advice: "系統忙碌中，AI 暫時無法分析。若情況緊急，請直接參考下方 24 小時動物醫院列表並立即就醫。"
                .to_string(),
            animal_type: "動物".to_string(),
            search_keywords: "動物醫院 24H".to_string(),
        }
    }

    /// Result used when no API key is configured.
    pub fn not_configured() -> Self {
        Self {
            advice: "系統尚未設定 AI 服務金鑰，暫時無法分析症狀。請直接參考下方動物醫院列表。"
                .to_string(),
            ..Self::system_busy()
        }
    }

    /// Whitespace-separated keyword tokens.
    pub fn keyword_tokens(&self) -> impl Iterator<Item = &str> {
        self.search_keywords.split_whitespace()
    }
}
