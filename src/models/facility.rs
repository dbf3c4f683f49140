use serde::{Deserialize, Serialize};

use crate::geo::{GeoError, GeoPoint};

/// One row of the facility catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub name: String,
    pub rating: String,
    pub status: String,
    /// `None` when the source row's coordinates did not parse.
    pub position: Option<GeoPoint>,
    pub tags: Vec<String>,
}

impl FacilityRecord {
    /// Distance from `origin` to this facility.
    pub fn distance_from(&self, origin: &GeoPoint) -> Result<f64, GeoError> {
        self.position
            .map(|p| origin.distance_to(&p))
            .ok_or_else(|| GeoError::MissingPosition(self.name.clone()))
    }

    /// Tags joined into one string for substring matching.
    pub fn tag_text(&self) -> String {
        self.tags.join(",")
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Split a comma-delimited tag cell into trimmed, non-empty tags.
///
/// Accepts the full-width comma as well, since hand-edited sheets mix them.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', '，'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
