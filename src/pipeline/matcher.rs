//! Facility matching: filter the catalog by species/keyword fit or
//! emergency capacity, then rank by distance from the caller.

use serde::Serialize;

use crate::config::AppConfig;
use crate::geo::GeoPoint;
use crate::models::{FacilityRecord, TagMatching, TriageResult, Urgency};

/// Tags that mark a facility as able to take emergencies.
pub const EMERGENCY_TAGS: [&str; 2] = ["24H", "急診"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchOptions {
    /// Exclude facilities farther than this. `None` = no limit.
    pub radius_km: Option<f64>,
    /// Return at most this many. `None` = no limit.
    pub cap: Option<usize>,
    pub tag_matching: TagMatching,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            radius_km: None,
            cap: Some(crate::config::DEFAULT_MATCH_CAP),
            tag_matching: TagMatching::Lenient,
        }
    }
}

impl MatchOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            radius_km: config.radius_km,
            cap: config.match_cap,
            tag_matching: config.tag_matching,
        }
    }
}

/// Why a facility qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    /// Tags fit the animal type or a search keyword.
    Specialty,
    /// HIGH urgency and the facility takes emergencies.
    Emergency,
}

/// A catalog record paired with its distance for this query.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityMatch<'a> {
    pub facility: &'a FacilityRecord,
    pub distance_km: f64,
    pub reason: MatchReason,
}

/// Lets the presentation layer word "no data" differently from
/// "nothing suitable nearby".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    CatalogEmpty,
    NoMatches,
    Found,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport<'a> {
    pub status: MatchStatus,
    pub matches: Vec<FacilityMatch<'a>>,
}

/// Rank catalog facilities for a triage result.
///
/// Qualifying is an OR: species/keyword fit, or HIGH urgency plus an
/// emergency tag. Sorting is stable, so equal distances keep catalog order.
pub fn match_facilities<'a>(
    catalog: &'a [FacilityRecord],
    triage: &TriageResult,
    origin: &GeoPoint,
    options: &MatchOptions,
) -> MatchReport<'a> {
    if catalog.is_empty() {
        return MatchReport {
            status: MatchStatus::CatalogEmpty,
            matches: Vec::new(),
        };
    }

    let mut matches: Vec<FacilityMatch<'a>> = catalog
        .iter()
        .filter_map(|facility| {
            let reason = qualify(facility, triage, options.tag_matching)?;
            let distance_km = match facility.distance_from(origin) {
                Ok(d) => d,
                Err(e) => {
                    tracing::debug!(facility = %facility.name, error = %e, "Excluding facility");
                    return None;
                }
            };
            if options.radius_km.is_some_and(|r| distance_km > r) {
                return None;
            }
            Some(FacilityMatch {
                facility,
                distance_km,
                reason,
            })
        })
        .collect();

    matches.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    if let Some(cap) = options.cap {
        matches.truncate(cap);
    }

    let status = if matches.is_empty() {
        MatchStatus::NoMatches
    } else {
        MatchStatus::Found
    };
    tracing::debug!(
        catalog = catalog.len(),
        matched = matches.len(),
        urgency = %triage.urgency,
        animal = %triage.animal_type,
        "Facility match complete"
    );

    MatchReport { status, matches }
}

fn qualify(facility: &FacilityRecord, triage: &TriageResult, mode: TagMatching) -> Option<MatchReason> {
    let tag_text = facility.tag_text();
    let fits = |term: &str| -> bool {
        if term.is_empty() {
            return false;
        }
        match mode {
            TagMatching::Lenient => tag_text.contains(term),
            TagMatching::Strict => facility.has_tag(term),
        }
    };

    let animal = triage.animal_type.trim();
    if fits(animal) || triage.keyword_tokens().any(|k| fits(k)) {
        return Some(MatchReason::Specialty);
    }
    if triage.urgency == Urgency::High && EMERGENCY_TAGS.iter().any(|&t| fits(t)) {
        return Some(MatchReason::Emergency);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_KM;

    const ORIGIN: GeoPoint = GeoPoint { lat: 25.0478, lon: 121.5170 };

    /// A point `km` due north of ORIGIN.
    fn north(km: f64) -> GeoPoint {
        GeoPoint {
            lat: ORIGIN.lat + (km / EARTH_RADIUS_KM).to_degrees(),
            lon: ORIGIN.lon,
        }
    }

    fn facility(name: &str, km: f64, tags: &[&str]) -> FacilityRecord {
        FacilityRecord {
            name: name.into(),
            rating: "4.5".into(),
            status: "營業中".into(),
            position: Some(north(km)),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn triage(urgency: Urgency, animal: &str, keywords: &str) -> TriageResult {
        TriageResult {
            urgency,
            advice: String::new(),
            animal_type: animal.into(),
            search_keywords: keywords.into(),
        }
    }

    fn names<'a>(report: &MatchReport<'a>) -> Vec<&'a str> {
        report.matches.iter().map(|m| m.facility.name.as_str()).collect()
    }

    #[test]
    fn empty_catalog_reports_catalog_empty() {
        for urgency in [Urgency::High, Urgency::Medium, Urgency::Low] {
            let report = match_facilities(
                &[],
                &triage(urgency, "狗", "狗"),
                &ORIGIN,
                &MatchOptions::default(),
            );
            assert!(report.matches.is_empty());
            assert_eq!(report.status, MatchStatus::CatalogEmpty);
        }
    }

    #[test]
    fn no_fit_reports_no_matches() {
        let catalog = vec![facility("Bird Clinic", 1.0, &["鳥"])];
        let report = match_facilities(
            &catalog,
            &triage(Urgency::Low, "狗", "狗 動物醫院"),
            &ORIGIN,
            &MatchOptions::default(),
        );
        assert_eq!(report.status, MatchStatus::NoMatches);
    }

    #[test]
    fn high_urgency_includes_24h_without_species_fit() {
        let catalog = vec![facility("Night ER", 3.0, &["24H"])];
        let report = match_facilities(
            &catalog,
            &triage(Urgency::High, "蜥蜴", "爬蟲"),
            &ORIGIN,
            &MatchOptions::default(),
        );
        assert_eq!(names(&report), vec!["Night ER"]);
        assert_eq!(report.matches[0].reason, MatchReason::Emergency);
    }

    #[test]
    fn emergency_tag_ignored_below_high() {
        let catalog = vec![facility("Night ER", 3.0, &["24H", "急診"])];
        for urgency in [Urgency::Medium, Urgency::Low] {
            let report = match_facilities(
                &catalog,
                &triage(urgency, "蜥蜴", "爬蟲"),
                &ORIGIN,
                &MatchOptions::default(),
            );
            assert!(report.matches.is_empty());
        }
    }

    #[test]
    fn keyword_token_matches_tag_substring() {
        let catalog = vec![facility("Exotic", 2.0, &["兔子", "鼠"])];
        let report = match_facilities(
            &catalog,
            &triage(Urgency::Low, "特寵", "兔 動物醫院"),
            &ORIGIN,
            &MatchOptions::default(),
        );
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].reason, MatchReason::Specialty);
    }

    #[test]
    fn strict_mode_requires_whole_tag() {
        let catalog = vec![facility("Exotic", 2.0, &["兔子"])];
        let options = MatchOptions {
            tag_matching: TagMatching::Strict,
            ..MatchOptions::default()
        };
        let report = match_facilities(&catalog, &triage(Urgency::Low, "兔", "兔"), &ORIGIN, &options);
        assert!(report.matches.is_empty());
        let report =
            match_facilities(&catalog, &triage(Urgency::Low, "兔子", ""), &ORIGIN, &options);
        assert_eq!(report.matches.len(), 1);
    }

    #[test]
    fn empty_animal_type_matches_nothing() {
        let catalog = vec![facility("Any", 1.0, &["狗"])];
        let report = match_facilities(
            &catalog,
            &triage(Urgency::Low, "", "   "),
            &ORIGIN,
            &MatchOptions::default(),
        );
        assert!(report.matches.is_empty());
    }

    #[test]
    fn radius_excludes_beyond_and_includes_within() {
        let catalog = vec![
            facility("Far", 10.5, &["狗"]),
            facility("Near", 9.5, &["狗"]),
        ];
        let options = MatchOptions {
            radius_km: Some(10.0),
            ..MatchOptions::default()
        };
        let report = match_facilities(&catalog, &triage(Urgency::Low, "狗", ""), &ORIGIN, &options);
        assert_eq!(names(&report), vec!["Near"]);
        assert!((report.matches[0].distance_km - 9.5).abs() < 1e-6);
    }

    #[test]
    fn cap_keeps_nearest_with_stable_ties() {
        let catalog = vec![
            facility("F0", 8.0, &["貓"]),
            facility("F1", 2.0, &["貓"]),
            facility("F2", 5.0, &["貓"]),
            facility("F3", 2.0, &["貓"]),
            facility("F4", 1.0, &["貓"]),
            facility("F5", 7.0, &["貓"]),
            facility("F6", 2.0, &["貓"]),
            facility("F7", 6.0, &["貓"]),
        ];
        let report = match_facilities(
            &catalog,
            &triage(Urgency::Low, "貓", ""),
            &ORIGIN,
            &MatchOptions::default(),
        );
        assert_eq!(names(&report), vec!["F4", "F1", "F3", "F6", "F2"]);
    }

    #[test]
    fn unlimited_cap_returns_everything() {
        let catalog: Vec<FacilityRecord> = (0..8)
            .map(|i| facility(&format!("F{i}"), i as f64, &["貓"]))
            .collect();
        let options = MatchOptions {
            cap: None,
            ..MatchOptions::default()
        };
        let report = match_facilities(&catalog, &triage(Urgency::Low, "貓", ""), &ORIGIN, &options);
        assert_eq!(report.matches.len(), 8);
    }

    #[test]
    fn facility_without_position_is_excluded() {
        let mut broken = facility("Broken", 1.0, &["狗"]);
        broken.position = None;
        let catalog = vec![broken, facility("Fine", 4.0, &["狗"])];
        let report = match_facilities(
            &catalog,
            &triage(Urgency::High, "狗", ""),
            &ORIGIN,
            &MatchOptions::default(),
        );
        assert_eq!(names(&report), vec!["Fine"]);
    }

    #[test]
    fn match_does_not_touch_catalog() {
        let catalog = vec![facility("A", 1.0, &["狗"])];
        let before = catalog.clone();
        let _ = match_facilities(&catalog, &triage(Urgency::Low, "狗", ""), &ORIGIN, &MatchOptions::default());
        assert_eq!(catalog, before);
    }

    #[test]
    fn from_config_copies_options() {
        let config = AppConfig {
            radius_km: Some(10.0),
            match_cap: None,
            tag_matching: TagMatching::Strict,
            ..AppConfig::default()
        };
        let options = MatchOptions::from_config(&config);
        assert_eq!(options.radius_km, Some(10.0));
        assert_eq!(options.cap, None);
        assert_eq!(options.tag_matching, TagMatching::Strict);
    }
}
