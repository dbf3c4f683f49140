//! Map deep links. String construction only; nothing here calls out.

use reqwest::Url;

use crate::geo::GeoPoint;

const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/";
const SEARCH_BASE: &str = "https://www.google.com/maps/search/";

/// Turn-by-turn navigation link to `destination`.
pub fn navigation_url(destination: &GeoPoint) -> String {
    format!(
        "{DIRECTIONS_BASE}?api=1&destination={},{}",
        destination.lat, destination.lon
    )
}

/// Map search for `keywords`, used when the catalog has nothing to offer.
pub fn search_url(keywords: &str) -> String {
    match Url::parse_with_params(SEARCH_BASE, &[("api", "1"), ("query", keywords.trim())]) {
        Ok(url) => url.into(),
        // SEARCH_BASE is a valid absolute URL, so parsing cannot fail.
        Err(_) => SEARCH_BASE.to_string(),
    }
}
