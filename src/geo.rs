//! Great-circle distance between coordinates.
//!
//! Haversine on a spherical Earth. This is an "as the crow flies" figure,
//! never a routed distance. Invalid coordinates are reported as a typed
//! `GeoError`; the matcher treats any error as "exclude this facility".

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("Coordinate {field} is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("Coordinate {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("No coordinates recorded for {0}")]
    MissingPosition(String),
}

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Validate a coordinate pair. Rejects NaN, infinities and values
    /// outside [-90, 90] / [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::OutOfRange { field: "lat", value: lat });
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::OutOfRange { field: "lon", value: lon });
        }
        Ok(Self { lat, lon })
    }

    /// Parse from the textual columns of a catalog row.
    pub fn parse(lat: &str, lon: &str) -> Result<Self, GeoError> {
        let lat_value = lat.trim().parse::<f64>().map_err(|_| GeoError::NotANumber {
            field: "lat",
            value: lat.to_string(),
        })?;
        let lon_value = lon.trim().parse::<f64>().map_err(|_| GeoError::NotANumber {
            field: "lon",
            value: lon.to_string(),
        })?;
        Self::new(lat_value, lon_value)
    }

    /// Distance from `self` to `other` in kilometres.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }
}

/// Haversine distance between two validated points.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();
    (EARTH_RADIUS_KM * c).max(0.0)
}

/// Distance between two raw coordinate pairs.
///
/// Validates both points first, so malformed input surfaces as `GeoError`
/// instead of a NaN leaking into the ranking.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64, GeoError> {
    let a = GeoPoint::new(lat1, lon1)?;
    let b = GeoPoint::new(lat2, lon2)?;
    Ok(haversine_km(&a, &b))
}
