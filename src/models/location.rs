//! Location model for validated coordinates and geocoded places

use serde::{Deserialize, Serialize};

use crate::error::GeoRiskError;

/// A resolved point on the globe, immutable once built
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside lat∈[-90,90], lon∈[-180,180]
    pub fn new(lat: f64, lon: f64) -> crate::Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoRiskError::validation(format!(
                "Latitude must be between -90 and 90, got: {lat}"
            )));
        }

        if !(-180.0..=180.0).contains(&lon) {
            return Err(GeoRiskError::validation(format!(
                "Longitude must be between -180 and 180, got: {lon}"
            )));
        }

        Ok(Self { lat, lon })
    }

    /// Short label used when no place name is known
    #[must_use]
    pub fn format_short(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }

    /// Full-precision label used in the report header
    #[must_use]
    pub fn format_precise(&self) -> String {
        format!("{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// Result of forward geocoding a free-text address
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub coordinate: Coordinate,
    /// Human-readable place name returned by the geocoder
    pub display_name: String,
}
