//! Location Resolution Module
//!
//! Decides which coordinate a request is about. An explicit pair wins over a
//! geocoding result, which wins over a decimal pair found in free text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::GeoRiskError;
use crate::models::{Coordinate, GeocodedPlace};

static COORDINATE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+\.?\d*),\s*(-?\d+\.?\d*)").expect("coordinate pattern is valid")
});

/// Where the resolved coordinate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    Explicit,
    Geocoded,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    /// Place name when known, otherwise the short coordinate form
    pub label: String,
    pub source: CoordinateSource,
}

/// Finds `"<lat>, <lon>"` decimal pairs in free text
pub struct CoordinateParser;

impl CoordinateParser {
    /// First pair in the text that is a valid coordinate
    #[must_use]
    pub fn find_in_text(text: &str) -> Option<Coordinate> {
        COORDINATE_PAIR.captures_iter(text).find_map(|caps| {
            let lat = caps[1].parse::<f64>().ok()?;
            let lon = caps[2].parse::<f64>().ok()?;
            Coordinate::new(lat, lon).ok()
        })
    }
}

/// Apply the resolution priority. Fails with `MissingCoordinate` when no
/// source yields a coordinate.
pub fn resolve_coordinate(
    explicit: Option<Coordinate>,
    geocoded: Option<&GeocodedPlace>,
    text: Option<&str>,
) -> crate::Result<ResolvedLocation> {
    if let Some(coordinate) = explicit {
        debug!("Using explicit coordinate {}", coordinate.format_short());
        return Ok(ResolvedLocation {
            coordinate,
            label: geocoded.map_or_else(|| coordinate.format_short(), |p| p.display_name.clone()),
            source: CoordinateSource::Explicit,
        });
    }

    if let Some(place) = geocoded {
        debug!("Using geocoded coordinate for '{}'", place.display_name);
        return Ok(ResolvedLocation {
            coordinate: place.coordinate,
            label: place.display_name.clone(),
            source: CoordinateSource::Geocoded,
        });
    }

    if let Some(coordinate) = text.and_then(CoordinateParser::find_in_text) {
        debug!("Using coordinate parsed from request text {}", coordinate.format_short());
        return Ok(ResolvedLocation {
            coordinate,
            label: coordinate.format_short(),
            source: CoordinateSource::Text,
        });
    }

    Err(GeoRiskError::MissingCoordinate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sol() -> GeocodedPlace {
        GeocodedPlace {
            coordinate: Coordinate { lat: 40.4169, lon: -3.7035 },
            display_name: "Puerta del Sol, Madrid".to_string(),
        }
    }

    #[rstest]
    #[case("Analiza 40.4168, -3.7038 por favor", Some((40.4168, -3.7038)))]
    #[case("37.38,-5.98", Some((37.38, -5.98)))]
    #[case("-33.9, 18.4", Some((-33.9, 18.4)))]
    #[case("Sin coordenadas aquí", None)]
    #[case("1000, 2000", None)]
    fn test_find_in_text(#[case] text: &str, #[case] expected: Option<(f64, f64)>) {
        let found = CoordinateParser::find_in_text(text).map(|c| (c.lat, c.lon));
        assert_eq!(found, expected);
    }

    #[test]
    fn test_invalid_pair_skipped_for_later_valid_one() {
        let found = CoordinateParser::find_in_text("ref 500, 600 then 41.38, 2.17").unwrap();
        assert_eq!((found.lat, found.lon), (41.38, 2.17));
    }

    #[test]
    fn test_explicit_wins_and_takes_geocoded_label() {
        let explicit = Coordinate { lat: 39.47, lon: -0.38 };
        let place = sol();
        let resolved = resolve_coordinate(Some(explicit), Some(&place), Some("1.0, 2.0")).unwrap();
        assert_eq!(resolved.coordinate, explicit);
        assert_eq!(resolved.source, CoordinateSource::Explicit);
        assert_eq!(resolved.label, "Puerta del Sol, Madrid");
    }

    #[test]
    fn test_geocoded_beats_text() {
        let place = sol();
        let resolved = resolve_coordinate(None, Some(&place), Some("1.0, 2.0")).unwrap();
        assert_eq!(resolved.source, CoordinateSource::Geocoded);
        assert_eq!(resolved.coordinate, place.coordinate);
    }

    #[test]
    fn test_text_fallback_uses_coordinate_label() {
        let resolved = resolve_coordinate(None, None, Some("zona 40.41677, -3.70379")).unwrap();
        assert_eq!(resolved.source, CoordinateSource::Text);
        assert_eq!(resolved.label, "40.4168, -3.7038");
    }

    #[test]
    fn test_nothing_resolves() {
        let err = resolve_coordinate(None, None, Some("hola")).unwrap_err();
        assert!(matches!(err, GeoRiskError::MissingCoordinate));
        assert!(err.is_fatal());
    }
}
