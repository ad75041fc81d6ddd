//! End-to-end tests for the GeoRisk pipeline, from a raw feature payload to
//! the streamed report text. No network access is needed.

use georisk::location_resolver::CoordinateSource;
use georisk::orchestrator::CollectedResults;
use georisk::overpass::{OverpassResponse, classify_elements};
use georisk::{
    Coordinate, GeoRiskError, ReportChunks, ResolvedLocation, RiskLevel, Upstream, aggregate,
    resolve_coordinate, risk, synthesize,
};
use rstest::rstest;

const SEVILLA_PAYLOAD: &str = r#"{
  "version": 0.6,
  "elements": [
    {"type": "node", "id": 1, "lat": 37.389, "lon": -5.984, "tags": {"amenity": "hospital", "name": "Hospital Virgen del Rocío"}},
    {"type": "node", "id": 1, "lat": 37.389, "lon": -5.984, "tags": {"amenity": "hospital", "name": "Hospital Virgen del Rocío"}},
    {"type": "way", "id": 1, "center": {"lat": 37.390, "lon": -5.985}, "tags": {"waterway": "river", "name": "Guadalquivir"}},
    {"type": "way", "id": 2, "center": {"lat": 37.391, "lon": -5.986}, "tags": {"waterway": "canal"}},
    {"type": "way", "id": 3, "center": {"lat": 37.392, "lon": -5.987}, "tags": {"waterway": "stream"}},
    {"type": "way", "id": 4, "center": {"lat": 37.393, "lon": -5.988}, "tags": {"waterway": "drain"}},
    {"type": "way", "id": 5, "center": {"lat": 37.388, "lon": -5.983}, "tags": {"leisure": "park", "name": "Parque de María Luisa"}},
    {"type": "node", "id": 2, "lat": 37.387, "lon": -5.982, "tags": {"amenity": "fire_station", "name": "Parque de Bomberos"}},
    {"type": "node", "id": 3, "lat": 37.386, "lon": -5.981, "tags": {"amenity": "pharmacy"}},
    {"type": "node", "id": 4, "lat": 37.385, "lon": -5.980, "tags": {"shop": "bakery"}}
  ]
}"#;

fn sevilla() -> ResolvedLocation {
    resolve_coordinate(None, None, Some("Informe para 37.3891, -5.9845 por favor")).unwrap()
}

#[test]
fn test_payload_to_report() {
    let response: OverpassResponse = serde_json::from_str(SEVILLA_PAYLOAD).unwrap();
    let (snapshot, stats) = classify_elements(&response.elements);

    assert_eq!(stats.raw_elements, 10);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(snapshot.hospitals.len(), 1);
    assert_eq!(snapshot.waterways.len(), 4);
    assert_eq!(snapshot.fire_station_count(), 1);

    let location = sevilla();
    assert_eq!(location.source, CoordinateSource::Text);

    let infrastructure = Ok(snapshot);
    let assessment = risk::assess(&infrastructure, location.coordinate);
    assert_eq!(assessment.flood.level, RiskLevel::Alto);
    assert_eq!(assessment.seismic.level, RiskLevel::Medio);
    assert!(assessment.is_conclusive());

    let bundle = aggregate(
        location,
        CollectedResults {
            infrastructure: Some(infrastructure),
            risk: Some(Ok(assessment)),
            weather: None,
        },
    )
    .unwrap();

    let report = synthesize(&bundle);
    assert!(report.starts_with("# 📊 INFORME DE ANÁLISIS GEOESPACIAL"));
    assert!(report.contains("**Coordenadas:** 37.389100, -5.984500"));
    assert!(report.contains("Hospital Virgen del Rocío"));
    assert!(report.contains("**🌊 Riesgo de Inundación:** ALTO"));
    assert!(report.ends_with(risk::LIMITATIONS));
    assert!(!report.contains("CONDICIONES METEOROLÓGICAS"));

    let rejoined: String = ReportChunks::new(&report, 100).collect();
    assert_eq!(rejoined, report);
}

#[test]
fn test_unreachable_infrastructure_still_reports() {
    let location = sevilla();
    let infrastructure = Err(GeoRiskError::unavailable(Upstream::Overpass, "HTTP 504"));
    let assessment = risk::assess(&infrastructure, location.coordinate);
    assert!(!assessment.is_conclusive());

    let bundle = aggregate(
        location,
        CollectedResults {
            infrastructure: Some(infrastructure),
            risk: Some(Ok(assessment)),
            weather: None,
        },
    )
    .unwrap();

    let report = synthesize(&bundle);
    assert!(report.contains("⚠️ **Advertencia:** No se pudieron obtener datos de infraestructura."));
    assert!(report.contains("**🌊 Riesgo de Inundación:** DESCONOCIDO"));
    assert!(report.ends_with("Este es un análisis preliminar basado en datos públicos disponibles."));
}

#[test]
fn test_nothing_usable_is_insufficient_data() {
    let result = aggregate(
        sevilla(),
        CollectedResults {
            infrastructure: Some(Err(GeoRiskError::timeout(Upstream::Overpass, "30s"))),
            risk: Some(Err(GeoRiskError::timeout(Upstream::Risk, "30s"))),
            weather: None,
        },
    );

    let err = result.unwrap_err();
    assert!(matches!(err, GeoRiskError::InsufficientData { .. }));
    assert!(err.is_fatal());
}

#[rstest]
#[case("sin coordenadas")]
#[case("100.0, 200.0")]
#[case("")]
fn test_unresolvable_requests(#[case] text: &str) {
    let err = resolve_coordinate(None, None, Some(text)).unwrap_err();
    assert!(matches!(err, GeoRiskError::MissingCoordinate));
}

#[test]
fn test_explicit_coordinate_beats_text() {
    let explicit = Coordinate::new(40.4168, -3.7038).unwrap();
    let location = resolve_coordinate(Some(explicit), None, Some("37.0, -5.0")).unwrap();
    assert_eq!(location.coordinate, explicit);
    assert_eq!(location.source, CoordinateSource::Explicit);
}
