//! Risk scoring engine
//!
//! Pure function from an infrastructure snapshot and a coordinate to five
//! risk ratings plus a population estimate. Each dimension is an ordered
//! rule table evaluated top to bottom; the first rule whose predicate holds
//! sets both the level and the note.

use tracing::{debug, instrument};

use crate::models::{
    Coordinate, InfrastructureSnapshot, PopulationEstimate, RiskAssessment, RiskDetails,
    RiskLevel, RiskRating, SourceResult,
};

/// Counts every rule in this module looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskInputs {
    pub lat: f64,
    pub waterways: usize,
    pub parks: usize,
    pub total_infra: usize,
    pub fire_stations: usize,
}

impl RiskInputs {
    #[must_use]
    pub fn from_snapshot(snapshot: &InfrastructureSnapshot, coordinate: Coordinate) -> Self {
        Self {
            lat: coordinate.lat,
            waterways: snapshot.waterways.len(),
            parks: snapshot.parks.len(),
            total_infra: snapshot.total_infra(),
            fire_stations: snapshot.fire_station_count(),
        }
    }
}

/// One row of a rating table
pub struct RiskRule {
    pub level: RiskLevel,
    pub applies: fn(&RiskInputs) -> bool,
    pub note: fn(&RiskInputs) -> String,
}

pub static FLOOD_RULES: &[RiskRule] = &[
    RiskRule {
        level: RiskLevel::Alto,
        applies: |i| i.waterways > 3,
        note: |i| {
            format!(
                "Se detectaron {} cauces de agua en un radio de 500m. Alto riesgo de inundación en caso de precipitaciones extremas.",
                i.waterways
            )
        },
    },
    RiskRule {
        level: RiskLevel::Medio,
        applies: |i| i.waterways > 0,
        note: |i| {
            format!(
                "{} cauce(s) de agua cercano(s). Riesgo moderado de inundación.",
                i.waterways
            )
        },
    },
    RiskRule {
        level: RiskLevel::Bajo,
        applies: |_| true,
        note: |_| "No se detectaron cauces de agua significativos en las cercanías.".to_string(),
    },
];

pub static STRUCTURAL_RULES: &[RiskRule] = &[
    RiskRule {
        level: RiskLevel::Alto,
        applies: |i| i.total_infra > 50,
        note: |i| {
            format!(
                "Zona de alta densidad urbana con {} elementos de infraestructura. Posible sobrecarga de servicios públicos.",
                i.total_infra
            )
        },
    },
    RiskRule {
        level: RiskLevel::Medio,
        applies: |i| i.total_infra > 20,
        note: |i| {
            format!(
                "Densidad urbana moderada con {} elementos de infraestructura.",
                i.total_infra
            )
        },
    },
    RiskRule {
        level: RiskLevel::Bajo,
        applies: |_| true,
        note: |i| {
            format!(
                "Baja densidad urbana con {} elementos registrados.",
                i.total_infra
            )
        },
    },
];

/// More green space means lower risk, so the polarity is inverted here
pub static ENVIRONMENTAL_RULES: &[RiskRule] = &[
    RiskRule {
        level: RiskLevel::Bajo,
        applies: |i| i.parks > 3,
        note: |i| {
            format!(
                "Buena disponibilidad de áreas verdes ({} parques/espacios recreativos). Calidad ambiental favorable.",
                i.parks
            )
        },
    },
    RiskRule {
        level: RiskLevel::Alto,
        applies: |i| i.parks == 0,
        note: |_| "Ausencia de áreas verdes registradas. Baja calidad ambiental urbana.".to_string(),
    },
    RiskRule {
        level: RiskLevel::Medio,
        applies: |_| true,
        note: |i| {
            format!(
                "{} área(s) verde(s) detectada(s). Calidad ambiental moderada.",
                i.parks
            )
        },
    },
];

/// Latitude band heuristic for southern Spain; not meant to generalise elsewhere
pub static SEISMIC_RULES: &[RiskRule] = &[
    RiskRule {
        level: RiskLevel::Medio,
        applies: |i| i.lat > 36.0 && i.lat < 38.0,
        note: |_| {
            "Zona con actividad sísmica moderada según el IGN. Se recomienda construcción antisísmica."
                .to_string()
        },
    },
    RiskRule {
        level: RiskLevel::Bajo,
        applies: |_| true,
        note: |_| "Actividad sísmica baja según registros históricos del IGN.".to_string(),
    },
];

/// ALTO and MEDIO are checked before the station count, so a dense zone with
/// two or more stations falls through to BAJO.
pub static FIRE_RULES: &[RiskRule] = &[
    RiskRule {
        level: RiskLevel::Alto,
        applies: |i| i.total_infra > 500 && i.fire_stations == 0,
        note: |_| {
            "Alta densidad urbana sin estaciones de bomberos detectadas. Riesgo elevado de propagación."
                .to_string()
        },
    },
    RiskRule {
        level: RiskLevel::Medio,
        applies: |i| i.total_infra > 300 && i.fire_stations < 2,
        note: |_| {
            "Densidad urbana media con cobertura limitada de servicios contra incendios."
                .to_string()
        },
    },
    RiskRule {
        level: RiskLevel::Bajo,
        applies: |i| i.fire_stations > 0,
        note: |i| {
            format!(
                "Cobertura adecuada con {} estación(es) de bomberos detectada(s).",
                i.fire_stations
            )
        },
    },
    RiskRule {
        level: RiskLevel::Bajo,
        applies: |_| true,
        note: |_| "Cobertura de servicios contra incendios no disponible en los datos.".to_string(),
    },
];

/// Population multiplier brackets keyed on `total_infra`
struct PopulationBracket {
    above: usize,
    multiplier: f64,
    note: fn(usize) -> String,
}

static POPULATION_BRACKETS: &[PopulationBracket] = &[
    PopulationBracket {
        above: 500,
        multiplier: 2.5,
        note: |t| {
            format!("Zona de muy alta densidad. Estimación basada en {t} elementos de infraestructura.")
        },
    },
    PopulationBracket {
        above: 200,
        multiplier: 2.0,
        note: |t| {
            format!("Zona urbana consolidada. Estimación basada en {t} elementos de infraestructura.")
        },
    },
    PopulationBracket {
        above: 50,
        multiplier: 1.5,
        note: |t| {
            format!("Zona urbana moderada. Estimación basada en {t} elementos de infraestructura.")
        },
    },
];

/// Area of the 1 km lookup radius in km², rounded the way published figures are
#[allow(clippy::approx_constant)]
const LOOKUP_AREA_KM2: f64 = 3.14;

pub const SOURCES: [&str; 4] = [
    "OpenStreetMap / Overpass API - Infraestructura y cauces de agua",
    "Análisis basado en datos cartográficos oficiales OSM",
    "IGN (Instituto Geográfico Nacional) - Referencias sísmicas",
    "Estimación poblacional basada en densidad de infraestructura",
];

pub const LIMITATIONS: &str = "Los riesgos se calculan con datos disponibles públicamente. Para análisis detallados se recomienda consultar: Copernicus EMS, IGN, MITECO (Ministerio para la Transición Ecológica).";

pub const MISSING_DATA_NOTE: &str = "No se pudieron evaluar los riesgos por falta de datos";

/// Evaluate a rule table; first match wins
#[must_use]
pub fn evaluate(rules: &[RiskRule], inputs: &RiskInputs) -> RiskRating {
    rules
        .iter()
        .find(|rule| (rule.applies)(inputs))
        .map_or_else(RiskRating::unknown, |rule| {
            RiskRating::new(rule.level, (rule.note)(inputs))
        })
}

/// Population estimate from key infrastructure weights
#[must_use]
pub fn estimate_population(snapshot: &InfrastructureSnapshot) -> PopulationEstimate {
    let key_infra = snapshot.hospitals.len() * 100
        + snapshot.schools.len() * 50
        + snapshot.shops.len() * 10;
    let total_infra = snapshot.total_infra();

    let (multiplier, note) = POPULATION_BRACKETS
        .iter()
        .find(|bracket| total_infra > bracket.above)
        .map_or_else(
            || (1.0, "Zona de baja densidad. Estimación aproximada.".to_string()),
            |bracket| (bracket.multiplier, (bracket.note)(total_infra)),
        );

    let estimate = (key_infra as f64 * multiplier).round() as u64;
    let density = (estimate as f64 / LOOKUP_AREA_KM2).round() as u64;

    PopulationEstimate {
        estimate,
        density,
        note,
    }
}

/// Score a snapshot. Never fails: an errored snapshot yields an
/// all-`DESCONOCIDO` assessment with a single advisory note.
#[instrument(skip(snapshot), fields(lat = coordinate.lat, lon = coordinate.lon))]
pub fn assess(snapshot: &SourceResult<InfrastructureSnapshot>, coordinate: Coordinate) -> RiskAssessment {
    match snapshot {
        Ok(snapshot) => assess_snapshot(snapshot, coordinate),
        Err(err) => {
            debug!("Snapshot unavailable, risks unknown: {}", err);
            unknown_assessment()
        }
    }
}

#[must_use]
pub fn assess_snapshot(snapshot: &InfrastructureSnapshot, coordinate: Coordinate) -> RiskAssessment {
    let inputs = RiskInputs::from_snapshot(snapshot, coordinate);

    let assessment = RiskAssessment {
        flood: evaluate(FLOOD_RULES, &inputs),
        structural: evaluate(STRUCTURAL_RULES, &inputs),
        environmental: evaluate(ENVIRONMENTAL_RULES, &inputs),
        seismic: evaluate(SEISMIC_RULES, &inputs),
        fire: evaluate(FIRE_RULES, &inputs),
        population: Some(estimate_population(snapshot)),
        details: Some(RiskDetails {
            waterways_nearby: inputs.waterways,
            infrastructure_density: inputs.total_infra,
            green_areas: inputs.parks,
            fire_stations: inputs.fire_stations,
        }),
        note: None,
        sources: SOURCES.iter().map(|s| (*s).to_string()).collect(),
        limitations: LIMITATIONS.to_string(),
    };

    debug!(
        flood = %assessment.flood.level,
        structural = %assessment.structural.level,
        environmental = %assessment.environmental.level,
        seismic = %assessment.seismic.level,
        fire = %assessment.fire.level,
        "Risk assessment computed"
    );

    assessment
}

fn unknown_assessment() -> RiskAssessment {
    RiskAssessment {
        flood: RiskRating::unknown(),
        structural: RiskRating::unknown(),
        environmental: RiskRating::unknown(),
        seismic: RiskRating::unknown(),
        fire: RiskRating::unknown(),
        population: None,
        details: None,
        note: Some(MISSING_DATA_NOTE.to_string()),
        sources: Vec::new(),
        limitations: String::new(),
    }
}
