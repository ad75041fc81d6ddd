//! Risk assessment model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Risk level vocabulary. The uppercase Spanish words are part of the
/// report contract and are parsed verbatim downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Bajo,
    Medio,
    Alto,
    Desconocido,
}

impl RiskLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Bajo => "BAJO",
            RiskLevel::Medio => "MEDIO",
            RiskLevel::Alto => "ALTO",
            RiskLevel::Desconocido => "DESCONOCIDO",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One risk dimension: a level plus the explanation that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRating {
    pub level: RiskLevel,
    pub note: String,
}

impl RiskRating {
    #[must_use]
    pub fn new(level: RiskLevel, note: impl Into<String>) -> Self {
        Self {
            level,
            note: note.into(),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::new(RiskLevel::Desconocido, "No hay información disponible")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationEstimate {
    /// Estimated residents within the 1 km lookup radius
    pub estimate: u64,
    /// Residents per km²
    pub density: u64,
    pub note: String,
}

/// Raw counts the ratings were derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskDetails {
    pub waterways_nearby: usize,
    pub infrastructure_density: usize,
    pub green_areas: usize,
    pub fire_stations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub flood: RiskRating,
    pub structural: RiskRating,
    pub environmental: RiskRating,
    pub seismic: RiskRating,
    pub fire: RiskRating,
    pub population: Option<PopulationEstimate>,
    pub details: Option<RiskDetails>,
    /// Advisory note, set only when the assessment could not be computed
    pub note: Option<String>,
    pub sources: Vec<String>,
    pub limitations: String,
}

impl RiskAssessment {
    /// The five ratings in report order: flood, structural, fire, environmental, seismic
    #[must_use]
    pub fn ratings_in_report_order(&self) -> [&RiskRating; 5] {
        [
            &self.flood,
            &self.structural,
            &self.fire,
            &self.environmental,
            &self.seismic,
        ]
    }

    /// False when every dimension is `DESCONOCIDO`
    #[must_use]
    pub fn is_conclusive(&self) -> bool {
        self.ratings_in_report_order()
            .iter()
            .any(|rating| rating.level != RiskLevel::Desconocido)
    }
}
