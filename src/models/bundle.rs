//! Aggregated inputs consumed by the report synthesizer

use super::{Coordinate, InfrastructureSnapshot, RiskAssessment, WeatherSnapshot};
use crate::error::GeoRiskError;

/// Outcome of one upstream call: either its value or the error that replaced it
pub type SourceResult<T> = std::result::Result<T, GeoRiskError>;

/// Everything the synthesizer needs for one report. Built fresh per request
/// and never mutated after aggregation.
#[derive(Debug)]
pub struct ReportBundle {
    pub coordinate: Coordinate,
    pub location_label: String,
    pub infrastructure: SourceResult<InfrastructureSnapshot>,
    pub risk: RiskAssessment,
    /// `None` when the weather lookup was never issued
    pub weather: Option<SourceResult<WeatherSnapshot>>,
}

impl ReportBundle {
    /// The snapshot if the infrastructure lookup succeeded
    #[must_use]
    pub fn snapshot(&self) -> Option<&InfrastructureSnapshot> {
        self.infrastructure.as_ref().ok()
    }

    /// Current weather if the lookup was issued and succeeded
    #[must_use]
    pub fn current_weather(&self) -> Option<&WeatherSnapshot> {
        match &self.weather {
            Some(Ok(weather)) => Some(weather),
            _ => None,
        }
    }
}
