//! `GeoRisk` - Geospatial urban risk assessment
//!
//! This library classifies nearby map features around a coordinate, scores
//! five urban risk dimensions plus a population estimate, and renders a
//! paced Spanish narrative report from the aggregated results.

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod http;
pub mod location_resolver;
pub mod models;
pub mod orchestrator;
pub mod overpass;
pub mod report;
pub mod risk;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use classifier::{RawElement, classify};
pub use config::GeoRiskConfig;
pub use error::{GeoRiskError, Upstream};
pub use location_resolver::{CoordinateParser, ResolvedLocation, resolve_coordinate};
pub use models::{
    Coordinate, InfrastructureSnapshot, LocationFeature, ReportBundle, RiskAssessment, RiskLevel,
    WeatherSnapshot,
};
pub use orchestrator::{AssessmentRequest, Orchestrator, aggregate};
pub use overpass::{SnapshotBuilder, SnapshotStats};
pub use report::{ReportChunks, paced_stream, synthesize};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, GeoRiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
