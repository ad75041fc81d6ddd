//! Data models for the GeoRisk pipeline
//!
//! This module contains the core domain models organized by concern:
//! - Location: validated coordinates and geocoded places
//! - Infrastructure: classified map features and the per-category snapshot
//! - Risk: risk ratings, population estimate and the full assessment
//! - Weather: current weather snapshot and display helpers
//! - Bundle: the aggregated inputs handed to the report synthesizer

pub mod bundle;
pub mod infrastructure;
pub mod location;
pub mod risk;
pub mod weather;

// Re-export all public types for convenient access
pub use bundle::{ReportBundle, SourceResult};
pub use infrastructure::{EmergencyKind, FeatureCategory, InfrastructureSnapshot, LocationFeature, UNNAMED};
pub use location::{Coordinate, GeocodedPlace};
pub use risk::{PopulationEstimate, RiskAssessment, RiskDetails, RiskLevel, RiskRating};
pub use weather::WeatherSnapshot;
