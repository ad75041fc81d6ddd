//! Infrastructure model: classified map features grouped per category

use serde::{Deserialize, Serialize};

/// Placeholder name for features without a `name` tag
pub const UNNAMED: &str = "Sin nombre";

/// Emergency service sub-kind, carried through from the `amenity` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyKind {
    Police,
    FireStation,
}

impl EmergencyKind {
    #[must_use]
    pub fn from_tag(value: &str) -> Option<Self> {
        match value {
            "police" => Some(Self::Police),
            "fire_station" => Some(Self::FireStation),
            _ => None,
        }
    }
}

/// The fixed infrastructure taxonomy. Every feature belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum FeatureCategory {
    Hospital,
    School,
    Emergency { kind: EmergencyKind },
    Waterway,
    Park,
    Road,
    Shop { subtype: String },
}

/// A single classified map feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFeature {
    #[serde(flatten)]
    pub category: FeatureCategory,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LocationFeature {
    #[must_use]
    pub fn has_name(&self) -> bool {
        self.name != UNNAMED
    }

    /// Shop subtype, if this is a shop
    #[must_use]
    pub fn shop_subtype(&self) -> Option<&str> {
        match &self.category {
            FeatureCategory::Shop { subtype } => Some(subtype),
            _ => None,
        }
    }

    #[must_use]
    pub fn emergency_kind(&self) -> Option<EmergencyKind> {
        match self.category {
            FeatureCategory::Emergency { kind } => Some(kind),
            _ => None,
        }
    }
}

/// Nearby infrastructure for one coordinate, one list per category.
/// List order is discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSnapshot {
    pub hospitals: Vec<LocationFeature>,
    pub schools: Vec<LocationFeature>,
    pub emergency_services: Vec<LocationFeature>,
    pub waterways: Vec<LocationFeature>,
    pub parks: Vec<LocationFeature>,
    pub roads: Vec<LocationFeature>,
    pub shops: Vec<LocationFeature>,
}

impl InfrastructureSnapshot {
    /// Append a feature to the list matching its category
    pub fn insert(&mut self, feature: LocationFeature) {
        let list = match feature.category {
            FeatureCategory::Hospital => &mut self.hospitals,
            FeatureCategory::School => &mut self.schools,
            FeatureCategory::Emergency { .. } => &mut self.emergency_services,
            FeatureCategory::Waterway => &mut self.waterways,
            FeatureCategory::Park => &mut self.parks,
            FeatureCategory::Road => &mut self.roads,
            FeatureCategory::Shop { .. } => &mut self.shops,
        };
        list.push(feature);
    }

    /// Hospitals + schools + shops: the structural density signal
    #[must_use]
    pub fn total_infra(&self) -> usize {
        self.hospitals.len() + self.schools.len() + self.shops.len()
    }

    #[must_use]
    pub fn emergency_of_kind(&self, kind: EmergencyKind) -> Vec<&LocationFeature> {
        self.emergency_services
            .iter()
            .filter(|f| f.emergency_kind() == Some(kind))
            .collect()
    }

    #[must_use]
    pub fn fire_station_count(&self) -> usize {
        self.emergency_of_kind(EmergencyKind::FireStation).len()
    }

    /// Number of features across all seven lists
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.total_infra()
            + self.emergency_services.len()
            + self.waterways.len()
            + self.parks.len()
            + self.roads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feature_count() == 0
    }
}
