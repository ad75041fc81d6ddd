//! Feature classification
//!
//! Maps a raw tagged map element onto the fixed infrastructure taxonomy using
//! a single ordered rule table. The first matching rule wins, so an element
//! carrying several qualifying tags is counted in exactly one category.

use std::collections::HashMap;

use serde::Deserialize;

use crate::models::{EmergencyKind, FeatureCategory, LocationFeature, UNNAMED};

/// Kind of OSM element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CenterPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A raw element as returned by an `out center;` feature query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawElement {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<CenterPoint>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl RawElement {
    /// Direct point if present, otherwise the centroid of extended geometry
    #[must_use]
    pub fn representative_point(&self) -> (Option<f64>, Option<f64>) {
        match (self.lat, self.lon, self.center) {
            (Some(lat), Some(lon), _) => (Some(lat), Some(lon)),
            (_, _, Some(center)) => (Some(center.lat), Some(center.lon)),
            (lat, lon, None) => (lat, lon),
        }
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Predicate over a single tag
#[derive(Debug, Clone, Copy)]
pub enum TagMatch {
    /// Tag present with one of the listed values
    AnyOf(&'static str, &'static [&'static str]),
    /// Tag present with any value
    Present(&'static str),
}

impl TagMatch {
    fn matches(&self, element: &RawElement) -> bool {
        match self {
            TagMatch::AnyOf(key, values) => element
                .tag(key)
                .is_some_and(|value| values.contains(&value)),
            TagMatch::Present(key) => element.tags.contains_key(*key),
        }
    }
}

/// Category a rule assigns, before sub-kind data is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Hospital,
    School,
    Emergency,
    Waterway,
    Park,
    Road,
    Shop,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub kind: CategoryKind,
    /// Any matcher satisfying the element selects this rule
    pub matchers: &'static [TagMatch],
}

/// Priority order: health > education > emergency > waterway > leisure > road > shop
pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        kind: CategoryKind::Hospital,
        matchers: &[
            TagMatch::AnyOf("amenity", &["hospital", "clinic", "doctors"]),
            TagMatch::AnyOf("healthcare", &["hospital", "clinic", "centre"]),
        ],
    },
    ClassificationRule {
        kind: CategoryKind::School,
        matchers: &[TagMatch::AnyOf(
            "amenity",
            &["school", "kindergarten", "college", "university"],
        )],
    },
    ClassificationRule {
        kind: CategoryKind::Emergency,
        matchers: &[TagMatch::AnyOf("amenity", &["fire_station", "police"])],
    },
    ClassificationRule {
        kind: CategoryKind::Waterway,
        matchers: &[TagMatch::Present("waterway")],
    },
    ClassificationRule {
        kind: CategoryKind::Park,
        matchers: &[TagMatch::AnyOf(
            "leisure",
            &["park", "playground", "garden", "pitch", "sports_centre"],
        )],
    },
    ClassificationRule {
        kind: CategoryKind::Road,
        matchers: &[TagMatch::AnyOf(
            "highway",
            &[
                "primary",
                "secondary",
                "tertiary",
                "primary_link",
                "secondary_link",
                "tertiary_link",
            ],
        )],
    },
    ClassificationRule {
        kind: CategoryKind::Shop,
        matchers: &[TagMatch::Present("shop")],
    },
];

/// First rule in `CLASSIFICATION_RULES` whose matchers accept the element
#[must_use]
pub fn matching_rule(element: &RawElement) -> Option<CategoryKind> {
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.matchers.iter().any(|m| m.matches(element)))
        .map(|rule| rule.kind)
}

/// Classify a raw element. Returns `None` for elements no rule accepts
/// (e.g. a pharmacy); those are dropped from the snapshot.
#[must_use]
pub fn classify(element: &RawElement) -> Option<LocationFeature> {
    let category = match matching_rule(element)? {
        CategoryKind::Hospital => FeatureCategory::Hospital,
        CategoryKind::School => FeatureCategory::School,
        CategoryKind::Emergency => FeatureCategory::Emergency {
            kind: element.tag("amenity").and_then(EmergencyKind::from_tag)?,
        },
        CategoryKind::Waterway => FeatureCategory::Waterway,
        CategoryKind::Park => FeatureCategory::Park,
        CategoryKind::Road => FeatureCategory::Road,
        CategoryKind::Shop => FeatureCategory::Shop {
            subtype: element.tag("shop").unwrap_or_default().to_string(),
        },
    };

    let (lat, lon) = element.representative_point();
    let name = element
        .tag("name")
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(UNNAMED)
        .to_string();

    Some(LocationFeature {
        category,
        name,
        lat,
        lon,
    })
}
