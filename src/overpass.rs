//! Infrastructure snapshot builder backed by the Overpass API
//!
//! Runs one fixed union query around a coordinate, classifies every returned
//! element and groups the results into the seven snapshot lists. A failed
//! primary endpoint is retried once against the fallback mirror with the
//! identical query. Any failure yields an error value, never a partial
//! snapshot.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::classifier::{RawElement, classify};
use crate::config::OverpassConfig;
use crate::error::{GeoRiskError, Upstream};
use crate::models::{Coordinate, InfrastructureSnapshot, SourceResult};
use crate::orchestrator::InfrastructureSource;

const USER_AGENT: &str = concat!("GeoRisk/", env!("CARGO_PKG_VERSION"));

/// Top-level Overpass JSON payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<RawElement>,
    /// Set by the server when the query was aborted mid-way
    #[serde(default)]
    pub remark: Option<String>,
}

impl OverpassResponse {
    /// Elements of a complete answer. A `runtime error` remark means the
    /// element list was truncated, so the whole payload is rejected.
    pub fn into_elements(self) -> SourceResult<Vec<RawElement>> {
        match self.remark {
            Some(remark) if remark.trim_start().starts_with("runtime error") => {
                warn!("Overpass aborted the query: {}", remark);
                Err(GeoRiskError::unavailable(Upstream::Overpass, remark))
            }
            _ => Ok(self.elements),
        }
    }
}

/// Build the fixed union query. Radii are 1000 m for services and leisure,
/// 500 m for waterways and pharmacies, 300 m for main roads.
#[must_use]
pub fn build_query(coordinate: Coordinate) -> String {
    let around = |radius: u32| format!("(around:{radius},{},{})", coordinate.lat, coordinate.lon);
    let near = around(1000);
    let mid = around(500);
    let close = around(300);

    format!(
        "[out:json];\n(\n\
  node[\"amenity\"~\"hospital|clinic|doctors\"]{near};\n\
  way[\"amenity\"~\"hospital|clinic\"]{near};\n\
  relation[\"amenity\"=\"hospital\"]{near};\n\
  node[\"healthcare\"~\"hospital|clinic|centre\"]{near};\n\
  way[\"healthcare\"~\"hospital|clinic|centre\"]{near};\n\
  node[\"amenity\"~\"school|kindergarten|college|university\"]{near};\n\
  way[\"amenity\"~\"school|kindergarten|college|university\"]{near};\n\
  node[\"amenity\"~\"fire_station|police\"]{near};\n\
  way[\"amenity\"~\"fire_station|police\"]{near};\n\
  node[\"amenity\"=\"pharmacy\"]{mid};\n\
  way[\"waterway\"]{mid};\n\
  node[\"leisure\"~\"park|playground|garden|pitch|sports_centre\"]{near};\n\
  way[\"leisure\"~\"park|playground|garden|pitch\"]{near};\n\
  way[\"highway\"~\"primary|secondary|tertiary\"]{close};\n\
  node[\"shop\"]{mid};\n\
);\nout center;"
    )
}

/// Sends one query to one endpoint
#[async_trait]
pub trait OverpassTransport: Send + Sync {
    async fn fetch(&self, endpoint: &str, query: &str) -> SourceResult<OverpassResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpOverpassTransport {
    client: reqwest::Client,
}

impl HttpOverpassTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .with_context(|| "Failed to create Overpass HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OverpassTransport for HttpOverpassTransport {
    #[instrument(skip(self, query), fields(endpoint = %endpoint))]
    async fn fetch(&self, endpoint: &str, query: &str) -> SourceResult<OverpassResponse> {
        let url = format!("{endpoint}?data={}", urlencoding::encode(query));
        let start_time = Instant::now();

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GeoRiskError::from_reqwest(Upstream::Overpass, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Overpass endpoint answered HTTP {}", status);
            return Err(GeoRiskError::unavailable(
                Upstream::Overpass,
                format!("HTTP {status}"),
            ));
        }

        let payload: OverpassResponse = response
            .json()
            .await
            .map_err(|e| GeoRiskError::from_reqwest(Upstream::Overpass, &e))?;

        debug!(
            "Overpass returned {} elements in {:.3}s",
            payload.elements.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(payload)
    }
}

/// Raw-versus-classified counts for one query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Elements in the payload, duplicates included
    pub raw_elements: usize,
    /// Repeated `(type, id)` pairs skipped
    pub duplicates: usize,
    /// Unique elements no classification rule accepted
    pub dropped: usize,
    pub classified: usize,
}

/// Classify every element and group the matches. Elements repeated in the
/// payload (same type and id) are inserted once.
#[must_use]
pub fn classify_elements(elements: &[RawElement]) -> (InfrastructureSnapshot, SnapshotStats) {
    let mut snapshot = InfrastructureSnapshot::default();
    let mut stats = SnapshotStats {
        raw_elements: elements.len(),
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for element in elements {
        if !seen.insert((element.kind, element.id)) {
            stats.duplicates += 1;
            continue;
        }
        match classify(element) {
            Some(feature) => {
                snapshot.insert(feature);
                stats.classified += 1;
            }
            None => stats.dropped += 1,
        }
    }

    (snapshot, stats)
}

/// Runs the feature query with a single fallback and builds snapshots
pub struct SnapshotBuilder<T> {
    transport: T,
    primary_url: String,
    fallback_url: String,
}

impl SnapshotBuilder<HttpOverpassTransport> {
    pub fn from_config(config: &OverpassConfig) -> anyhow::Result<Self> {
        let transport = HttpOverpassTransport::new(config.timeout())?;
        Ok(Self::new(
            transport,
            config.primary_url.clone(),
            config.fallback_url.clone(),
        ))
    }
}

impl<T: OverpassTransport> SnapshotBuilder<T> {
    pub fn new(transport: T, primary_url: impl Into<String>, fallback_url: impl Into<String>) -> Self {
        Self {
            transport,
            primary_url: primary_url.into(),
            fallback_url: fallback_url.into(),
        }
    }

    /// Fetch raw elements, trying the fallback once when the primary is
    /// unavailable or times out. Malformed payloads are not retried.
    #[instrument(skip(self))]
    pub async fn fetch_elements(&self, coordinate: Coordinate) -> SourceResult<Vec<RawElement>> {
        let query = build_query(coordinate);

        let primary_err = match self.fetch_complete(&self.primary_url, &query).await {
            Ok(elements) => return Ok(elements),
            Err(err) if err.is_transient() => err,
            Err(err) => return Err(err),
        };

        warn!(
            "Primary Overpass endpoint failed ({}), trying fallback {}",
            primary_err, self.fallback_url
        );

        match self.fetch_complete(&self.fallback_url, &query).await {
            Ok(elements) => {
                info!("Fallback Overpass endpoint succeeded");
                Ok(elements)
            }
            Err(fallback_err) => {
                let message = format!("primary: {primary_err}; fallback: {fallback_err}");
                Err(match fallback_err {
                    GeoRiskError::Timeout { .. } => GeoRiskError::timeout(Upstream::Overpass, message),
                    GeoRiskError::MalformedUpstreamPayload { .. } => {
                        GeoRiskError::malformed(Upstream::Overpass, message)
                    }
                    _ => GeoRiskError::unavailable(Upstream::Overpass, message),
                })
            }
        }
    }

    async fn fetch_complete(&self, endpoint: &str, query: &str) -> SourceResult<Vec<RawElement>> {
        self.transport
            .fetch(endpoint, query)
            .await
            .and_then(OverpassResponse::into_elements)
    }

    /// Snapshot plus the raw counts it was built from
    pub async fn build_with_stats(
        &self,
        coordinate: Coordinate,
    ) -> SourceResult<(InfrastructureSnapshot, SnapshotStats)> {
        let elements = self.fetch_elements(coordinate).await?;
        let (snapshot, stats) = classify_elements(&elements);

        info!(
            hospitals = snapshot.hospitals.len(),
            schools = snapshot.schools.len(),
            emergency = snapshot.emergency_services.len(),
            waterways = snapshot.waterways.len(),
            parks = snapshot.parks.len(),
            roads = snapshot.roads.len(),
            shops = snapshot.shops.len(),
            dropped = stats.dropped,
            "Infrastructure snapshot built from {} elements",
            stats.raw_elements
        );

        Ok((snapshot, stats))
    }

    pub async fn build(&self, coordinate: Coordinate) -> SourceResult<InfrastructureSnapshot> {
        self.build_with_stats(coordinate)
            .await
            .map(|(snapshot, _)| snapshot)
    }
}

#[async_trait]
impl<T: OverpassTransport> InfrastructureSource for SnapshotBuilder<T> {
    async fn snapshot(&self, coordinate: Coordinate) -> SourceResult<InfrastructureSnapshot> {
        self.build(coordinate).await
    }
}
