//! Aggregation orchestrator
//!
//! Resolves the request coordinate, issues the independent upstream lookups
//! concurrently, waits for every issued call to settle and then decides
//! whether there is enough data for a report.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::GeoRiskConfig;
use crate::error::{GeoRiskError, Upstream};
use crate::geocoding::NominatimClient;
use crate::location_resolver::{ResolvedLocation, resolve_coordinate};
use crate::models::{
    Coordinate, GeocodedPlace, InfrastructureSnapshot, ReportBundle, RiskAssessment, SourceResult,
    WeatherSnapshot,
};
use crate::overpass::SnapshotBuilder;
use crate::risk;
use crate::weather::OpenMeteoClient;

/// Address → coordinate lookup
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> SourceResult<GeocodedPlace>;
}

/// Nearby infrastructure lookup
#[async_trait]
pub trait InfrastructureSource: Send + Sync {
    async fn snapshot(&self, coordinate: Coordinate) -> SourceResult<InfrastructureSnapshot>;
}

/// Current weather lookup
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_weather(&self, coordinate: Coordinate) -> SourceResult<WeatherSnapshot>;
}

/// What the caller knows about the place to analyse
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentRequest {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub address: Option<String>,
    /// Free-text request; searched for a `"<lat>, <lon>"` pair as a last resort
    pub text: Option<String>,
    #[serde(default)]
    pub skip_weather: bool,
}

impl AssessmentRequest {
    /// Explicit pair, if both halves were supplied
    pub fn explicit_coordinate(&self) -> crate::Result<Option<Coordinate>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(GeoRiskError::validation(
                "latitude and longitude must be given together",
            )),
        }
    }

    fn address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Results gathered at the join point, keyed by origin. `None` means the
/// call was never issued.
#[derive(Debug, Default)]
pub struct CollectedResults {
    pub infrastructure: Option<SourceResult<InfrastructureSnapshot>>,
    pub risk: Option<SourceResult<RiskAssessment>>,
    pub weather: Option<SourceResult<WeatherSnapshot>>,
}

/// Per-call deadlines
#[derive(Debug, Clone, Copy)]
pub struct CallTimeouts {
    pub geocoding: Duration,
    pub infrastructure: Duration,
    pub weather: Duration,
}

impl CallTimeouts {
    #[must_use]
    pub fn from_config(config: &GeoRiskConfig) -> Self {
        // The snapshot call may hit the fallback after a full primary timeout
        Self {
            geocoding: config.geocoding.timeout(),
            infrastructure: config.overpass.timeout() * 2,
            weather: config.weather.timeout(),
        }
    }
}

/// Gate and merge. Synthesis needs a usable snapshot or a usable risk
/// assessment; when neither exists the request fails with
/// `InsufficientData`.
///
/// `Orchestrator::assess` always fills the risk slot from the snapshot, so an
/// errored risk slot only comes from callers that score risk elsewhere.
pub fn aggregate(location: ResolvedLocation, results: CollectedResults) -> crate::Result<ReportBundle> {
    let CollectedResults {
        infrastructure,
        risk,
        weather,
    } = results;

    let infrastructure = infrastructure.unwrap_or_else(|| {
        Err(GeoRiskError::unavailable(
            Upstream::Overpass,
            "infrastructure lookup was not issued",
        ))
    });

    let risk = match (risk, &infrastructure) {
        (Some(Ok(assessment)), _) => assessment,
        (_, Ok(snapshot)) => risk::assess_snapshot(snapshot, location.coordinate),
        (risk_slot, Err(infra_err)) => {
            let risk_reason = match risk_slot {
                Some(Err(err)) => err.to_string(),
                _ => "not computed".to_string(),
            };
            return Err(GeoRiskError::insufficient_data(format!(
                "infrastructure: {infra_err}; risk: {risk_reason}"
            )));
        }
    };

    Ok(ReportBundle {
        coordinate: location.coordinate,
        location_label: location.label,
        infrastructure,
        risk,
        weather,
    })
}

async fn bounded<T, F>(deadline: Duration, upstream: Upstream, call: F) -> SourceResult<T>
where
    F: Future<Output = SourceResult<T>>,
{
    tokio::time::timeout(deadline, call).await.unwrap_or_else(|_| {
        Err(GeoRiskError::timeout(
            upstream,
            format!("no response within {}s", deadline.as_secs_f64()),
        ))
    })
}

/// Coordinates the upstream providers for one request at a time
#[derive(Clone)]
pub struct Orchestrator {
    geocoder: Arc<dyn Geocoder>,
    infrastructure: Arc<dyn InfrastructureSource>,
    weather: Arc<dyn WeatherSource>,
    timeouts: CallTimeouts,
}

impl Orchestrator {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        infrastructure: Arc<dyn InfrastructureSource>,
        weather: Arc<dyn WeatherSource>,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            geocoder,
            infrastructure,
            weather,
            timeouts,
        }
    }

    /// HTTP-backed providers built from configuration
    pub fn from_config(config: &GeoRiskConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            Arc::new(NominatimClient::new(&config.geocoding)?),
            Arc::new(SnapshotBuilder::from_config(&config.overpass)?),
            Arc::new(OpenMeteoClient::new(&config.weather)?),
            CallTimeouts::from_config(config),
        ))
    }

    pub async fn infrastructure(&self, coordinate: Coordinate) -> SourceResult<InfrastructureSnapshot> {
        bounded(
            self.timeouts.infrastructure,
            Upstream::Overpass,
            self.infrastructure.snapshot(coordinate),
        )
        .await
    }

    pub async fn weather(&self, coordinate: Coordinate) -> SourceResult<WeatherSnapshot> {
        bounded(
            self.timeouts.weather,
            Upstream::Weather,
            self.weather.current_weather(coordinate),
        )
        .await
    }

    /// Risk assessment for a coordinate; an unavailable snapshot gives
    /// `DESCONOCIDO` ratings rather than an error
    pub async fn risk(&self, coordinate: Coordinate) -> RiskAssessment {
        let snapshot = self.infrastructure(coordinate).await;
        risk::assess(&snapshot, coordinate)
    }

    async fn geocode(&self, address: &str) -> SourceResult<GeocodedPlace> {
        bounded(self.timeouts.geocoding, Upstream::Geocoding, self.geocoder.geocode(address)).await
    }

    /// Resolve, fetch, score and gate. Fatal outcomes are returned as errors
    /// whose `user_message()` is the single line shown instead of a report.
    #[instrument(skip(self, request), fields(address = request.address.as_deref().unwrap_or("")))]
    pub async fn assess(&self, request: &AssessmentRequest) -> crate::Result<ReportBundle> {
        let start_time = Instant::now();
        let explicit = request.explicit_coordinate()?;
        let address = request.address();

        // Without an explicit pair every other call depends on the geocoder
        let geocoded = match (explicit, address) {
            (None, Some(address)) => match self.geocode(address).await {
                Ok(place) => Some(place),
                Err(err) => {
                    warn!("Geocoding failed, falling back to request text: {}", err);
                    None
                }
            },
            _ => None,
        };

        let location = resolve_coordinate(explicit, geocoded.as_ref(), request.text.as_deref())?;
        let coordinate = location.coordinate;
        info!(
            "Assessing {} ({:?} coordinate)",
            coordinate.format_precise(),
            location.source
        );

        let label_lookup = async {
            match (explicit, address) {
                (Some(_), Some(address)) => Some(self.geocode(address).await),
                _ => None,
            }
        };
        let weather_lookup = async {
            if request.skip_weather {
                None
            } else {
                Some(self.weather(coordinate).await)
            }
        };

        let (infrastructure, weather, label) =
            tokio::join!(self.infrastructure(coordinate), weather_lookup, label_lookup);

        let location = match label {
            Some(Ok(place)) => ResolvedLocation {
                label: place.display_name,
                ..location
            },
            Some(Err(err)) => {
                warn!("Label geocoding failed: {}", err);
                location
            }
            None => location,
        };

        if let Err(err) = &infrastructure {
            warn!("Infrastructure lookup failed: {}", err);
        }
        if let Some(Err(err)) = &weather {
            warn!("Weather lookup failed: {}", err);
        }

        let risk = risk::assess(&infrastructure, coordinate);
        let bundle = aggregate(
            location,
            CollectedResults {
                infrastructure: Some(infrastructure),
                risk: Some(Ok(risk)),
                weather,
            },
        )?;

        info!(
            "All lookups settled in {:.3}s",
            start_time.elapsed().as_secs_f64()
        );
        Ok(bundle)
    }
}
