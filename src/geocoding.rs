//! Forward geocoding through Nominatim

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::GeocodingConfig;
use crate::error::{GeoRiskError, Upstream};
use crate::http::{map_middleware_error, retrying_client};
use crate::models::{Coordinate, GeocodedPlace, SourceResult};
use crate::orchestrator::Geocoder;

/// One Nominatim search hit; coordinates arrive as strings
#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: String,
}

impl SearchResult {
    fn into_place(self) -> SourceResult<GeocodedPlace> {
        let parse = |value: &str| {
            value.parse::<f64>().map_err(|_| {
                GeoRiskError::malformed(Upstream::Geocoding, format!("non-numeric coordinate '{value}'"))
            })
        };
        let lat = parse(&self.lat)?;
        let lon = parse(&self.lon)?;
        let coordinate = Coordinate::new(lat, lon)
            .map_err(|e| GeoRiskError::malformed(Upstream::Geocoding, e.to_string()))?;

        Ok(GeocodedPlace {
            coordinate,
            display_name: self.display_name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl NominatimClient {
    pub fn new(config: &GeocodingConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: retrying_client(config.timeout(), config.max_retries, &config.user_agent)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, address: &str) -> String {
        format!(
            "{}/search?format=json&q={}",
            self.base_url,
            urlencoding::encode(address)
        )
    }

    /// Resolve an address to the first matching place
    #[instrument(skip(self), fields(address = %address))]
    pub async fn search(&self, address: &str) -> SourceResult<GeocodedPlace> {
        info!("Geocoding location: '{}'", address);

        let response = self
            .client
            .get(self.search_url(address))
            .send()
            .await
            .map_err(|e| map_middleware_error(Upstream::Geocoding, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoRiskError::unavailable(
                Upstream::Geocoding,
                format!("HTTP {status}"),
            ));
        }

        let results: Vec<SearchResult> = response
            .json()
            .await
            .map_err(|e| GeoRiskError::from_reqwest(Upstream::Geocoding, &e))?;

        first_place(address, results)
    }
}

fn first_place(address: &str, results: Vec<SearchResult>) -> SourceResult<GeocodedPlace> {
    let Some(first) = results.into_iter().next() else {
        warn!("No results found for location '{}'", address);
        return Err(GeoRiskError::no_data(format!(
            "No se encontraron resultados para '{address}'"
        )));
    };

    let place = first.into_place()?;
    debug!(
        "Geocoded '{}' to {} ({})",
        address,
        place.coordinate.format_short(),
        place.display_name
    );
    Ok(place)
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> SourceResult<GeocodedPlace> {
        self.search(address).await
    }
}
