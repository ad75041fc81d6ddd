//! Weather API client for Open-Meteo current conditions
//!
//! No API key is required. The response is reduced to a `WeatherSnapshot`
//! with the weather code already mapped to its Spanish description.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, error, info, instrument, warn};

use crate::config::WeatherConfig;
use crate::error::{GeoRiskError, Upstream};
use crate::http::{map_middleware_error, retrying_client};
use crate::models::{Coordinate, SourceResult, WeatherSnapshot};
use crate::orchestrator::WeatherSource;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,precipitation,weather_code,cloud_cover,wind_speed_10m,wind_direction_10m";

/// Open-Meteo client for current weather
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(config: &WeatherConfig) -> anyhow::Result<Self> {
        let user_agent = concat!("GeoRisk/", env!("CARGO_PKG_VERSION"));
        Ok(Self {
            client: retrying_client(config.timeout(), config.max_retries, user_agent)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn forecast_url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&current={CURRENT_FIELDS}&timezone=auto",
            self.base_url, coordinate.lat, coordinate.lon
        )
    }

    /// Current conditions at a coordinate
    #[instrument(skip(self), fields(lat = coordinate.lat, lon = coordinate.lon))]
    pub async fn get_current_weather(&self, coordinate: Coordinate) -> SourceResult<WeatherSnapshot> {
        info!(
            "Getting current weather for coordinates: {:.4}, {:.4}",
            coordinate.lat, coordinate.lon
        );
        let start_time = Instant::now();

        let url = self.forecast_url(coordinate);
        debug!("Open-Meteo API request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_middleware_error(Upstream::Weather, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Open-Meteo answered HTTP {}", status);
            return Err(GeoRiskError::unavailable(
                Upstream::Weather,
                format!("HTTP {status}"),
            ));
        }

        let forecast: openmeteo::ForecastResponse = response.json().await.map_err(|e| {
            error!("Failed to parse weather response: {}", e);
            GeoRiskError::from_reqwest(Upstream::Weather, &e)
        })?;

        let snapshot = forecast.into_snapshot()?;

        info!(
            "Successfully retrieved current weather in {:.3}s",
            start_time.elapsed().as_secs_f64()
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn current_weather(&self, coordinate: Coordinate) -> SourceResult<WeatherSnapshot> {
        self.get_current_weather(coordinate).await
    }
}

/// `OpenMeteo` API response structures and conversion utilities
mod openmeteo {
    use super::{GeoRiskError, SourceResult, Upstream, Utc, WeatherSnapshot};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub current: Option<CurrentData>,
    }

    /// Current conditions block; every value may be missing
    #[derive(Debug, Default, Deserialize)]
    pub struct CurrentData {
        pub time: Option<String>,
        #[serde(rename = "temperature_2m")]
        pub temperature: Option<f64>,
        #[serde(rename = "relative_humidity_2m")]
        pub humidity: Option<f64>,
        pub precipitation: Option<f64>,
        pub weather_code: Option<f64>,
        pub cloud_cover: Option<f64>,
        #[serde(rename = "wind_speed_10m")]
        pub wind_speed: Option<f64>,
        #[serde(rename = "wind_direction_10m")]
        pub wind_direction: Option<f64>,
    }

    impl ForecastResponse {
        pub fn into_snapshot(self) -> SourceResult<WeatherSnapshot> {
            let current = self.current.ok_or_else(|| {
                GeoRiskError::malformed(Upstream::Weather, "response has no current block")
            })?;
            Ok(current.into())
        }
    }

    impl From<CurrentData> for WeatherSnapshot {
        fn from(current: CurrentData) -> Self {
            let code = current.weather_code.unwrap_or(0.0).round() as i64;
            WeatherSnapshot {
                temperature: current.temperature.unwrap_or(0.0),
                humidity: current.humidity.unwrap_or(0.0),
                precipitation: current.precipitation.unwrap_or(0.0),
                cloud_cover: current.cloud_cover.unwrap_or(0.0),
                wind_speed: current.wind_speed.unwrap_or(0.0),
                wind_direction: current.wind_direction.unwrap_or(0.0),
                weather_description: WeatherSnapshot::describe_code(code).to_string(),
                timestamp: current
                    .time
                    .unwrap_or_else(|| Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> openmeteo::ForecastResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_current_block_maps_to_snapshot() {
        let response = parse(
            r#"{"latitude":40.4,"longitude":-3.7,"current":{"time":"2026-10-07T14:30","interval":900,
                "temperature_2m":21.5,"relative_humidity_2m":40,"precipitation":0.2,"weather_code":61,
                "cloud_cover":75,"wind_speed_10m":12.0,"wind_direction_10m":180}}"#,
        );
        let snapshot = response.into_snapshot().unwrap();
        assert_eq!(snapshot.temperature, 21.5);
        assert_eq!(snapshot.humidity, 40.0);
        assert_eq!(snapshot.weather_description, "Lluvia");
        assert_eq!(snapshot.timestamp, "2026-10-07T14:30");
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let snapshot = parse(r#"{"current":{}}"#).into_snapshot().unwrap();
        assert_eq!(snapshot.wind_speed, 0.0);
        assert_eq!(snapshot.weather_description, "Despejado");
        assert!(!snapshot.timestamp.is_empty());
    }

    #[test]
    fn test_missing_current_block_is_malformed() {
        let err = parse(r#"{"latitude":40.4}"#).into_snapshot().unwrap_err();
        assert!(matches!(err, GeoRiskError::MalformedUpstreamPayload { .. }));
    }

    #[test]
    fn test_forecast_url() {
        let client = OpenMeteoClient::new(&WeatherConfig::default()).unwrap();
        let url = client.forecast_url(Coordinate { lat: 40.5, lon: -3.25 });
        assert_eq!(
            url,
            format!(
                "https://api.open-meteo.com/v1/forecast?latitude=40.5&longitude=-3.25&current={CURRENT_FIELDS}&timezone=auto"
            )
        );
    }
}
