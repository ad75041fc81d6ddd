use std::convert::Infallible;

use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::GeoRiskError;
use crate::config::ReportConfig;
use crate::models::{Coordinate, InfrastructureSnapshot, RiskAssessment, WeatherSnapshot};
use crate::orchestrator::{AssessmentRequest, Orchestrator};
use crate::report::{paced_stream, synthesize};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize)]
pub struct CoordinateQuery {
    pub lat: f64,
    pub lon: f64,
}

impl CoordinateQuery {
    fn coordinate(&self) -> Result<Coordinate, ApiError> {
        Ok(Coordinate::new(self.lat, self.lon)?)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Pipeline error rendered as a JSON body with a Spanish message
pub struct ApiError(GeoRiskError);

impl From<GeoRiskError> for ApiError {
    fn from(err: GeoRiskError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            GeoRiskError::Validation { .. } => StatusCode::BAD_REQUEST,
            GeoRiskError::MissingCoordinate | GeoRiskError::InsufficientData { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            GeoRiskError::NoDataFound { .. } => StatusCode::NOT_FOUND,
            GeoRiskError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GeoRiskError::UpstreamUnavailable { .. }
            | GeoRiskError::MalformedUpstreamPayload { .. } => StatusCode::BAD_GATEWAY,
            GeoRiskError::Config { .. } | GeoRiskError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request failed with {}: {}", status, self.0);
        let body = ErrorBody {
            error: self.0.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/report", post(post_report))
        .route("/risk", get(get_risk))
        .route("/infrastructure", get(get_infrastructure))
        .route("/weather", get(get_weather))
        .with_state(state)
}

async fn post_report(
    State(state): State<AppState>,
    Json(request): Json<AssessmentRequest>,
) -> Result<Response, ApiError> {
    let bundle = state.orchestrator.assess(&request).await?;
    let report = synthesize(&bundle);
    info!("Streaming report for {}", bundle.location_label);

    let chunks = paced_stream(report, state.report.chunk_size, state.report.pacing())
        .map(Ok::<_, Infallible>);

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(chunks),
    )
        .into_response())
}

async fn get_risk(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<RiskAssessment>, ApiError> {
    let coordinate = query.coordinate()?;
    Ok(Json(state.orchestrator.risk(coordinate).await))
}

async fn get_infrastructure(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<InfrastructureSnapshot>, ApiError> {
    let coordinate = query.coordinate()?;
    Ok(Json(state.orchestrator.infrastructure(coordinate).await?))
}

async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<WeatherSnapshot>, ApiError> {
    let coordinate = query.coordinate()?;
    Ok(Json(state.orchestrator.weather(coordinate).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Upstream;
    use crate::models::{GeocodedPlace, SourceResult};
    use crate::orchestrator::{CallTimeouts, Geocoder, InfrastructureSource, WeatherSource};
    use async_trait::async_trait;
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct NoGeocoder;

    #[async_trait]
    impl Geocoder for NoGeocoder {
        async fn geocode(&self, _address: &str) -> SourceResult<GeocodedPlace> {
            Err(GeoRiskError::no_data("sin resultados"))
        }
    }

    struct StaticInfrastructure(bool);

    #[async_trait]
    impl InfrastructureSource for StaticInfrastructure {
        async fn snapshot(&self, _coordinate: Coordinate) -> SourceResult<InfrastructureSnapshot> {
            if self.0 {
                Ok(InfrastructureSnapshot::default())
            } else {
                Err(GeoRiskError::unavailable(Upstream::Overpass, "HTTP 504"))
            }
        }
    }

    struct NoWeather;

    #[async_trait]
    impl WeatherSource for NoWeather {
        async fn current_weather(&self, _coordinate: Coordinate) -> SourceResult<WeatherSnapshot> {
            Err(GeoRiskError::timeout(Upstream::Weather, "10s"))
        }
    }

    fn app(infrastructure_ok: bool) -> Router {
        let orchestrator = Orchestrator::new(
            Arc::new(NoGeocoder),
            Arc::new(StaticInfrastructure(infrastructure_ok)),
            Arc::new(NoWeather),
            CallTimeouts {
                geocoding: Duration::from_secs(1),
                infrastructure: Duration::from_secs(1),
                weather: Duration::from_secs(1),
            },
        );
        router(AppState {
            orchestrator,
            report: ReportConfig {
                chunk_size: 100,
                pacing_ms: 0,
            },
        })
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_report_streams_plain_text() {
        let response = app(true)
            .oneshot(post_json("/report", r#"{"lat":40.4168,"lon":-3.7038}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let text = body_text(response).await;
        assert!(text.starts_with("# 📊 INFORME DE ANÁLISIS GEOESPACIAL"));
        assert!(text.contains("**Coordenadas:** 40.416800, -3.703800"));
    }

    #[tokio::test]
    async fn test_report_without_coordinate_is_unprocessable() {
        let response = app(true)
            .oneshot(post_json("/report", r#"{"text":"hola"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("coordenadas"));
    }

    #[tokio::test]
    async fn test_report_with_failed_infrastructure_is_degraded() {
        let response = app(false)
            .oneshot(post_json("/report", r#"{"lat":40.0,"lon":-3.7}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("**Advertencia:**"));
    }

    #[tokio::test]
    async fn test_risk_endpoint() {
        let response = app(true)
            .oneshot(Request::get("/risk?lat=37.0&lon=-4.0").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let risk: RiskAssessment = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(risk.seismic.level, crate::models::RiskLevel::Medio);
    }

    #[tokio::test]
    async fn test_invalid_coordinate_is_bad_request() {
        let response = app(true)
            .oneshot(Request::get("/infrastructure?lat=95&lon=0").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_weather_timeout_maps_to_gateway_timeout() {
        let response = app(true)
            .oneshot(Request::get("/weather?lat=40&lon=-3").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
