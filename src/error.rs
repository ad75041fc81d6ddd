//! Error types and handling for the `GeoRisk` pipeline

use std::fmt;

use thiserror::Error;

/// External collaborator a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Geocoding,
    Overpass,
    Weather,
    /// Risk scoring done outside the orchestrator and handed to `aggregate`
    Risk,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Upstream::Geocoding => "Nominatim",
            Upstream::Overpass => "Overpass API",
            Upstream::Weather => "Open-Meteo",
            Upstream::Risk => "risk assessment",
        };
        f.write_str(name)
    }
}

/// Main error type for the `GeoRisk` pipeline
#[derive(Error, Debug)]
pub enum GeoRiskError {
    /// Upstream call failed (after fallback, where one exists)
    #[error("{upstream} unavailable: {message}")]
    UpstreamUnavailable { upstream: Upstream, message: String },

    /// Upstream call did not settle within its deadline
    #[error("{upstream} timed out: {message}")]
    Timeout { upstream: Upstream, message: String },

    /// Query succeeded but returned nothing usable
    #[error("No data found: {message}")]
    NoDataFound { message: String },

    /// Upstream answered with an unexpected shape
    #[error("Malformed {upstream} payload: {message}")]
    MalformedUpstreamPayload { upstream: Upstream, message: String },

    /// No coordinate could be resolved for the request
    #[error("No coordinate could be resolved for the request")]
    MissingCoordinate,

    /// Neither infrastructure nor risk data is usable
    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl GeoRiskError {
    pub fn unavailable<S: Into<String>>(upstream: Upstream, message: S) -> Self {
        Self::UpstreamUnavailable {
            upstream,
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(upstream: Upstream, message: S) -> Self {
        Self::Timeout {
            upstream,
            message: message.into(),
        }
    }

    pub fn no_data<S: Into<String>>(message: S) -> Self {
        Self::NoDataFound {
            message: message.into(),
        }
    }

    pub fn malformed<S: Into<String>>(upstream: Upstream, message: S) -> Self {
        Self::MalformedUpstreamPayload {
            upstream,
            message: message.into(),
        }
    }

    pub fn insufficient_data<S: Into<String>>(message: S) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Map a transport error from reqwest onto the upstream taxonomy.
    /// Timeouts are kept distinct; everything else is an unavailable upstream.
    #[must_use]
    pub fn from_reqwest(upstream: Upstream, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(upstream, err.to_string())
        } else if err.is_decode() {
            Self::malformed(upstream, err.to_string())
        } else {
            Self::unavailable(upstream, err.to_string())
        }
    }

    /// Errors after which no report can be produced at all
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GeoRiskError::MissingCoordinate | GeoRiskError::InsufficientData { .. }
        )
    }

    /// Errors that warrant trying an alternate endpoint for the same query
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GeoRiskError::UpstreamUnavailable { .. } | GeoRiskError::Timeout { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            GeoRiskError::InsufficientData { .. } => {
                "❌ Error: No se pudieron obtener datos de las APIs. Por favor, intente nuevamente."
                    .to_string()
            }
            GeoRiskError::MissingCoordinate => {
                "❌ Error: No se pudieron determinar las coordenadas de la ubicación solicitada."
                    .to_string()
            }
            GeoRiskError::UpstreamUnavailable { upstream, message } => {
                format!("Error conectando con {upstream}: {message}")
            }
            GeoRiskError::Timeout { upstream, .. } => {
                format!("Tiempo de espera agotado al consultar {upstream}")
            }
            GeoRiskError::NoDataFound { message } => message.clone(),
            GeoRiskError::MalformedUpstreamPayload { upstream, .. } => {
                format!("Respuesta inesperada de {upstream}")
            }
            GeoRiskError::Config { .. } => {
                "Error de configuración. Revise el archivo de configuración.".to_string()
            }
            GeoRiskError::Validation { message } => format!("Entrada no válida: {message}"),
            GeoRiskError::Io { .. } => "Error de lectura/escritura de archivos.".to_string(),
        }
    }
}
