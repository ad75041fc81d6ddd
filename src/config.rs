//! Configuration management for `GeoRisk`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::GeoRiskError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for `GeoRisk`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeoRiskConfig {
    /// Feature-lookup (Overpass) configuration
    #[serde(default)]
    pub overpass: OverpassConfig,
    /// Weather API configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Geocoding (Nominatim) configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Report streaming configuration
    #[serde(default)]
    pub report: ReportConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Overpass API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverpassConfig {
    #[serde(default = "default_overpass_primary")]
    pub primary_url: String,
    /// Tried exactly once, with the identical query, when the primary fails
    #[serde(default = "default_overpass_fallback")]
    pub fallback_url: String,
    #[serde(default = "default_overpass_timeout")]
    pub timeout_seconds: u32,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default = "default_lookup_timeout")]
    pub timeout_seconds: u32,
    /// Transient-failure retries for the weather call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Geocoding configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    #[serde(default = "default_lookup_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Nominatim rejects requests without an identifying agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Report streaming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Characters per streamed slice
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Delay between slices in milliseconds (0 disables pacing)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value functions
fn default_overpass_primary() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_overpass_fallback() -> String {
    "https://lz4.overpass-api.de/api/interpreter".to_string()
}

fn default_overpass_timeout() -> u32 {
    15
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_lookup_timeout() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    1
}

fn default_user_agent() -> String {
    format!("GeoRisk/{}", env!("CARGO_PKG_VERSION"))
}

fn default_chunk_size() -> usize {
    100
}

fn default_pacing_ms() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            primary_url: default_overpass_primary(),
            fallback_url: default_overpass_fallback(),
            timeout_seconds: default_overpass_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_seconds: default_lookup_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_lookup_timeout(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl OverpassConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl WeatherConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl GeocodingConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl ReportConfig {
    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl GeoRiskConfig {
    /// Load configuration from file and environment variables. `None` uses
    /// the default config location.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. GEORISK_REPORT__PACING_MS=0
        builder = builder.add_source(
            Environment::with_prefix("GEORISK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: GeoRiskConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("georisk").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.overpass.primary_url.is_empty() {
            self.overpass.primary_url = default_overpass_primary();
        }
        if self.overpass.fallback_url.is_empty() {
            self.overpass.fallback_url = default_overpass_fallback();
        }
        if self.overpass.timeout_seconds == 0 {
            self.overpass.timeout_seconds = default_overpass_timeout();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_lookup_timeout();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_lookup_timeout();
        }
        if self.geocoding.user_agent.is_empty() {
            self.geocoding.user_agent = default_user_agent();
        }
        if self.report.chunk_size == 0 {
            self.report.chunk_size = default_chunk_size();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.port == 0 {
            self.server.port = default_port();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        let timeouts = [
            ("Overpass", self.overpass.timeout_seconds),
            ("Weather", self.weather.timeout_seconds),
            ("Geocoding", self.geocoding.timeout_seconds),
        ];
        for (name, seconds) in timeouts {
            if seconds > 300 {
                return Err(GeoRiskError::config(format!(
                    "{name} timeout cannot exceed 300 seconds"
                ))
                .into());
            }
        }

        if self.weather.max_retries > 10 || self.geocoding.max_retries > 10 {
            return Err(GeoRiskError::config("Max retries cannot exceed 10").into());
        }

        if self.report.chunk_size == 0 {
            return Err(GeoRiskError::config("Report chunk size must be at least 1").into());
        }

        if self.report.pacing_ms > 1000 {
            return Err(
                GeoRiskError::config("Report pacing cannot exceed 1000 ms per chunk").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(GeoRiskError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(GeoRiskError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Overpass primary", &self.overpass.primary_url),
            ("Overpass fallback", &self.overpass.fallback_url),
            ("Weather", &self.weather.base_url),
            ("Geocoding", &self.geocoding.base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(GeoRiskError::config(format!(
                    "{name} URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
