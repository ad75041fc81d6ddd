//! Current weather snapshot and display helpers

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Current conditions at a coordinate, as reported by Open-Meteo
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// Precipitation amount in mm
    pub precipitation: f64,
    /// Cloud cover percentage (0-100)
    pub cloud_cover: f64,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    pub wind_direction: f64,
    /// Spanish description derived from the WMO weather code
    pub weather_description: String,
    /// Observation time, local to the coordinate (`YYYY-MM-DDTHH:MM`) or RFC 3339
    pub timestamp: String,
}

impl WeatherSnapshot {
    /// Map a WMO weather code onto the fixed Spanish descriptions.
    /// Codes above 99 keep the default "Despejado".
    #[must_use]
    pub fn describe_code(code: i64) -> &'static str {
        match code {
            i64::MIN..=0 => "Despejado",
            1..=3 => "Parcialmente nublado",
            4..=48 => "Nublado",
            49..=67 => "Lluvia",
            68..=77 => "Nieve",
            78..=82 => "Chubascos",
            83..=86 => "Lluvia intensa",
            87..=99 => "Tormenta",
            _ => "Despejado",
        }
    }

    /// Eight-point Spanish compass label
    #[must_use]
    pub fn wind_direction_label(degrees: f64) -> &'static str {
        const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SO", "O", "NO"];
        let index = ((degrees / 45.0).round() as i64).rem_euclid(8) as usize;
        DIRECTIONS[index]
    }

    /// Beaufort-style wind description for a speed in km/h
    #[must_use]
    pub fn wind_speed_description(speed: f64) -> &'static str {
        match speed {
            s if s < 1.0 => "Calma",
            s if s < 5.0 => "Brisa ligera",
            s if s < 11.0 => "Brisa moderada",
            s if s < 19.0 => "Brisa fuerte",
            s if s < 28.0 => "Viento moderado",
            s if s < 38.0 => "Viento fuerte",
            _ => "Temporal",
        }
    }

    /// Observation time as `d/m/YYYY, HH:MM:SS`; unparsable stamps are returned as-is
    #[must_use]
    pub fn format_timestamp(&self) -> String {
        let parsed = NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| {
                chrono::DateTime::parse_from_rfc3339(&self.timestamp).map(|dt| dt.naive_local())
            });

        match parsed {
            Ok(dt) => dt.format("%-d/%-m/%Y, %H:%M:%S").to_string(),
            Err(_) => self.timestamp.clone(),
        }
    }

    /// Format wind information
    #[must_use]
    pub fn format_wind(&self) -> String {
        format!(
            "{} km/h (dirección {}° {}) - {}",
            self.wind_speed,
            self.wind_direction,
            Self::wind_direction_label(self.wind_direction),
            Self::wind_speed_description(self.wind_speed)
        )
    }
}
