use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bands::Band;
use crate::forecast::{ForecastPoint, HistoryPoint};

pub const DEFAULT_PM25_UNIT: &str = "ug/m3";

/// Latitude/longitude of a monitoring station
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StationCoords {
    pub latitude: f64,
    pub longitude: f64,
}

/// Station identity: either a display name or bare coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum StationRef {
    Coordinates(StationCoords),
    Name(String),
}

/// Current air quality for a city
///
/// A reading that only carries `message` means the lookup produced no data
/// (unknown city, no nearby sensors, upstream refusal).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AqiReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aqi: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<Band>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_pollutant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm25: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<StationRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_distance_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryPoint>,
    #[serde(rename = "aqi_category", default, skip_serializing_if = "Option::is_none")]
    pub aqi_category: Option<String>,
    #[serde(rename = "health_advice", default, skip_serializing_if = "Option::is_none")]
    pub health_advice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AqiReading {
    /// A reading that carries nothing but an explanation
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Default::default()
        }
    }

    /// True when both the AQI and the PM2.5 concentration are present
    pub fn has_data(&self) -> bool {
        self.aqi.is_some() && self.pm25.is_some()
    }
}

/// Health guidance derived from a reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub city: String,
    pub aqi: i32,
    pub band: Band,
    pub public_advice: String,
    pub sensitive_advice: String,
    pub pollutant_note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    pub city: String,
    pub aqi: i32,
    pub generated_utc: DateTime<Utc>,
    pub points: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
