pub mod openaq;
pub mod synthetic;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::StationRef;
use crate::provider_error::ProviderError;

pub use openaq::OpenAqProvider;
pub use synthetic::SyntheticProvider;

/// Latest PM2.5 observation for a city, before AQI derivation
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub resolved: Option<String>,
    pub pm25: f64,
    pub unit: String,
    pub main_pollutant: String,
    pub observed_at: Option<DateTime<Utc>>,
    pub station: Option<StationRef>,
    pub station_id: Option<i64>,
    pub sensor_id: Option<i64>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub locality: Option<String>,
    pub station_distance_meters: Option<f64>,
}

/// Source of current air quality observations
#[async_trait]
pub trait AirQualityProvider: Send + Sync {
    /// Look up the freshest observation for a (trimmed, non-empty) city name
    async fn observe(&self, city: &str) -> Result<Observation, ProviderError>;

    /// Whether gaps in recorded history may be filled with generated points
    fn synthesizes_history(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}
