use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, instrument, warn};

use super::ServiceError;
use crate::bands::Band;
use crate::cache::{CityCache, CityDayKey};
use crate::history::{build_history, ReadingHistory};
use crate::models::AqiReading;
use crate::pm25::aqi_from_pm25;
use crate::provider::{AirQualityProvider, Observation};

#[derive(Clone)]
pub struct AqiService {
    provider: Arc<dyn AirQualityProvider>,
    cache: CityCache<AqiReading>,
    history: ReadingHistory,
}

impl AqiService {
    pub fn new(
        provider: Arc<dyn AirQualityProvider>,
        cache: CityCache<AqiReading>,
        history: ReadingHistory,
    ) -> Self {
        Self {
            provider,
            cache,
            history,
        }
    }

    /// Current reading for a city
    ///
    /// Provider failures do not surface as errors: they become a reading
    /// carrying only a `message`, which is never cached.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn fetch_by_city(&self, city: &str) -> Result<AqiReading, ServiceError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(ServiceError::BlankCity);
        }

        let now = Utc::now();
        let key = CityDayKey::new(city, now.date_naive());
        if let Some(cached) = self.cache.get(&key) {
            debug!("Cache hit for {}", key.as_str());
            return Ok(cached);
        }

        let observation = match self.provider.observe(city).await {
            Ok(observation) => observation,
            Err(e) => {
                warn!("Provider lookup for {} failed: {}", city, e);
                return Ok(AqiReading::message(e.user_message()));
            }
        };

        let reading = self.build_reading(city, observation, now);
        info!(
            "Reading for {}: AQI {} ({})",
            city,
            reading.aqi.unwrap_or_default(),
            reading.aqi_category.as_deref().unwrap_or("unknown")
        );

        self.cache.put(key, reading.clone());
        Ok(reading)
    }

    fn build_reading(&self, city: &str, observation: Observation, now: DateTime<Utc>) -> AqiReading {
        let aqi = aqi_from_pm25(observation.pm25);
        let band = Band::from_aqi(aqi);
        let observed_at = observation.observed_at.unwrap_or(now);

        self.history.record(city, observed_at, aqi);
        let history = build_history(
            city,
            self.history.recent(city),
            observed_at,
            aqi,
            self.provider.synthesizes_history(),
        );

        AqiReading {
            city: Some(city.to_string()),
            query: Some(city.to_string()),
            resolved: observation.resolved,
            aqi: Some(aqi),
            band: Some(band),
            color: Some(band.color().to_string()),
            main_pollutant: Some(observation.main_pollutant),
            pm25: Some(observation.pm25),
            unit: Some(observation.unit),
            observed_utc: Some(observed_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            station: observation.station,
            station_id: observation.station_id,
            sensor_id: observation.sensor_id,
            country: observation.country,
            country_code: observation.country_code,
            locality: observation.locality,
            station_distance_meters: observation.station_distance_meters,
            history,
            aqi_category: Some(band.label().to_string()),
            health_advice: Some(band.health_note().to_string()),
            message: None,
        }
    }
}
