use chrono::Utc;
use tracing::{debug, instrument};

use super::{AqiService, ServiceError};
use crate::cache::{CityCache, CityDayKey};
use crate::forecast::extrapolate;
use crate::models::ForecastResponse;

#[derive(Clone)]
pub struct ForecastService {
    aqi_service: AqiService,
    cache: CityCache<ForecastResponse>,
}

impl ForecastService {
    pub fn new(aqi_service: AqiService, cache: CityCache<ForecastResponse>) -> Self {
        Self { aqi_service, cache }
    }

    /// Three-day projection from the city's current reading and history
    #[instrument(skip(self))]
    pub async fn forecast(&self, city: &str) -> Result<ForecastResponse, ServiceError> {
        let trimmed = city.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::BlankCity);
        }

        let now = Utc::now();
        let key = CityDayKey::new(trimmed, now.date_naive());
        if let Some(cached) = self.cache.get(&key) {
            debug!("Forecast cache hit for {}", key.as_str());
            return Ok(cached);
        }

        let reading = self.aqi_service.fetch_by_city(trimmed).await?;
        let Some(aqi) = reading.aqi else {
            return Err(ServiceError::NoData(
                reading
                    .message
                    .unwrap_or_else(|| "No air quality data available.".to_string()),
            ));
        };

        let response = ForecastResponse {
            city: reading.city.unwrap_or_else(|| trimmed.to_string()),
            aqi,
            generated_utc: now,
            points: extrapolate(aqi, &reading.history).to_vec(),
        };
        self.cache.put(key, response.clone());
        Ok(response)
    }
}
