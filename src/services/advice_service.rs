use tracing::{debug, instrument};

use super::{AqiService, ServiceError};
use crate::bands::{pollutant_note, Band};
use crate::models::{AqiReading, Advice};

const NO_DATA_MESSAGE: &str = "No air quality data available.";

#[derive(Clone)]
pub struct AdviceService {
    aqi_service: AqiService,
}

impl AdviceService {
    pub fn new(aqi_service: AqiService) -> Self {
        Self { aqi_service }
    }

    /// Guidance for a city; `asthma` requests the advice of the next band up
    #[instrument(skip(self))]
    pub async fn advise(&self, city: &str, asthma: bool) -> Result<Advice, ServiceError> {
        let reading = self.aqi_service.fetch_by_city(city).await?;
        Self::advice_for(&reading, asthma)
    }

    fn advice_for(reading: &AqiReading, asthma: bool) -> Result<Advice, ServiceError> {
        let Some(aqi) = reading.aqi else {
            let message = reading.message.as_deref().unwrap_or(NO_DATA_MESSAGE);
            return Err(ServiceError::NoData(message.to_string()));
        };

        let band = reading.band.unwrap_or_else(|| Band::from_aqi(aqi));
        let advisory_band = if asthma { band.stricter() } else { band };
        debug!("Advising on {} using {} guidance", band, advisory_band);

        Ok(Advice {
            city: reading.city.clone().unwrap_or_default(),
            aqi,
            band,
            public_advice: advisory_band.public_advice().to_string(),
            sensitive_advice: advisory_band.sensitive_advice().to_string(),
            pollutant_note: pollutant_note(reading.main_pollutant.as_deref().unwrap_or_default())
                .to_string(),
        })
    }
}
