use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{debug, instrument};

use super::{AirQualityProvider, Observation};
use crate::models::{StationRef, DEFAULT_PM25_UNIT};
use crate::provider_error::ProviderError;
use crate::utils::title_case;

const POLLUTANTS: [&str; 5] = ["NO2", "O3", "PM2_5", "SO2", "CO"];

/// PM2.5 range that maps to roughly AQI 50-180
const PM25_RANGE: (f64, f64) = (12.0, 110.0);

/// Small deterministic generator (SplitMix64) seeded from hashed inputs
#[derive(Debug, Clone)]
pub struct Jitter {
    state: u64,
}

impl Jitter {
    pub fn seeded<T: Hash>(seed: T) -> Self {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        Self {
            state: hasher.finish(),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in the inclusive range `[low, high]`
    pub fn between(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64 + 1;
        low + (self.next_u64() % span) as i32
    }
}

/// Offline provider that fabricates plausible readings.
///
/// Output is stable for a given city and UTC day so repeated lookups agree.
#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }

    fn observation_for(city: &str, day: NaiveDate) -> Observation {
        let mut jitter = Jitter::seeded((city.to_lowercase(), day));
        let (low, high) = PM25_RANGE;
        let pm25 = ((low + jitter.next_f64() * (high - low)) * 10.0).round() / 10.0;
        let pollutant = POLLUTANTS[jitter.between(0, POLLUTANTS.len() as i32 - 1) as usize];

        Observation {
            resolved: Some(title_case(city)),
            pm25,
            unit: DEFAULT_PM25_UNIT.to_string(),
            main_pollutant: pollutant.to_string(),
            observed_at: Some(Utc::now()),
            station: Some(StationRef::Name(format!("{} synthetic station", title_case(city)))),
            station_id: None,
            sensor_id: None,
            country: None,
            country_code: None,
            locality: None,
            station_distance_meters: None,
        }
    }
}

#[async_trait]
impl AirQualityProvider for SyntheticProvider {
    #[instrument(skip(self), fields(provider = "synthetic"))]
    async fn observe(&self, city: &str) -> Result<Observation, ProviderError> {
        let observation = Self::observation_for(city, Utc::now().date_naive());
        debug!(
            "Generated PM2.5 {:.1} ({}) for {}",
            observation.pm25, observation.main_pollutant, city
        );
        Ok(observation)
    }

    fn synthesizes_history(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
