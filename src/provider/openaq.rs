use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{AirQualityProvider, Observation};
use crate::models::{StationCoords, StationRef, DEFAULT_PM25_UNIT};
use crate::provider_error::ProviderError;
use crate::utils::haversine_meters;

pub const DEFAULT_OPENAQ_BASE_URL: &str = "https://api.openaq.org/v3";
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "EarthDataAQI/1.0 (contact@example.com)";

const PM25_PARAMETER_ID: i64 = 2;
/// OpenAQ caps the search radius of a single call at 25 km
const SEARCH_RADIUS_METERS: u32 = 25_000;
const LOCATION_LIMIT: u32 = 60;
const SENSOR_LIMIT: u32 = 6;
const LOOKBACK_DAYS_PRIMARY: i64 = 60;
const LOOKBACK_DAYS_FALLBACK: i64 = 120;

// ---- Nominatim payloads ----

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
    display_name: Option<String>,
    #[serde(default)]
    address: GeocodeAddress,
}

#[derive(Debug, Default, Deserialize)]
struct GeocodeAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

#[derive(Debug, Clone)]
struct GeoPoint {
    latitude: f64,
    longitude: f64,
    display: String,
    locality: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

// ---- OpenAQ payloads ----

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Location {
    id: i64,
    name: Option<String>,
    coordinates: Option<StationCoords>,
    locality: Option<String>,
    country: Option<CountryRef>,
}

#[derive(Debug, Deserialize)]
struct CountryRef {
    code: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Sensor {
    id: i64,
    parameter: Parameter,
    latest: Option<Latest>,
}

#[derive(Debug, Deserialize)]
struct Parameter {
    id: Option<i64>,
    units: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Latest {
    value: Option<f64>,
    datetime: Option<Timestamp>,
    coordinates: Option<StationCoords>,
}

#[derive(Debug, Deserialize)]
struct Timestamp {
    utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    value: Option<f64>,
    parameter: Option<Parameter>,
    period: Option<Period>,
    datetime: Option<Timestamp>,
    coordinates: Option<StationCoords>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Period {
    datetime_from: Option<Timestamp>,
    datetime_to: Option<Timestamp>,
}

/// Best PM2.5 value found so far while walking locations and sensors
#[derive(Debug, Clone)]
struct Candidate {
    value: f64,
    unit: String,
    observed_at: DateTime<Utc>,
    coordinates: Option<StationCoords>,
    sensor_id: i64,
    location_id: i64,
    location_name: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    locality: Option<String>,
}

fn parse_utc(value: Option<&Timestamp>) -> Option<DateTime<Utc>> {
    let raw = value?.utc.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// OpenAQ v3 latest-PM2.5 lookup, geocoding city names through Nominatim
#[derive(Clone)]
pub struct OpenAqProvider {
    client: reqwest::Client,
    openaq_url: String,
    geocode_url: String,
    api_key: String,
    user_agent: String,
}

impl OpenAqProvider {
    pub fn new(api_key: String, user_agent: String, timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_urls(
            DEFAULT_OPENAQ_BASE_URL.to_string(),
            DEFAULT_GEOCODING_BASE_URL.to_string(),
            api_key,
            user_agent,
            timeout,
        )
    }

    /// Create a provider against custom endpoints (used for mocking)
    pub fn with_base_urls(
        openaq_url: String,
        geocode_url: String,
        api_key: String,
        user_agent: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            openaq_url: openaq_url.trim_end_matches('/').to_string(),
            geocode_url: geocode_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            user_agent,
        })
    }

    fn openaq_get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.openaq_url, path))
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-API-Key", &self.api_key)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        debug!("Upstream responded with status {}", status);

        match status {
            StatusCode::UNAUTHORIZED => Err(ProviderError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            s if !s.is_success() => Err(ProviderError::Status {
                status: s.as_u16(),
                url: response.url().to_string(),
            }),
            _ => response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::ParseError(e.to_string())),
        }
    }

    /// Run a request whose failure only skips the current step.
    /// Unauthorized and rate-limited responses still abort the whole lookup.
    async fn send_lenient<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        step: &str,
    ) -> Result<Option<T>, ProviderError> {
        match self.send_json(request).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("{} failed, skipping: {}", step, e);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn geocode(&self, city: &str) -> Result<GeoPoint, ProviderError> {
        let request = self
            .client
            .get(format!("{}/search", self.geocode_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("q", city),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ]);

        let hits: Vec<GeocodeHit> = self
            .send_lenient(request, "Geocoding")
            .await?
            .unwrap_or_default();
        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotGeocoded(city.to_string()))?;

        let latitude = hit.lat.trim().parse::<f64>();
        let longitude = hit.lon.trim().parse::<f64>();
        let (Ok(latitude), Ok(longitude)) = (latitude, longitude) else {
            warn!("Geocoder returned unparseable coordinates for {}", city);
            return Err(ProviderError::NotGeocoded(city.to_string()));
        };

        let address = hit.address;
        let geo = GeoPoint {
            latitude,
            longitude,
            display: hit.display_name.unwrap_or_else(|| city.to_string()),
            locality: address.city.or(address.town).or(address.village),
            country: address.country,
            country_code: address.country_code.map(|c| c.to_uppercase()),
        };
        debug!("Geocoded {} to ({:.4}, {:.4})", city, geo.latitude, geo.longitude);
        Ok(geo)
    }

    async fn nearby_locations(&self, geo: &GeoPoint) -> Result<Vec<Location>, ProviderError> {
        let coordinates = format!("{:.6},{:.6}", geo.latitude, geo.longitude);
        let request = self.openaq_get("/locations").query(&[
            ("coordinates", coordinates),
            ("radius", SEARCH_RADIUS_METERS.to_string()),
            ("limit", LOCATION_LIMIT.to_string()),
            ("parameter_id", PM25_PARAMETER_ID.to_string()),
            ("order_by", "distance".to_string()),
            ("sort", "asc".to_string()),
        ]);

        let page: Option<Page<Location>> = self.send_lenient(request, "Location search").await?;
        Ok(page.map(|p| p.results).unwrap_or_default())
    }

    /// Freshest PM2.5 value across nearby locations newer than the lookback window
    #[instrument(skip(self, geo), fields(lat = geo.latitude, lon = geo.longitude))]
    async fn nearest_pm25(&self, geo: &GeoPoint, lookback_days: i64) -> Result<Option<Candidate>, ProviderError> {
        let locations = self.nearby_locations(geo).await?;
        debug!("Found {} candidate locations", locations.len());
        if locations.is_empty() {
            return Ok(None);
        }

        let threshold = Utc::now() - chrono::Duration::days(lookback_days);
        let mut best: Option<Candidate> = None;

        for location in locations {
            if location.id <= 0 {
                continue;
            }
            let Some(mut candidate) = self.latest_for_location(location.id, threshold).await? else {
                continue;
            };

            candidate.location_name = location.name.clone();
            if candidate.coordinates.is_none() {
                candidate.coordinates = location.coordinates;
            }
            candidate.locality = location.locality.clone();
            if let Some(country) = &location.country {
                candidate.country = country.name.clone();
                candidate.country_code = country.code.clone();
            }

            if best
                .as_ref()
                .map_or(true, |b| candidate.observed_at > b.observed_at)
            {
                best = Some(candidate);
            }
        }

        Ok(best)
    }

    async fn latest_for_location(
        &self,
        location_id: i64,
        threshold: DateTime<Utc>,
    ) -> Result<Option<Candidate>, ProviderError> {
        let request = self
            .openaq_get(&format!("/locations/{location_id}/sensors"))
            .query(&[
                ("parameter_id", PM25_PARAMETER_ID.to_string()),
                ("limit", SENSOR_LIMIT.to_string()),
            ]);
        let Some(page) = self
            .send_lenient::<Page<Sensor>>(request, "Sensor listing")
            .await?
        else {
            return Ok(None);
        };

        let mut best: Option<Candidate> = None;
        for sensor in page.results {
            if sensor.parameter.id != Some(PM25_PARAMETER_ID) {
                continue;
            }
            let unit = sensor
                .parameter
                .units
                .clone()
                .unwrap_or_else(|| DEFAULT_PM25_UNIT.to_string());

            let latest = sensor.latest.as_ref();
            let value = latest.and_then(|l| l.value).filter(|v| v.is_finite());
            let observed_at = parse_utc(latest.and_then(|l| l.datetime.as_ref()));

            let candidate = match (value, observed_at) {
                (Some(value), Some(observed_at)) if observed_at >= threshold => Candidate {
                    value,
                    unit,
                    observed_at,
                    coordinates: latest.and_then(|l| l.coordinates),
                    sensor_id: sensor.id,
                    location_id,
                    location_name: None,
                    country: None,
                    country_code: None,
                    locality: None,
                },
                _ => {
                    debug!("Sensor {} latest value is missing or stale, querying measurements", sensor.id);
                    let Some(mut candidate) = self.latest_measurement(sensor.id, threshold).await? else {
                        continue;
                    };
                    candidate.location_id = location_id;
                    candidate
                }
            };

            if best
                .as_ref()
                .map_or(true, |b| candidate.observed_at > b.observed_at)
            {
                best = Some(candidate);
            }
        }

        Ok(best)
    }

    async fn latest_measurement(
        &self,
        sensor_id: i64,
        threshold: DateTime<Utc>,
    ) -> Result<Option<Candidate>, ProviderError> {
        if sensor_id <= 0 {
            return Ok(None);
        }

        let request = self
            .openaq_get(&format!("/sensors/{sensor_id}/measurements"))
            .query(&[
                ("limit", "1".to_string()),
                ("order_by", "datetime".to_string()),
                ("sort", "desc".to_string()),
                ("date_from", threshold.to_rfc3339()),
            ]);
        let Some(page) = self
            .send_lenient::<Page<Measurement>>(request, "Measurement lookup")
            .await?
        else {
            return Ok(None);
        };

        let Some(measurement) = page.results.into_iter().next() else {
            return Ok(None);
        };
        let Some(value) = measurement.value.filter(|v| v.is_finite()) else {
            return Ok(None);
        };

        let period = measurement.period.as_ref();
        let observed_at = parse_utc(period.and_then(|p| p.datetime_to.as_ref()))
            .or_else(|| parse_utc(period.and_then(|p| p.datetime_from.as_ref())))
            .or_else(|| parse_utc(measurement.datetime.as_ref()));
        let Some(observed_at) = observed_at.filter(|ts| *ts >= threshold) else {
            return Ok(None);
        };

        Ok(Some(Candidate {
            value,
            unit: measurement
                .parameter
                .and_then(|p| p.units)
                .unwrap_or_else(|| DEFAULT_PM25_UNIT.to_string()),
            observed_at,
            coordinates: measurement.coordinates,
            sensor_id,
            location_id: 0,
            location_name: None,
            country: None,
            country_code: None,
            locality: None,
        }))
    }
}

#[async_trait]
impl AirQualityProvider for OpenAqProvider {
    #[instrument(skip(self), fields(provider = "openaq"))]
    async fn observe(&self, city: &str) -> Result<Observation, ProviderError> {
        let geo = self.geocode(city).await?;

        let candidate = match self.nearest_pm25(&geo, LOOKBACK_DAYS_PRIMARY).await? {
            Some(candidate) => Some(candidate),
            None => {
                debug!("No fresh PM2.5 in {} days, widening lookback", LOOKBACK_DAYS_PRIMARY);
                self.nearest_pm25(&geo, LOOKBACK_DAYS_FALLBACK).await?
            }
        };
        let candidate = candidate.ok_or_else(|| ProviderError::NoData(city.to_string()))?;

        info!(
            "Latest PM2.5 for {} is {:.1} {} from sensor {} at {}",
            city, candidate.value, candidate.unit, candidate.sensor_id, candidate.observed_at
        );

        let station = match (candidate.coordinates, candidate.location_name.clone()) {
            (Some(coords), _) => Some(StationRef::Coordinates(coords)),
            (None, Some(name)) => Some(StationRef::Name(name)),
            (None, None) => None,
        };
        let distance = candidate
            .coordinates
            .map(|c| haversine_meters(geo.latitude, geo.longitude, c.latitude, c.longitude));

        Ok(Observation {
            resolved: Some(geo.display),
            pm25: candidate.value,
            unit: candidate.unit,
            main_pollutant: "PM2_5".to_string(),
            observed_at: Some(candidate.observed_at),
            station,
            station_id: Some(candidate.location_id).filter(|id| *id > 0),
            sensor_id: Some(candidate.sensor_id),
            country: candidate.country.or(geo.country),
            country_code: candidate.country_code.or(geo.country_code),
            locality: candidate.locality.or(geo.locality),
            station_distance_meters: distance,
        })
    }

    fn name(&self) -> &'static str {
        "openaq"
    }
}
