use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::base_url::{resolve_api_base, ApiBase};
use crate::models::{Advice, AqiReading};

pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid API URL {0}")]
    InvalidUrl(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Read access to the air quality endpoints
#[async_trait]
pub trait AirQualityApi: Send + Sync + 'static {
    async fn get_aqi(&self, city: &str) -> Result<AqiReading, ClientError>;

    async fn get_advice(&self, city: &str, asthma: bool) -> Result<Advice, ClientError>;
}

/// HTTP client for `/api/aqi` and `/api/advice`
#[derive(Clone)]
pub struct AqiClient {
    client: reqwest::Client,
    base: ApiBase,
    page: Url,
}

impl AqiClient {
    pub fn new(base: ApiBase, page: Url, timeout: Duration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base, page })
    }

    /// Resolve the base from an optional override before building the client
    pub fn for_page(
        override_value: Option<&str>,
        page: Url,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base = resolve_api_base(override_value, &page);
        debug!("API base resolved to {}", base);
        Self::new(base, page, timeout)
    }

    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AirQualityApi for AqiClient {
    #[instrument(skip(self))]
    async fn get_aqi(&self, city: &str) -> Result<AqiReading, ClientError> {
        let url = self.base.endpoint(&self.page, "/api/aqi")?;
        let cache_buster = Utc::now().timestamp_millis().to_string();

        let response = self
            .client
            .get(url)
            .query(&[("city", city), ("_ts", cache_buster.as_str())])
            .send()
            .await?;

        let status = response.status();
        debug!("GET /api/aqi responded with {}", status);
        if status.is_success() {
            return Self::decode(response).await;
        }

        // The service answers "no data" with 404 and a message-only reading
        let failed_url = response.url().to_string();
        if status == StatusCode::NOT_FOUND {
            if let Ok(reading) = Self::decode::<AqiReading>(response).await {
                if reading.message.is_some() {
                    return Ok(reading);
                }
            }
        }

        warn!("AQI request for {} failed with {}", city, status);
        Err(ClientError::Status {
            status: status.as_u16(),
            url: failed_url,
        })
    }

    #[instrument(skip(self))]
    async fn get_advice(&self, city: &str, asthma: bool) -> Result<Advice, ClientError> {
        let url = self.base.endpoint(&self.page, "/api/advice")?;
        let asthma = if asthma { "true" } else { "false" };

        let response = self
            .client
            .get(url)
            .query(&[("city", city), ("asthma", asthma)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Advice request for {} failed with {}", city, status);
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_page_resolves_base() {
        let page = Url::parse("http://localhost").unwrap();
        let client = AqiClient::for_page(Some("/proxy"), page, DEFAULT_CLIENT_TIMEOUT).unwrap();
        assert_eq!(client.base(), &ApiBase::Relative("/proxy".to_string()));
    }
}
