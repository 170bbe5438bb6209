use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::provider::openaq::{
    DEFAULT_GEOCODING_BASE_URL, DEFAULT_OPENAQ_BASE_URL, DEFAULT_USER_AGENT,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown AQI_PROVIDER '{0}', expected 'openaq' or 'synthetic'")]
    UnknownProvider(String),

    #[error("OPENAQ_API_KEY must be set when AQI_PROVIDER=openaq")]
    MissingApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAq,
    Synthetic,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openaq" => Ok(ProviderKind::OpenAq),
            "synthetic" => Ok(ProviderKind::Synthetic),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub provider: ProviderKind,
    pub openaq_api_key: Option<String>,
    pub openaq_base_url: String,
    pub geocoding_base_url: String,
    pub geocoding_user_agent: String,
    pub aqi_cache_ttl_minutes: u64,
    pub forecast_cache_ttl_minutes: u64,
    pub cache_max_entries: usize,
    pub http_timeout_seconds: u64,
}

// Hand-written so the API key never reaches the logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("provider", &self.provider)
            .field("openaq_api_key", &self.openaq_api_key.as_ref().map(|_| "***"))
            .field("openaq_base_url", &self.openaq_base_url)
            .field("geocoding_base_url", &self.geocoding_base_url)
            .field("geocoding_user_agent", &self.geocoding_user_agent)
            .field("aqi_cache_ttl_minutes", &self.aqi_cache_ttl_minutes)
            .field("forecast_cache_ttl_minutes", &self.forecast_cache_ttl_minutes)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let openaq_api_key = var("OPENAQ_API_KEY").map(|k| k.trim().to_string());

        let provider = match var("AQI_PROVIDER") {
            Some(raw) => raw.parse()?,
            None if openaq_api_key.is_some() => ProviderKind::OpenAq,
            None => ProviderKind::Synthetic,
        };
        if provider == ProviderKind::OpenAq && openaq_api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Config {
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: var("SERVER_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            provider,
            openaq_api_key,
            openaq_base_url: var("OPENAQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAQ_BASE_URL.to_string()),
            geocoding_base_url: var("GEOCODING_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEOCODING_BASE_URL.to_string()),
            geocoding_user_agent: var("GEOCODING_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            aqi_cache_ttl_minutes: var("AQI_CACHE_TTL_MINUTES")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .unwrap_or(5),
            forecast_cache_ttl_minutes: var("FORECAST_CACHE_TTL_MINUTES")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .unwrap_or(10),
            cache_max_entries: var("CACHE_MAX_ENTRIES")
                .unwrap_or_else(|| "500".to_string())
                .parse()
                .unwrap_or(500),
            http_timeout_seconds: var("HTTP_TIMEOUT_SECONDS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn aqi_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.aqi_cache_ttl_minutes * 60)
    }

    pub fn forecast_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.forecast_cache_ttl_minutes * 60)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}
