use std::sync::Arc;

use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::cache::CityCache;
use crate::config::{Config, ProviderKind};
use crate::history::{ReadingHistory, HISTORY_TTL};
use crate::provider::{AirQualityProvider, OpenAqProvider, SyntheticProvider};
use crate::provider_error::ProviderError;
use crate::services::AqiService;

/// Running HTTP server
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
}

/// Construct the provider selected by configuration
pub fn build_provider(config: &Config) -> Result<Arc<dyn AirQualityProvider>, ProviderError> {
    match config.provider {
        ProviderKind::OpenAq => {
            let provider = OpenAqProvider::with_base_urls(
                config.openaq_base_url.clone(),
                config.geocoding_base_url.clone(),
                config.openaq_api_key.clone().unwrap_or_default(),
                config.geocoding_user_agent.clone(),
                config.http_timeout(),
            )?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Synthetic => Ok(Arc::new(SyntheticProvider::new())),
    }
}

/// Wire services and caches around a provider
pub fn build_state(config: &Config, provider: Arc<dyn AirQualityProvider>) -> AppState {
    let aqi_cache = CityCache::new(config.cache_max_entries, config.aqi_cache_ttl());
    let forecast_cache = CityCache::new(config.cache_max_entries, config.forecast_cache_ttl());
    let history = ReadingHistory::with_limits(config.cache_max_entries, HISTORY_TTL);
    let aqi_service = AqiService::new(provider, aqi_cache, history);
    AppState::new(aqi_service, forecast_cache)
}

impl Application {
    /// Build the provider, services and router, then spawn the server
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let provider = build_provider(&config)?;
        info!("Using {} air quality provider", provider.name());

        let app = create_router(build_state(&config, provider)).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

        info!("Application initialized successfully");
        Ok(Self { server_handle })
    }

    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
