//! Client side of the service: API access, search state and terminal rendering

pub mod api_client;
pub mod base_url;
pub mod chart;
pub mod insights;
pub mod search;

pub use api_client::{AirQualityApi, AqiClient, ClientError};
pub use base_url::{resolve_api_base, ApiBase};
pub use chart::ForecastChart;
pub use insights::{InsightsReport, InsightsView};
pub use search::{SearchController, SearchRejected, SearchResult, SearchState};
