pub mod advice_service;
pub mod aqi_service;
pub mod forecast_service;

pub use advice_service::AdviceService;
pub use aqi_service::AqiService;
pub use forecast_service::ForecastService;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("City is required.")]
    BlankCity,
    #[error("{0}")]
    NoData(String),
}
