#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unable to geocode city: {0}")]
    NotGeocoded(String),
    #[error("No PM2.5 data available near {0}")]
    NoData(String),
    #[error("Upstream rejected the API key")]
    Unauthorized,
    #[error("Upstream rate limit reached")]
    RateLimited,
    #[error("Unexpected upstream status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Failed to parse upstream payload: {0}")]
    ParseError(String),
}

impl ProviderError {
    /// User-facing explanation carried in a message-only reading
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::NotGeocoded(_) => "Unable to geocode the requested city.",
            ProviderError::NoData(_) => "No PM2.5 data available for this city.",
            ProviderError::Unauthorized => "Invalid OpenAQ API key.",
            ProviderError::RateLimited => "Rate limited by OpenAQ. Try again soon.",
            ProviderError::Request(_)
            | ProviderError::Status { .. }
            | ProviderError::ParseError(_) => "Upstream error from OpenAQ.",
        }
    }

    /// Errors that must abort a multi-location lookup instead of skipping one location
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Unauthorized | ProviderError::RateLimited)
    }
}
