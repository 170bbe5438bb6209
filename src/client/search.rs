use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, instrument, warn};

use super::api_client::{AirQualityApi, ClientError};
use crate::models::{Advice, AqiReading};

pub const BLANK_CITY_MESSAGE: &str = "Please enter a city name.";
pub const FETCH_FAILED_MESSAGE: &str =
    "Unable to fetch air quality right now. Try again in a moment.";

/// A submission rejected before any request was made
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Please enter a city name.")]
pub struct SearchRejected;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub city: String,
    pub asthma: bool,
    pub reading: AqiReading,
    /// Absent when the reading carried no data
    pub advice: Option<Advice>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Loading {
        city: String,
        asthma: bool,
    },
    Success(SearchResult),
    Error {
        city: String,
        message: String,
    },
}

impl SearchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SearchState::Loading { .. })
    }

    /// Whether a request has finished, successfully or not
    pub fn is_settled(&self) -> bool {
        matches!(self, SearchState::Success(_) | SearchState::Error { .. })
    }
}

/// Drives a single search at a time; a newer submission supersedes any
/// request still in flight.
pub struct SearchController<A: AirQualityApi> {
    api: Arc<A>,
    state: Arc<watch::Sender<SearchState>>,
    generation: Arc<AtomicU64>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl<A: AirQualityApi> SearchController<A> {
    pub fn new(api: A) -> Self {
        Self::with_shared(Arc::new(api))
    }

    pub fn with_shared(api: Arc<A>) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            api,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Start a search for `city`. Must be called inside a tokio runtime.
    ///
    /// Blank input is rejected without touching the state.
    #[instrument(skip(self))]
    pub fn submit(&self, city: &str, asthma: bool) -> Result<(), SearchRejected> {
        let city = city.trim();
        if city.is_empty() {
            debug!("Rejected blank search");
            return Err(SearchRejected);
        }
        let city = city.to_string();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_in_flight();
        self.state.send_replace(SearchState::Loading {
            city: city.clone(),
            asthma,
        });

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);

        let task = tokio::spawn(async move {
            let next = match run_search(api.as_ref(), &city, asthma).await {
                Ok(result) => SearchState::Success(result),
                Err(e) => {
                    warn!("Search for {} failed: {}", city, e);
                    SearchState::Error {
                        city,
                        message: FETCH_FAILED_MESSAGE.to_string(),
                    }
                }
            };

            // Checked under the channel lock so a newer submission always wins
            state.send_if_modified(|slot| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *slot = next;
                true
            });
        });

        if let Ok(mut in_flight) = self.in_flight.lock() {
            *in_flight = Some(task.abort_handle());
        }
        Ok(())
    }

    /// Abandon any in-flight request and return to idle
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_in_flight();
        self.state.send_replace(SearchState::Idle);
    }

    fn abort_in_flight(&self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if let Some(handle) = in_flight.take() {
                handle.abort();
            }
        }
    }
}

impl<A: AirQualityApi> Drop for SearchController<A> {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}

async fn run_search<A: AirQualityApi>(
    api: &A,
    city: &str,
    asthma: bool,
) -> Result<SearchResult, ClientError> {
    let reading = api.get_aqi(city).await?;
    let advice = if reading.has_data() {
        Some(api.get_advice(city, asthma).await?)
    } else {
        debug!("No data for {}, skipping advice", city);
        None
    };

    Ok(SearchResult {
        city: city.to_string(),
        asthma,
        reading,
        advice,
    })
}
