// SearchController state transitions against an in-memory API

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use air_quality_service::bands::Band;
use air_quality_service::client::search::FETCH_FAILED_MESSAGE;
use air_quality_service::client::{
    AirQualityApi, ClientError, InsightsView, SearchController, SearchRejected, SearchState,
};
use air_quality_service::models::{Advice, AqiReading};

/// "Paris" has data, "Nowhere" has none, "Broken" fails and "Slow" waits for `release`.
/// "Stuck" blocks its worker thread until `unblock` is set, so it cannot be aborted.
#[derive(Default)]
struct FakeApi {
    release: Notify,
    unblock: AtomicBool,
    aqi_calls: AtomicUsize,
    advice_calls: AtomicUsize,
}

impl FakeApi {
    fn aqi_calls(&self) -> usize {
        self.aqi_calls.load(Ordering::SeqCst)
    }

    fn advice_calls(&self) -> usize {
        self.advice_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AirQualityApi for FakeApi {
    async fn get_aqi(&self, city: &str) -> Result<AqiReading, ClientError> {
        self.aqi_calls.fetch_add(1, Ordering::SeqCst);
        match city {
            "Nowhere" => Ok(AqiReading::message("No PM2.5 data available for this city.")),
            "Broken" => Err(ClientError::Status {
                status: 500,
                url: "http://localhost:8080/api/aqi".to_string(),
            }),
            _ => {
                if city == "Slow" {
                    self.release.notified().await;
                }
                if city == "Stuck" {
                    while !self.unblock.load(Ordering::SeqCst) {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                }
                Ok(AqiReading {
                    city: Some(city.to_string()),
                    aqi: Some(80),
                    band: Some(Band::Moderate),
                    pm25: Some(26.0),
                    ..Default::default()
                })
            }
        }
    }

    async fn get_advice(&self, city: &str, asthma: bool) -> Result<Advice, ClientError> {
        self.advice_calls.fetch_add(1, Ordering::SeqCst);
        let band = if asthma { Band::Moderate.stricter() } else { Band::Moderate };
        Ok(Advice {
            city: city.to_string(),
            aqi: 80,
            band: Band::Moderate,
            public_advice: band.public_advice().to_string(),
            sensitive_advice: band.sensitive_advice().to_string(),
            pollutant_note: "note".to_string(),
        })
    }
}

fn controller() -> (Arc<FakeApi>, SearchController<FakeApi>) {
    let api = Arc::new(FakeApi::default());
    let controller = SearchController::with_shared(Arc::clone(&api));
    (api, controller)
}

async fn settled(controller: &SearchController<FakeApi>) -> SearchState {
    let mut updates = controller.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), updates.wait_for(SearchState::is_settled))
        .await
        .expect("search did not settle")
        .unwrap()
        .clone();
    state
}

#[tokio::test]
async fn test_blank_city_is_rejected_without_request() {
    let (api, controller) = controller();

    assert_eq!(controller.submit("   ", false), Err(SearchRejected));
    assert_eq!(controller.state(), SearchState::Idle);

    tokio::task::yield_now().await;
    assert_eq!(api.aqi_calls(), 0);
}

#[tokio::test]
async fn test_submit_publishes_loading_then_success() {
    let (api, controller) = controller();

    controller.submit(" Paris ", true).unwrap();
    assert_eq!(
        controller.state(),
        SearchState::Loading {
            city: "Paris".to_string(),
            asthma: true
        }
    );
    assert_eq!(
        InsightsView::build(&controller.state(), true, Utc::now()),
        InsightsView::Loading
    );

    let SearchState::Success(result) = settled(&controller).await else {
        panic!("expected success");
    };
    assert_eq!(result.city, "Paris");
    assert!(result.asthma);
    assert_eq!(result.reading.aqi, Some(80));
    let advice = result.advice.unwrap();
    assert_eq!(advice.public_advice, Band::UnhealthyForSensitiveGroups.public_advice());
    assert_eq!(api.aqi_calls(), 1);
    assert_eq!(api.advice_calls(), 1);
}

#[tokio::test]
async fn test_no_data_skips_advice() {
    let (api, controller) = controller();

    controller.submit("Nowhere", false).unwrap();
    let state = settled(&controller).await;

    let SearchState::Success(result) = &state else {
        panic!("expected success, got {state:?}");
    };
    assert!(result.advice.is_none());
    assert_eq!(api.advice_calls(), 0);
    assert_eq!(
        InsightsView::build(&state, true, Utc::now()),
        InsightsView::NoData("No PM2.5 data available for this city.".to_string())
    );
}

#[tokio::test]
async fn test_failure_sets_generic_error() {
    let (_api, controller) = controller();

    controller.submit("Broken", false).unwrap();
    let state = settled(&controller).await;

    assert_eq!(
        state,
        SearchState::Error {
            city: "Broken".to_string(),
            message: FETCH_FAILED_MESSAGE.to_string()
        }
    );
    assert_eq!(
        InsightsView::build(&state, true, Utc::now()).to_string().trim(),
        FETCH_FAILED_MESSAGE
    );
}

#[tokio::test]
async fn test_latest_submission_wins() {
    let (api, controller) = controller();

    controller.submit("Slow", false).unwrap();
    // Let the slow request reach its gate before superseding it
    while api.aqi_calls() == 0 {
        tokio::task::yield_now().await;
    }
    controller.submit("Paris", false).unwrap();

    let SearchState::Success(result) = settled(&controller).await else {
        panic!("expected success");
    };
    assert_eq!(result.city, "Paris");

    api.release.notify_waiters();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let SearchState::Success(result) = controller.state() else {
        panic!("expected success to remain");
    };
    assert_eq!(result.city, "Paris");
    assert_eq!(api.advice_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_superseded_result_is_discarded_after_completing() {
    let (api, controller) = controller();

    controller.submit("Stuck", false).unwrap();
    while api.aqi_calls() == 0 {
        tokio::task::yield_now().await;
    }
    controller.submit("Paris", false).unwrap();

    let SearchState::Success(result) = settled(&controller).await else {
        panic!("expected success");
    };
    assert_eq!(result.city, "Paris");

    // The stuck task never yields, so the abort cannot stop it from finishing
    api.unblock.store(true, Ordering::SeqCst);
    tokio::time::timeout(Duration::from_secs(5), async {
        while api.advice_calls() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("stuck search did not finish");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let SearchState::Success(result) = controller.state() else {
        panic!("expected success to remain");
    };
    assert_eq!(result.city, "Paris");
}

#[tokio::test]
async fn test_cancel_returns_to_idle() {
    let (api, controller) = controller();

    controller.submit("Slow", false).unwrap();
    while api.aqi_calls() == 0 {
        tokio::task::yield_now().await;
    }
    controller.cancel();
    assert_eq!(controller.state(), SearchState::Idle);

    api.release.notify_waiters();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(controller.state(), SearchState::Idle);
    assert_eq!(api.advice_calls(), 0);
}
