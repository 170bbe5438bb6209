// OpenAqProvider against a mocked Nominatim + OpenAQ v3 server

use std::time::Duration;

use chrono::Utc;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use air_quality_service::models::{StationCoords, StationRef};
use air_quality_service::provider::{AirQualityProvider, OpenAqProvider};
use air_quality_service::provider_error::ProviderError;

const API_KEY: &str = "test-key";

fn create_test_provider(server: &ServerGuard) -> OpenAqProvider {
    OpenAqProvider::with_base_urls(
        format!("{}/v3", server.url()),
        format!("{}/geo/", server.url()),
        API_KEY.to_string(),
        "air-quality-tests/1.0".to_string(),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn recent(hours_ago: i64) -> String {
    (Utc::now() - chrono::Duration::hours(hours_ago)).to_rfc3339()
}

async fn mock_geocode_paris(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/geo/search")
        .match_query(Matcher::UrlEncoded("q".into(), "Paris".into()))
        .match_header("user-agent", "air-quality-tests/1.0")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([{
                "lat": "48.8566",
                "lon": "2.3522",
                "display_name": "Paris, Ile-de-France, France",
                "address": {"city": "Paris", "country": "France", "country_code": "fr"}
            }])
            .to_string(),
        )
        .create_async()
        .await
}

async fn mock_paris_location(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/v3/locations")
        .match_query(Matcher::Any)
        .match_header("x-api-key", API_KEY)
        .with_status(200)
        .with_body(
            json!({"results": [{
                "id": 101,
                "name": "Paris Centre",
                "coordinates": {"latitude": 48.86, "longitude": 2.35},
                "locality": "Paris",
                "country": {"code": "FR", "name": "France"}
            }]})
            .to_string(),
        )
        .create_async()
        .await
}

#[tokio::test]
async fn test_observe_uses_latest_sensor_value() {
    let mut server = Server::new_async().await;
    let geocode = mock_geocode_paris(&mut server).await;
    let locations = mock_paris_location(&mut server).await;
    let sensors = server
        .mock("GET", "/v3/locations/101/sensors")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({"results": [
                {
                    "id": 5001,
                    "parameter": {"id": 2, "units": "µg/m³"},
                    "latest": {
                        "value": 18.4,
                        "datetime": {"utc": recent(1)},
                        "coordinates": {"latitude": 48.861, "longitude": 2.351}
                    }
                },
                {
                    "id": 5002,
                    "parameter": {"id": 1, "units": "µg/m³"},
                    "latest": {"value": 99.0, "datetime": {"utc": recent(0)}}
                }
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let observation = create_test_provider(&server).observe("Paris").await.unwrap();

    assert_eq!(observation.pm25, 18.4);
    assert_eq!(observation.unit, "µg/m³");
    assert_eq!(observation.main_pollutant, "PM2_5");
    assert_eq!(observation.resolved.as_deref(), Some("Paris, Ile-de-France, France"));
    assert_eq!(
        observation.station,
        Some(StationRef::Coordinates(StationCoords {
            latitude: 48.861,
            longitude: 2.351
        }))
    );
    assert_eq!(observation.station_id, Some(101));
    assert_eq!(observation.sensor_id, Some(5001));
    assert_eq!(observation.country.as_deref(), Some("France"));
    assert_eq!(observation.country_code.as_deref(), Some("FR"));
    assert_eq!(observation.locality.as_deref(), Some("Paris"));
    let distance = observation.station_distance_meters.unwrap();
    assert!(distance > 0.0 && distance < 2_000.0, "distance {distance}");

    geocode.assert_async().await;
    locations.assert_async().await;
    sensors.assert_async().await;
}

#[tokio::test]
async fn test_stale_latest_falls_back_to_measurements() {
    let mut server = Server::new_async().await;
    mock_geocode_paris(&mut server).await;
    mock_paris_location(&mut server).await;
    server
        .mock("GET", "/v3/locations/101/sensors")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({"results": [{
                "id": 5001,
                "parameter": {"id": 2, "units": "µg/m³"},
                "latest": {"value": 40.0, "datetime": {"utc": "2019-01-01T00:00:00Z"}}
            }]})
            .to_string(),
        )
        .create_async()
        .await;
    let measurements = server
        .mock("GET", "/v3/sensors/5001/measurements")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({"results": [{
                "value": 9.5,
                "parameter": {"id": 2, "units": "µg/m³"},
                "period": {
                    "datetimeFrom": {"utc": recent(3)},
                    "datetimeTo": {"utc": recent(2)}
                }
            }]})
            .to_string(),
        )
        .create_async()
        .await;

    let observation = create_test_provider(&server).observe("Paris").await.unwrap();

    assert_eq!(observation.pm25, 9.5);
    assert_eq!(observation.sensor_id, Some(5001));
    assert_eq!(observation.station_id, Some(101));
    // No sensor coordinates, so the location's own position is used
    assert_eq!(
        observation.station,
        Some(StationRef::Coordinates(StationCoords {
            latitude: 48.86,
            longitude: 2.35
        }))
    );
    measurements.assert_async().await;
}

#[tokio::test]
async fn test_unknown_city_is_not_geocoded() {
    let mut server = Server::new_async().await;
    let geocode = server
        .mock("GET", "/geo/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let result = create_test_provider(&server).observe("Atlantis").await;

    assert!(matches!(result, Err(ProviderError::NotGeocoded(ref c)) if c == "Atlantis"));
    geocode.assert_async().await;
}

#[tokio::test]
async fn test_no_locations_widens_lookback_then_reports_no_data() {
    let mut server = Server::new_async().await;
    mock_geocode_paris(&mut server).await;
    let locations = server
        .mock("GET", "/v3/locations")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"results": []}"#)
        .expect(2)
        .create_async()
        .await;

    let err = create_test_provider(&server).observe("Paris").await.unwrap_err();

    assert!(matches!(err, ProviderError::NoData(_)));
    assert_eq!(err.user_message(), "No PM2.5 data available for this city.");
    locations.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_aborts_lookup() {
    let mut server = Server::new_async().await;
    mock_geocode_paris(&mut server).await;
    let locations = server
        .mock("GET", "/v3/locations")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"detail": "Invalid credentials"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = create_test_provider(&server).observe("Paris").await.unwrap_err();

    assert!(matches!(err, ProviderError::Unauthorized));
    assert_eq!(err.user_message(), "Invalid OpenAQ API key.");
    locations.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_is_fatal() {
    let mut server = Server::new_async().await;
    mock_geocode_paris(&mut server).await;
    mock_paris_location(&mut server).await;
    server
        .mock("GET", "/v3/locations/101/sensors")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let err = create_test_provider(&server).observe("Paris").await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_sensor_listing_failure_is_skipped() {
    let mut server = Server::new_async().await;
    mock_geocode_paris(&mut server).await;
    mock_paris_location(&mut server).await;
    server
        .mock("GET", "/v3/locations/101/sensors")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let err = create_test_provider(&server).observe("Paris").await.unwrap_err();
    assert!(matches!(err, ProviderError::NoData(_)));
}
