use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, OpenApi};

use crate::bands::Band;
use crate::cache::CityCache;
use crate::forecast::{ForecastPoint, HistoryPoint};
use crate::models::{
    Advice, AqiReading, ForecastResponse, HealthResponse, MessageResponse, StationCoords,
    StationRef,
};
use crate::services::{AdviceService, AqiService, ForecastService, ServiceError};

#[derive(Clone)]
pub struct AppState {
    pub aqi_service: AqiService,
    pub advice_service: AdviceService,
    pub forecast_service: ForecastService,
}

impl AppState {
    pub fn new(aqi_service: AqiService, forecast_cache: CityCache<ForecastResponse>) -> Self {
        Self {
            advice_service: AdviceService::new(aqi_service.clone()),
            forecast_service: ForecastService::new(aqi_service.clone(), forecast_cache),
            aqi_service,
        }
    }
}

/// `?city=`; any other parameter (such as the `_ts` cache buster) is ignored
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CityQuery {
    /// City name to look up
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdviceQuery {
    /// City name to look up
    pub city: Option<String>,
    /// Request the stricter advice used for asthma
    #[serde(default)]
    pub asthma: bool,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, get_aqi, get_advice, get_forecast),
    components(schemas(
        AqiReading,
        Advice,
        ForecastResponse,
        ForecastPoint,
        HistoryPoint,
        Band,
        StationRef,
        StationCoords,
        HealthResponse,
        MessageResponse
    )),
    tags((name = "air-quality", description = "City air quality readings, advice and forecasts"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/aqi", get(get_aqi))
        .route("/advice", get(get_advice))
        .route("/forecast", get(get_forecast))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (
        status,
        Json(MessageResponse {
            message: text.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::BlankCity => message(StatusCode::BAD_REQUEST, self.to_string()),
            ServiceError::NoData(text) => message(StatusCode::NOT_FOUND, text),
        }
    }
}

fn required_city(city: Option<String>) -> Result<String, ServiceError> {
    city.map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(ServiceError::BlankCity)
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "air-quality",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument]
async fn health() -> impl IntoResponse {
    debug!("Health check requested");
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/aqi",
    tag = "air-quality",
    params(CityQuery),
    responses(
        (status = 200, description = "Current reading for the city", body = AqiReading),
        (status = 400, description = "City missing or blank", body = MessageResponse),
        (status = 404, description = "No data for the city", body = AqiReading)
    )
)]
#[instrument(skip(state))]
async fn get_aqi(State(state): State<AppState>, Query(query): Query<CityQuery>) -> Response {
    let city = match required_city(query.city) {
        Ok(city) => city,
        Err(e) => return e.into_response(),
    };

    let reading = match state.aqi_service.fetch_by_city(&city).await {
        Ok(reading) => reading,
        Err(e) => return e.into_response(),
    };

    let status = if reading.message.is_some() {
        warn!("No reading for {}: {:?}", city, reading.message);
        StatusCode::NOT_FOUND
    } else {
        info!("Serving AQI {:?} for {}", reading.aqi, city);
        StatusCode::OK
    };

    (status, [(header::CACHE_CONTROL, "no-store")], Json(reading)).into_response()
}

#[utoipa::path(
    get,
    path = "/api/advice",
    tag = "air-quality",
    params(AdviceQuery),
    responses(
        (status = 200, description = "Health advice for the city", body = Advice),
        (status = 400, description = "City missing or blank", body = MessageResponse),
        (status = 404, description = "No data for the city", body = MessageResponse)
    )
)]
#[instrument(skip(state))]
async fn get_advice(
    State(state): State<AppState>,
    Query(query): Query<AdviceQuery>,
) -> Result<Json<Advice>, ServiceError> {
    let city = required_city(query.city)?;
    let advice = state
        .advice_service
        .advise(&city, query.asthma)
        .await
        .inspect_err(|e| warn!("Advice for {} unavailable: {}", city, e))?;

    info!("Serving {} advice for {} (asthma={})", advice.band, city, query.asthma);
    Ok(Json(advice))
}

#[utoipa::path(
    get,
    path = "/api/forecast",
    tag = "air-quality",
    params(CityQuery),
    responses(
        (status = 200, description = "Three-day forecast for the city", body = ForecastResponse),
        (status = 400, description = "City missing or blank", body = MessageResponse),
        (status = 404, description = "No data for the city", body = MessageResponse)
    )
)]
#[instrument(skip(state))]
async fn get_forecast(
    State(state): State<AppState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<ForecastResponse>, ServiceError> {
    let city = required_city(query.city)?;
    let forecast = state
        .forecast_service
        .forecast(&city)
        .await
        .inspect_err(|e| warn!("Forecast for {} unavailable: {}", city, e))?;

    debug!("Forecast for {}: {:?}", city, forecast.points);
    Ok(Json(forecast))
}
