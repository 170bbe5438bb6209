use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bands::Band;

/// Number of forward-looking days produced by [`extrapolate`]
pub const FORECAST_DAYS: usize = 3;

/// How many of the most recent valid history points feed the slope
const HISTORY_WINDOW: usize = 6;

const MIN_PROJECTED_AQI: f64 = 5.0;
const MAX_PROJECTED_AQI: f64 = 350.0;

/// A past (timestamp, AQI) observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub aqi: f64,
}

impl HistoryPoint {
    pub fn new(timestamp: DateTime<Utc>, aqi: f64) -> Self {
        Self { timestamp, aqi }
    }
}

/// A projected AQI for a future day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub day_offset: u32,
    pub aqi: i32,
    pub band: Band,
}

/// Project the next three days from the current AQI and recent history.
///
/// `history` must be ordered oldest first. Non-finite points are skipped.
/// The earliest of the last six valid points is the reference; with no
/// history the current AQI references itself and the slope is zero.
///
/// This is a display heuristic: the result is deterministic for identical
/// inputs and every value lies in `[5, 350]`.
pub fn extrapolate(current: i32, history: &[HistoryPoint]) -> [ForecastPoint; FORECAST_DAYS] {
    let valid: Vec<f64> = history
        .iter()
        .map(|point| point.aqi)
        .filter(|aqi| aqi.is_finite())
        .collect();
    let window = &valid[valid.len().saturating_sub(HISTORY_WINDOW)..];

    let current = f64::from(current);
    let reference = window.first().copied().unwrap_or(current);
    let span = window.len().saturating_sub(1).max(1) as f64;
    let slope = (current - reference) / span;

    std::array::from_fn(|index| {
        let day = (index + 1) as u32;
        let d = f64::from(day);
        let projected = (current + slope * d * 2.0 + d * 5.0)
            .round()
            .clamp(MIN_PROJECTED_AQI, MAX_PROJECTED_AQI) as i32;
        ForecastPoint {
            day_offset: day,
            aqi: projected,
            band: Band::from_aqi(projected),
        }
    })
}
