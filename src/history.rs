use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cached::{Cached, TimedSizedCache};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::forecast::HistoryPoint;
use crate::provider::synthetic::Jitter;

/// Number of points kept per city and returned with a reading
pub const HISTORY_LEN: usize = 24;

/// Cities tracked at once when no limit is configured
pub const DEFAULT_MAX_CITIES: usize = 500;

/// A city with no new point for this long is forgotten
pub const HISTORY_TTL: std::time::Duration = std::time::Duration::from_secs(48 * 60 * 60);

const SYNTHETIC_FLOOR: i32 = 5;
const SYNTHETIC_CEILING: i32 = 400;

fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

fn bounded(value: i32) -> i32 {
    value.clamp(SYNTHETIC_FLOOR, SYNTHETIC_CEILING)
}

/// In-memory per-city log of observed AQI values
///
/// At most `max_cities` series are kept; recording for a new city beyond
/// that evicts the least recently updated one.
#[derive(Clone)]
pub struct ReadingHistory {
    points: Arc<Mutex<TimedSizedCache<String, VecDeque<HistoryPoint>>>>,
}

impl Default for ReadingHistory {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_CITIES, HISTORY_TTL)
    }
}

impl ReadingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_cities: usize, ttl: std::time::Duration) -> Self {
        let store = TimedSizedCache::with_size_and_lifespan(max_cities.max(1), ttl.as_secs().max(1));
        Self {
            points: Arc::new(Mutex::new(store)),
        }
    }

    /// Append an observation, dropping the oldest beyond [`HISTORY_LEN`]
    pub fn record(&self, city: &str, at: DateTime<Utc>, aqi: i32) {
        let Ok(mut points) = self.points.lock() else {
            warn!("Reading history lock poisoned, dropping point for {}", city);
            return;
        };
        let key = normalize_city(city);
        // Re-inserting refreshes both the lifespan and the eviction order
        let mut series = points.cache_remove(&key).unwrap_or_default();
        series.push_back(HistoryPoint::new(at, f64::from(aqi)));
        while series.len() > HISTORY_LEN {
            series.pop_front();
        }
        points.cache_set(key, series);
    }

    /// Recorded points for a city, oldest first
    pub fn recent(&self, city: &str) -> Vec<HistoryPoint> {
        let Ok(mut points) = self.points.lock() else {
            return Vec::new();
        };
        let mut series: Vec<HistoryPoint> = points
            .cache_get(&normalize_city(city))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        series.sort_by_key(|p| p.timestamp);
        series
    }

    pub fn len(&self, city: &str) -> usize {
        self.points
            .lock()
            .map(|mut p| p.cache_get(&normalize_city(city)).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, city: &str) -> bool {
        self.len(city) == 0
    }

    /// Number of cities currently holding a series
    pub fn cities(&self) -> usize {
        self.points.lock().map(|p| p.cache_size()).unwrap_or(0)
    }
}

/// Build the history sent with a reading.
///
/// Stored points are kept as-is (latest 24). When `synthesize` is set the
/// series is padded to 24 hourly points: with nothing stored, 23 jittered
/// points lead up to `latest`; otherwise filler drifting down by up to 4 per
/// hour is prepended before the oldest stored point.
pub fn build_history(
    city: &str,
    stored: Vec<HistoryPoint>,
    now: DateTime<Utc>,
    latest: i32,
    synthesize: bool,
) -> Vec<HistoryPoint> {
    let mut stored = stored;
    stored.sort_by_key(|p| p.timestamp);
    if stored.len() > HISTORY_LEN {
        stored.drain(..stored.len() - HISTORY_LEN);
    }

    if !synthesize || stored.len() >= HISTORY_LEN {
        return stored;
    }

    let mut jitter = Jitter::seeded((normalize_city(city), now.timestamp()));

    if stored.is_empty() {
        debug!("No stored history for {}, generating {} points", city, HISTORY_LEN);
        let mut history = Vec::with_capacity(HISTORY_LEN);
        let mut current = latest;
        for hours_ago in (1..HISTORY_LEN as i64).rev() {
            current = bounded(current + jitter.between(-5, 5));
            history.push(HistoryPoint::new(
                now - Duration::hours(hours_ago),
                f64::from(current),
            ));
        }
        history.push(HistoryPoint::new(now, f64::from(latest)));
        return history;
    }

    let needed = HISTORY_LEN - stored.len();
    debug!("Padding history for {} with {} synthetic points", city, needed);
    let oldest = &stored[0];
    let mut cursor = oldest.timestamp;
    let mut current = oldest.aqi.round() as i32;
    let mut filler = VecDeque::with_capacity(HISTORY_LEN);
    for _ in 0..needed {
        cursor -= Duration::hours(1);
        current = bounded(current + jitter.between(-4, 0));
        filler.push_front(HistoryPoint::new(cursor, f64::from(current)));
    }

    filler.into_iter().chain(stored).collect()
}
