use std::sync::{Arc, Mutex};
use std::time::Duration;

use cached::{Cached, TimedSizedCache};
use chrono::NaiveDate;

/// Cache key: normalised city plus the UTC day the value belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityDayKey(String);

impl CityDayKey {
    pub fn new(city: &str, day: NaiveDate) -> Self {
        Self(format!("{}:{}", city.trim().to_lowercase(), day))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Thread-safe cache bounded by entry count and time-to-live
///
/// Cloning shares the underlying store.
pub struct CityCache<V: Clone> {
    store: Arc<Mutex<TimedSizedCache<CityDayKey, V>>>,
}

impl<V: Clone> Clone for CityCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<V: Clone> CityCache<V> {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let store = TimedSizedCache::with_size_and_lifespan(max_entries.max(1), ttl.as_secs().max(1));
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn get(&self, key: &CityDayKey) -> Option<V> {
        self.store
            .lock()
            .ok()
            .and_then(|mut store| store.cache_get(key).cloned())
    }

    pub fn put(&self, key: CityDayKey, value: V) {
        if let Ok(mut store) = self.store.lock() {
            store.cache_set(key, value);
        }
    }

    pub fn invalidate(&self, key: &CityDayKey) {
        if let Ok(mut store) = self.store.lock() {
            store.cache_remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut store) = self.store.lock() {
            store.cache_clear();
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|s| s.cache_size()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
