//! Persistent geocode cache keyed by ~1 km coordinate buckets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::db::{get_json, set_json, KeyValueStore};

/// Key the cache is persisted under.
pub const GEOCODE_CACHE_KEY: &str = "geocode_cache";

/// Round to two decimals, halves rounding up.
fn round_coordinate(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Cache key for a coordinate pair, e.g. `"52.23,21.01"`.
pub fn bucket_key(lat: f64, lon: f64) -> String {
    format!("{},{}", round_coordinate(lat), round_coordinate(lon))
}

/// Bucket → place name. Only successful lookups are ever stored.
pub struct GeocodeCache {
    kv: Arc<dyn KeyValueStore>,
    entries: Mutex<HashMap<String, String>>,
}

impl GeocodeCache {
    /// Load the persisted cache; an unreadable blob starts empty.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let entries = match get_json::<HashMap<String, String>>(kv.as_ref(), GEOCODE_CACHE_KEY) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(error) => {
                tracing::warn!("Discarding unreadable geocode cache: {}", error);
                HashMap::new()
            }
        };
        Self {
            kv,
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: &str, name: &str) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.insert(key.to_string(), name.to_string());
        if let Err(error) = set_json(self.kv.as_ref(), GEOCODE_CACHE_KEY, &*entries) {
            tracing::warn!("Failed to persist geocode cache: {}", error);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
        if let Err(error) = self.kv.remove(GEOCODE_CACHE_KEY) {
            tracing::warn!("Failed to clear geocode cache: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKeyValueStore;

    #[test]
    fn bucket_key_rounds_to_two_decimals() {
        assert_eq!(bucket_key(52.22970, 21.01220), "52.23,21.01");
        assert_eq!(bucket_key(52.2251, 21.0149), "52.23,21.01");
        assert_eq!(bucket_key(-33.8688, 151.2093), "-33.87,151.21");
        assert_eq!(bucket_key(10.0, -0.001), "10,0");
    }

    #[test]
    fn cache_persists_through_store() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let cache = GeocodeCache::load(Arc::clone(&kv));
        cache.insert("52.23,21.01", "Warsaw, Poland");

        let reloaded = GeocodeCache::load(Arc::clone(&kv));
        assert_eq!(reloaded.get("52.23,21.01").as_deref(), Some("Warsaw, Poland"));

        reloaded.clear();
        assert!(reloaded.is_empty());
        assert!(GeocodeCache::load(kv).is_empty());
    }

    #[test]
    fn corrupt_cache_starts_empty() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        kv.set(GEOCODE_CACHE_KEY, "[1, 2").unwrap();
        assert!(GeocodeCache::load(kv).is_empty());
    }
}
