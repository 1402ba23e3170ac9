use crate::clock::SharedClock;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub fetched_at: DateTime<Utc>,
}

/// In-memory cache whose entries go stale `ttl` after they were fetched.
///
/// Freshness is judged against the entry timestamp on every read. A stale entry
/// is not removed; it reads as a miss and is overwritten by the next `put` for
/// the same key. Total size is bounded by `max_capacity`.
#[derive(Clone)]
pub struct TimedCache<T> {
    name: &'static str,
    entries: Cache<String, CacheEntry<T>>,
    ttl: Duration,
    clock: SharedClock,
}

/// Lower-cases and trims a natural-language key so lookups are case-insensitive.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

impl<T> TimedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration, max_capacity: u64, clock: SharedClock) -> Self {
        Self {
            name,
            entries: Cache::builder().max_capacity(max_capacity).build(),
            ttl,
            clock,
        }
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let key = normalize_key(key);
        let entry = self.entries.get(&key).await?;

        if self.is_fresh(&entry) {
            tracing::debug!(cache = self.name, key = %key, "cache hit");
            Some(entry.payload)
        } else {
            tracing::debug!(cache = self.name, key = %key, "cache entry stale");
            None
        }
    }

    pub async fn put(&self, key: &str, value: T) {
        let entry = CacheEntry {
            payload: value,
            fetched_at: self.clock.now(),
        };
        self.entries.insert(normalize_key(key), entry).await;
    }

    /// True if an entry is stored for `key`, fresh or not.
    #[cfg(test)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize_key(key))
    }

    fn is_fresh(&self, entry: &CacheEntry<T>) -> bool {
        // Entries stamped in the future (clock moved backwards) count as just fetched.
        let age = (self.clock.now() - entry.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age < self.ttl
    }
}
