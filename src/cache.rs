//! Fresh-Result Cache
//!
//! Short-TTL key/value store used to avoid redundant provider calls within
//! a refresh cycle. Keys are a stable composition of (operation,
//! parameters); values are raw JSON so any client response shape fits.
//! Concurrent get/set is safe; there are no transactional guarantees.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// TTL cache shared across concurrent provider fetches.
#[derive(Debug, Clone)]
pub struct FreshCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl FreshCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Stable key for (operation, parameters).
    fn cache_key(operation: &str, params: &str) -> String {
        format!("{}:{}", operation, params)
    }

    /// Get a fresh value, or `None` when absent or expired. Expired
    /// entries are left for `purge_expired`; staleness is decided here.
    pub async fn get(&self, operation: &str, params: &str) -> Option<Value> {
        let key = Self::cache_key(operation, params);
        let entries = self.entries.read().await;
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!("Cache hit for {}", key);
                Some(entry.value.clone())
            }
            _ => None,
        }
    }

    pub async fn set(&self, operation: &str, params: &str, value: Value, ttl: Duration) {
        let key = Self::cache_key(operation, params);
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop every expired entry. Called between cycles to keep the map
    /// from growing across long uptimes.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for FreshCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_cache_set_and_get() {
        let cache = FreshCache::new();
        cache
            .set("token_overview", "Mint1", json!({"price": 1.5}), Duration::from_secs(60))
            .await;

        let hit = cache.get("token_overview", "Mint1").await;
        assert_eq!(hit, Some(json!({"price": 1.5})));

        // Different params miss
        assert!(cache.get("token_overview", "Mint2").await.is_none());
        // Different operation misses too
        assert!(cache.get("holder_count", "Mint1").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let cache = FreshCache::new();
        cache
            .set("op", "p", json!(1), Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get("op", "p").await.is_none());
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 0);
    }
}
