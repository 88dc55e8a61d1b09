//! Key-value cache for derived counts.
//!
//! Stores use this to memoize group counts so repeated dashboard reads do
//! not rescan tables. Entries expire by TTL; a missing or expired key just
//! means recompute.

use async_trait::async_trait;
use atrium_core::error::StorageError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Bump an integer counter. A missing or expired key restarts at 1 with
    /// a fresh TTL; a live one keeps its remaining TTL.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, StorageError>;
}

pub type SharedCache = Arc<dyn KeyValueCache>;

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedCache {
        Arc::new(self)
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        let now = Instant::now();
        let (next, expires) = match entries.get(key) {
            Some((value, expires)) if *expires > now => {
                // a live counter keeps its original expiry
                (value.as_i64().unwrap_or(0) + 1, *expires)
            }
            _ => (1, now + ttl),
        };
        entries.insert(key.to_string(), (Value::from(next), expires));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache
            .set("counts", json!({"a": 1}), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("counts").await.unwrap(), Some(json!({"a": 1})));
        cache.delete("counts").await.unwrap();
        assert_eq!(cache.get("counts").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_counts_and_restarts_after_expiry() {
        let cache = MemoryCache::new();
        assert_eq!(
            cache.increment("hits", Duration::from_secs(60)).await.unwrap(),
            1
        );
        assert_eq!(
            cache.increment("hits", Duration::from_secs(60)).await.unwrap(),
            2
        );
        cache
            .set("hits", json!(99), Duration::from_secs(0))
            .await
            .unwrap();
        assert_eq!(
            cache.increment("hits", Duration::from_secs(60)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache
            .set("counts", json!(1), Duration::from_secs(0))
            .await
            .unwrap();
        assert_eq!(cache.get("counts").await.unwrap(), None);
    }
}
