//! In-memory cache implementation using the moka crate.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tracing::debug;

use kite_core::config::cache::MemoryCacheConfig;
use kite_core::result::AppResult;
use kite_core::traits::cache::CacheProvider;

/// Expired hashes are purged once every this many hash writes.
const HASH_PURGE_INTERVAL: u64 = 256;

/// A cached string together with the TTL it was written with.
#[derive(Debug, Clone)]
struct CachedValue {
    value: String,
    ttl: Duration,
}

/// Fields of one hash and the instant it expires, if any.
#[derive(Debug, Default)]
struct CachedHash {
    fields: HashMap<String, String>,
    expires_at: Option<Instant>,
}

impl CachedHash {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Expiry policy that honours the TTL stored on each entry.
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache provider using moka.
///
/// Suitable for single-node deployments and tests. Hashes live in a
/// separate dashmap; each carries its own deadline, checked on read.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: Cache<String, CachedValue>,
    /// Hash values, mutated field by field under the shard lock.
    hashes: Arc<DashMap<String, CachedHash>>,
    /// Hash writes since start, drives the periodic purge.
    hash_writes: Arc<AtomicU64>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            hashes: Arc::new(DashMap::new()),
            hash_writes: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn insert(&self, key: &str, value: &str, ttl: Duration) {
        self.cache
            .insert(
                key.to_string(),
                CachedValue {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
    }

    /// Whether a live hash is stored at `key`. Drops it when expired.
    fn hash_exists(&self, key: &str) -> bool {
        let now = Instant::now();
        self.hashes.remove_if(key, |_, hash| !hash.is_live(now));
        self.hashes.contains_key(key)
    }

    fn purge_expired_hashes(&self) {
        let now = Instant::now();
        let before = self.hashes.len();
        self.hashes.retain(|_, hash| hash.is_live(now));
        let purged = before.saturating_sub(self.hashes.len());
        if purged > 0 {
            debug!(purged, "Purged expired hashes");
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.insert(key, value, ttl).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        self.hashes.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.contains_key(key) || self.hash_exists(key))
    }

    async fn take(&self, key: &str) -> AppResult<Option<String>> {
        // moka's remove hands the value to exactly one caller.
        Ok(self.cache.remove(key).await.map(|entry| entry.value))
    }

    async fn take_if_eq(&self, key: &str, expected: &str) -> AppResult<bool> {
        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().value == expected => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::Removed(_)))
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let entry = self
            .cache
            .entry(key.to_string())
            .or_insert_with(async {
                CachedValue {
                    value: value.to_string(),
                    ttl,
                }
            })
            .await;
        Ok(entry.is_fresh())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        // Re-inserting resets the per-entry TTL.
        if let Some(existing) = self.cache.get(key).await {
            self.insert(key, &existing.value, ttl).await;
            return Ok(true);
        }

        let now = Instant::now();
        match self.hashes.get_mut(key) {
            Some(mut hash) if hash.is_live(now) => {
                hash.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> AppResult<()> {
        let now = Instant::now();
        {
            let mut hash = self.hashes.entry(key.to_string()).or_default();
            if !hash.is_live(now) {
                *hash = CachedHash::default();
            }
            hash.fields.insert(field.to_string(), value.to_string());
        }

        if self.hash_writes.fetch_add(1, Ordering::Relaxed) % HASH_PURGE_INTERVAL
            == HASH_PURGE_INTERVAL - 1
        {
            self.purge_expired_hashes();
        }
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> AppResult<bool> {
        let now = Instant::now();
        let removed = match self.hashes.get_mut(key) {
            Some(mut hash) if hash.is_live(now) => hash.fields.remove(field).is_some(),
            _ => false,
        };
        self.hashes
            .remove_if(key, |_, hash| hash.fields.is_empty() || !hash.is_live(now));
        Ok(removed)
    }

    async fn hash_get_all(&self, key: &str) -> AppResult<HashMap<String, String>> {
        let now = Instant::now();
        Ok(self
            .hashes
            .get(key)
            .filter(|hash| hash.is_live(now))
            .map(|hash| hash.fields.clone())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_core::config::cache::MemoryCacheConfig;

    fn make_provider() -> MemoryCacheProvider {
        let config = MemoryCacheConfig { max_capacity: 1000 };
        MemoryCacheProvider::new(&config)
    }

    #[tokio::test]
    async fn test_set_get() {
        let provider = make_provider();
        provider
            .set("key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();
        let val = provider.get("key1").await.unwrap();
        assert_eq!(val, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let provider = make_provider();
        provider
            .set("key2", "value2", Duration::from_secs(60))
            .await
            .unwrap();
        provider.delete("key2").await.unwrap();
        let val = provider.get("key2").await.unwrap();
        assert_eq!(val, None);
    }

    #[tokio::test]
    async fn test_per_entry_ttl() {
        let provider = make_provider();
        provider
            .set("short", "v", Duration::from_millis(50))
            .await
            .unwrap();
        provider
            .set("long", "v", Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(provider.get("short").await.unwrap(), None);
        assert_eq!(provider.get("long").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_set_nx() {
        let provider = make_provider();
        let first = provider
            .set_nx("nx_key", "val", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(first);
        let second = provider
            .set_nx("nx_key", "val2", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!second);
        assert_eq!(provider.get("nx_key").await.unwrap(), Some("val".to_string()));
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let provider = make_provider();
        provider
            .set("once", "token", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(provider.take("once").await.unwrap(), Some("token".to_string()));
        assert_eq!(provider.take("once").await.unwrap(), None);
        assert_eq!(provider.get("once").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_take_has_one_winner() {
        let provider = make_provider();
        provider
            .set("contended", "token", Duration::from_secs(60))
            .await
            .unwrap();

        let attempts = (0..16).map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.take("contended").await.unwrap() })
        });
        let results = futures::future::join_all(attempts).await;

        let winners = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(Option::is_some)
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_hash_operations() {
        let provider = make_provider();
        provider.hash_set("idx", "a", "1").await.unwrap();
        provider.hash_set("idx", "b", "2").await.unwrap();

        let all = provider.hash_get_all("idx").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("a"), Some(&"1".to_string()));

        assert!(provider.hash_delete("idx", "a").await.unwrap());
        assert!(!provider.hash_delete("idx", "a").await.unwrap());
        assert!(provider.hash_delete("idx", "b").await.unwrap());

        assert!(provider.hash_get_all("idx").await.unwrap().is_empty());
        assert!(!provider.exists("idx").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_hash_disappears() {
        let provider = make_provider();
        provider.hash_set("session:index:9", "a", "1").await.unwrap();
        provider.hash_set("session:index:8", "b", "2").await.unwrap();

        assert!(provider
            .expire("session:index:9", Duration::from_millis(20))
            .await
            .unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!provider.exists("session:index:9").await.unwrap());
        assert!(provider.hash_get_all("session:index:9").await.unwrap().is_empty());
        assert!(!provider.hash_delete("session:index:9", "a").await.unwrap());
        assert!(provider.exists("session:index:8").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_after_expiry_starts_a_fresh_hash() {
        let provider = make_provider();
        provider.hash_set("idx", "old", "1").await.unwrap();
        provider
            .expire("idx", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        provider.hash_set("idx", "new", "2").await.unwrap();
        let all = provider.hash_get_all("idx").await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("new"));
    }

    #[tokio::test]
    async fn test_purge_drops_expired_hashes() {
        let provider = make_provider();
        for user in 0..10 {
            let key = format!("idx:{user}");
            provider.hash_set(&key, "a", "1").await.unwrap();
            provider
                .expire(&key, Duration::from_millis(10))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        for n in 0..HASH_PURGE_INTERVAL {
            provider.hash_set("live", &n.to_string(), "1").await.unwrap();
        }
        assert_eq!(provider.hashes.len(), 1);
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let provider = make_provider();
        assert!(!provider
            .expire("nothing", Duration::from_secs(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_take_if_eq_leaves_other_values() {
        let provider = make_provider();
        provider
            .set("code", "abc", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!provider.take_if_eq("code", "xyz").await.unwrap());
        assert_eq!(provider.get("code").await.unwrap(), Some("abc".to_string()));

        assert!(provider.take_if_eq("code", "abc").await.unwrap());
        assert!(!provider.take_if_eq("code", "abc").await.unwrap());
        assert!(!provider.take_if_eq("absent", "abc").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_take_if_eq_has_one_winner() {
        let provider = make_provider();
        provider
            .set("contended", "abc", Duration::from_secs(60))
            .await
            .unwrap();

        let attempts = (0..16).map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.take_if_eq("contended", "abc").await.unwrap() })
        });
        let winners = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(true)))
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let provider = make_provider();
        let data = serde_json::json!({"name": "test", "count": 42});
        provider
            .set_json("json_key", &data, Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<serde_json::Value> = provider.take_json("json_key").await.unwrap();
        assert_eq!(result, Some(data));
        assert!(!provider.exists("json_key").await.unwrap());
    }
}
