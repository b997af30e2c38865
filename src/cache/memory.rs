//! In-process cache adapter.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::store::{CacheError, CacheStore};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Bounded LRU map with per-entry expiry.
///
/// Expired entries are dropped lazily when read or swept by prefix; capacity
/// pressure evicts the least recently used entry regardless of its TTL.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, LruCache<String, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    lock_kind = "mutex.lock",
                    result = "poisoned_recovered",
                    hint = "entries may be stale after a panic in another task",
                    "Recovered from poisoned memory cache lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.lock("get");
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        entries.pop(key);
        debug!(key, "Dropped expired memory cache entry");
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let evicted = self.lock("set").push(key.to_string(), entry);

        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!("scriptorium_cache_evict_total").increment(1);
            debug!(key = %evicted_key, "Evicted memory cache entry at capacity");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock("delete").pop(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut entries = self.lock("delete_prefix");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.pop(key.as_str());
        }
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> MemoryCache {
        MemoryCache::new(NonZeroUsize::new(capacity).expect("non-zero capacity"))
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = cache(8);
        cache
            .set("slug:a", "A".into(), Duration::from_secs(60))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("slug:a").await.expect("get").as_deref(), Some("A"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("slug:a").await.expect("get"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn set_overwrites_and_delete_is_idempotent() {
        let cache = cache(8);
        let ttl = Duration::from_secs(60);
        cache.set("k", "one".into(), ttl).await.expect("set");
        cache.set("k", "two".into(), ttl).await.expect("set");
        assert_eq!(cache.get("k").await.expect("get").as_deref(), Some("two"));

        cache.delete("k").await.expect("delete");
        cache.delete("k").await.expect("delete absent");
        assert_eq!(cache.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn delete_prefix_only_touches_matching_keys() {
        let cache = cache(8);
        let ttl = Duration::from_secs(60);
        for key in [
            "list:page:1:limit:10",
            "list:page:2:limit:10",
            "list:page:1:limit:5",
            "slug:list",
        ] {
            cache.set(key, "v".into(), ttl).await.expect("set");
        }

        let removed = cache.delete_prefix("list:").await.expect("sweep");
        assert_eq!(removed, 3);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("slug:list").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = cache(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", "1".into(), ttl).await.expect("set");
        cache.set("b", "2".into(), ttl).await.expect("set");
        cache.get("a").await.expect("touch a");
        cache.set("c", "3".into(), ttl).await.expect("set");

        assert!(cache.get("a").await.expect("get").is_some());
        assert!(cache.get("b").await.expect("get").is_none());
        assert!(cache.get("c").await.expect("get").is_some());
    }
}
