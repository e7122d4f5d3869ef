//! In-process listing cache backed by a bounded LRU.

use std::{num::NonZeroUsize, sync::Mutex, time::Duration};

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;

use super::{
    backend::{CacheBackend, CacheError},
    lock::mutex_lock,
};

const TARGET: &str = "tasklane::cache::memory";

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, TARGET, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = mutex_lock(&self.entries, TARGET, "get");
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        mutex_lock(&self.entries, TARGET, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        mutex_lock(&self.entries, TARGET, "delete").pop(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut entries = mutex_lock(&self.entries, TARGET, "delete_prefix");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> MemoryCache {
        MemoryCache::new(NonZeroUsize::new(capacity).expect("non-zero capacity"))
    }

    #[tokio::test]
    async fn get_returns_stored_value() {
        let cache = cache(4);
        cache
            .set("tasks:list:a", "payload".into(), Duration::from_secs(60))
            .await
            .expect("set");
        assert_eq!(
            cache.get("tasks:list:a").await.expect("get"),
            Some("payload".to_string())
        );
        assert_eq!(cache.get("tasks:list:missing").await.expect("get"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = cache(4);
        cache
            .set("k", "v".into(), Duration::from_secs(10))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get("k").await.expect("get").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").await.expect("get").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let cache = cache(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", "1".into(), ttl).await.expect("set a");
        cache.set("b", "2".into(), ttl).await.expect("set b");
        cache.get("a").await.expect("touch a");
        cache.set("c", "3".into(), ttl).await.expect("set c");

        assert!(cache.get("a").await.expect("get a").is_some());
        assert!(cache.get("b").await.expect("get b").is_none());
        assert!(cache.get("c").await.expect("get c").is_some());
    }

    #[tokio::test]
    async fn delete_prefix_only_removes_matching_keys() {
        let cache = cache(8);
        let ttl = Duration::from_secs(60);
        cache.set("tasks:list:1", "x".into(), ttl).await.expect("set");
        cache.set("tasks:list:2", "y".into(), ttl).await.expect("set");
        cache.set("other:1", "z".into(), ttl).await.expect("set");

        let removed = cache.delete_prefix("tasks:list:").await.expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("other:1").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let cache = cache(1);
        cache.delete("nope").await.expect("delete");
        assert_eq!(cache.delete_prefix("nope").await.expect("delete"), 0);
    }
}
