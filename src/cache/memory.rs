//! In-process TTL cache backend on [`moka`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;

use super::{CacheBackend, CacheError, CacheResult, Result};

/// Entry limit of [`MemoryCache::new`]
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Longest lifetime of any entry of [`MemoryCache::new`], whatever `ttl` a
/// writer asks for
pub const DEFAULT_MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the ttl it was written with
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Cache backend held in process memory.
///
/// Starts disconnected; reads and writes before `connect` (or after `close`)
/// report the backend as unavailable, the same way a remote cache would.
/// Expired entries are evicted by moka's maintenance, so memory stays bounded
/// by `max_capacity` and the longest ttl.
pub struct MemoryCache {
    entries: Cache<String, Entry>,
    connected: AtomicBool,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_TTL)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold at most `max_entries` entries, none of them longer than `max_ttl`
    pub fn with_limits(max_entries: u64, max_ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(max_ttl)
            .expire_after(PerEntryTtl)
            .build();
        Self {
            entries,
            connected: AtomicBool::new(false),
        }
    }

    /// Approximate number of live entries, exact after [`Self::run_pending_tasks`]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Apply pending evictions, expired entries included
    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(CacheError::Unavailable("cache is not connected".to_string()))
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        log::debug!("Memory cache connected");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.entries.invalidate_all();
        log::debug!("Memory cache closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> CacheResult<String> {
        if let Err(e) = self.ensure_connected() {
            return CacheResult::Unavailable(e.to_string());
        }
        match self.entries.get(key).await {
            Some(entry) => CacheResult::Hit(entry.value),
            None => CacheResult::Miss,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.ensure_connected()?;
        self.entries.insert(key.to_string(), Entry { value, ttl }).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_connected()?;
        self.entries.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected(cache: MemoryCache) -> MemoryCache {
        cache.connect().await.unwrap();
        cache
    }

    async fn drain(cache: &MemoryCache) {
        for _ in 0..10 {
            cache.run_pending_tasks().await;
            if cache.entry_count() == 0 {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = connected(MemoryCache::new()).await;
        cache.set("k", "v".to_string(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await, CacheResult::Hit("v".to_string()));
        assert_eq!(cache.get("other").await, CacheResult::Miss);
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = connected(MemoryCache::new()).await;
        cache.set("short", "1".to_string(), Duration::from_millis(20)).await.unwrap();
        cache.set("long", "2".to_string(), Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.get("short").await, CacheResult::Miss);
        assert_eq!(cache.get("long").await, CacheResult::Hit("2".to_string()));
    }

    #[tokio::test]
    async fn test_expired_entries_are_reclaimed() {
        let cache = connected(MemoryCache::with_limits(10_000, Duration::from_millis(20))).await;
        for i in 0..1000 {
            cache
                .set(&format!("due:{}", i), "[]".to_string(), Duration::from_secs(900))
                .await
                .unwrap();
        }
        assert_eq!(cache.get("due:999").await, CacheResult::Hit("[]".to_string()));

        tokio::time::sleep(Duration::from_millis(60)).await;
        drain(&cache).await;
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_capacity_bounds_entries() {
        let cache = connected(MemoryCache::with_limits(10, DEFAULT_MAX_TTL)).await;
        for i in 0..100 {
            cache
                .set(&format!("due:{}", i), "[]".to_string(), Duration::from_secs(60))
                .await
                .unwrap();
        }
        for _ in 0..3 {
            cache.run_pending_tasks().await;
        }
        assert!(cache.entry_count() <= 10);
    }

    #[tokio::test]
    async fn test_delete_only_touches_its_key() {
        let cache = connected(MemoryCache::new()).await;
        cache.set("a", "1".to_string(), Duration::from_secs(60)).await.unwrap();
        cache.set("b", "2".to_string(), Duration::from_secs(60)).await.unwrap();

        cache.delete("a").await.unwrap();

        assert_eq!(cache.get("a").await, CacheResult::Miss);
        assert_eq!(cache.get("b").await, CacheResult::Hit("2".to_string()));
    }

    #[tokio::test]
    async fn test_unavailable_until_connected() {
        let cache = MemoryCache::new();
        assert!(matches!(cache.get("k").await, CacheResult::Unavailable(_)));
        assert!(cache.set("k", "v".to_string(), Duration::from_secs(1)).await.is_err());

        cache.connect().await.unwrap();
        cache.set("k", "v".to_string(), Duration::from_secs(60)).await.unwrap();
        cache.close().await.unwrap();
        assert!(matches!(cache.get("k").await, CacheResult::Unavailable(_)));

        // Closing drops what was cached
        cache.connect().await.unwrap();
        assert_eq!(cache.get("k").await, CacheResult::Miss);
    }
}
