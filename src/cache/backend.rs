//! Cache store implementations.

use super::key::CacheKey;
use super::stats::{AtomicStats, CacheStats};
use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// A cached response body.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: Value,
    /// Set when the entry is written; never moved afterwards.
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn new(key: CacheKey, value: Value) -> Self {
        Self {
            key,
            value,
            stored_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    /// Valid while `age < ttl`; without a TTL an entry never expires.
    pub fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.age() < ttl,
            None => true,
        }
    }
}

/// Store consulted before every network call.
///
/// Stores are shared behind `Arc<dyn CacheStore>` and injected into the
/// client, so independent caches (or none at all) can coexist.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fresh entry for `key`, or `None` when unknown or expired.
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry>;
    /// Insert or overwrite, resetting `stored_at` to now.
    async fn set(&self, key: &CacheKey, value: Value);
    /// Remove `key`; returns whether an entry was present.
    async fn invalidate(&self, key: &CacheKey) -> bool;
    /// Remove every key under `prefix` (see [`CacheKey::starts_with`]);
    /// returns how many were removed.
    async fn invalidate_prefix(&self, prefix: &str) -> usize;
    async fn clear(&self);
    /// Number of stored entries, expired ones included until they are read.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).await.is_some()
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }

    fn name(&self) -> &'static str;
}

/// In-memory store with optional TTL and optional LRU capacity bound.
///
/// Expiry is lazy: an expired entry is removed when a read finds it, never
/// by a background sweep.
pub struct MemoryStore {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Option<Duration>,
    stats: AtomicStats,
}

impl MemoryStore {
    /// Unbounded store whose entries never expire.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            ttl: None,
            stats: AtomicStats::default(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Bound the store; the least recently used entry is evicted on overflow.
    /// A capacity of zero leaves the store unbounded.
    pub fn with_capacity(self, max_entries: usize) -> Self {
        let entries = match NonZeroUsize::new(max_entries) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(entries),
            ..self
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let fresh = match entries.get(key) {
            Some(entry) => entry.is_fresh(self.ttl),
            None => {
                AtomicStats::bump(&self.stats.misses, 1);
                return None;
            }
        };
        if !fresh {
            entries.pop(key);
            AtomicStats::bump(&self.stats.expirations, 1);
            AtomicStats::bump(&self.stats.misses, 1);
            trace!(key = %key, "cache entry expired");
            return None;
        }
        AtomicStats::bump(&self.stats.hits, 1);
        entries.get(key).cloned()
    }

    async fn set(&self, key: &CacheKey, value: Value) {
        let mut entries = self.lock();
        let entry = CacheEntry::new(key.clone(), value);
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            // push returns the old value for the same key on overwrite
            if &evicted != key {
                AtomicStats::bump(&self.stats.evictions, 1);
                trace!(key = %evicted, "cache entry evicted");
            }
        }
        AtomicStats::bump(&self.stats.sets, 1);
    }

    async fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.lock().pop(key).is_some();
        if removed {
            AtomicStats::bump(&self.stats.invalidations, 1);
        }
        removed
    }

    async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let doomed: Vec<CacheKey> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        AtomicStats::bump(&self.stats.invalidations, doomed.len() as u64);
        doomed.len()
    }

    async fn clear(&self) {
        self.lock().clear();
    }

    async fn len(&self) -> usize {
        self.lock().len()
    }

    fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Store that retains nothing. Injecting it disables caching.
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for NullStore {
    async fn get(&self, _: &CacheKey) -> Option<CacheEntry> {
        None
    }
    async fn set(&self, _: &CacheKey, _: Value) {}
    async fn invalidate(&self, _: &CacheKey) -> bool {
        false
    }
    async fn invalidate_prefix(&self, _: &str) -> usize {
        0
    }
    async fn clear(&self) {}
    async fn len(&self) -> usize {
        0
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
