//! High-level cache logic: get, set, clear and owner invalidation, all soft-failing.

use super::fingerprint::{CachedEntry, ContentFingerprint};
use super::store::{CacheStore, MemoryStore};
use crate::config::CacheConfig;
use crate::error::CacheError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Public handle to the content cache. Clones share the same storage.
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn CacheStore>,
    max_content_bytes: usize,
    counters: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    evictions: AtomicU64,
    soft_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub evictions: u64,
    pub soft_failures: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl ContentCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_store(
            Arc::new(MemoryStore::new(config.max_entries)),
            config.max_content_bytes,
        )
    }

    pub fn with_store(store: Arc<dyn CacheStore>, max_content_bytes: usize) -> Self {
        Self {
            store,
            max_content_bytes,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Entry stored under exactly this fingerprint. Storage failures read as a miss.
    #[instrument(skip_all, fields(key = %fingerprint.storage_key()))]
    pub async fn get(&self, fingerprint: &ContentFingerprint) -> Option<CachedEntry> {
        match self.store.load(fingerprint).await {
            Ok(Some(entry)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(mode = %fingerprint.mode, "Cache hit");
                Some(entry)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(mode = %fingerprint.mode, "Cache miss");
                None
            }
            Err(e) => {
                self.soft_fail("get", &e);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Overwrites the entry for this fingerprint. Failures are absorbed.
    #[instrument(skip_all, fields(key = %fingerprint.storage_key()))]
    pub async fn set(&self, fingerprint: &ContentFingerprint, entry: CachedEntry) {
        if entry.size_bytes() > self.max_content_bytes {
            self.soft_fail(
                "set",
                &CacheError::TooLarge {
                    size: entry.size_bytes(),
                    limit: self.max_content_bytes,
                },
            );
            // A rejected overwrite must not leave the previous entry readable.
            if let Err(e) = self.store.remove(fingerprint).await {
                self.soft_fail("set", &e);
            }
            return;
        }

        match self.store.save(fingerprint.clone(), entry).await {
            Ok(evicted) => {
                self.counters.stores.fetch_add(1, Ordering::Relaxed);
                if evicted {
                    self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!("Evicted least recently used entry");
                }
                debug!(mode = %fingerprint.mode, "Cache entry stored");
            }
            Err(e) => self.soft_fail("set", &e),
        }
    }

    /// Removes this fingerprint's entry only.
    #[instrument(skip_all, fields(key = %fingerprint.storage_key()))]
    pub async fn clear(&self, fingerprint: &ContentFingerprint) {
        match self.store.remove(fingerprint).await {
            Ok(removed) => debug!(removed, "Cache entry cleared"),
            Err(e) => self.soft_fail("clear", &e),
        }
    }

    /// Drops every entry owned by `owner_id`, for instance after an account
    /// reset. Returns how many entries went.
    #[instrument(skip(self))]
    pub async fn invalidate_owner(&self, owner_id: &str) -> usize {
        match self.store.remove_owner(owner_id).await {
            Ok(removed) => {
                debug!(removed, "Owner entries invalidated");
                removed
            }
            Err(e) => {
                self.soft_fail("invalidate_owner", &e);
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            soft_failures: self.counters.soft_failures.load(Ordering::Relaxed),
        }
    }

    fn soft_fail(&self, op: &'static str, error: &CacheError) {
        self.counters.soft_failures.fetch_add(1, Ordering::Relaxed);
        warn!(op, error = %error, "Cache operation degraded");
    }
}
