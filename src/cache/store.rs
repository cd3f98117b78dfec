//! Storage backends behind the content cache.

use super::fingerprint::{CachedEntry, ContentFingerprint};
use crate::error::CacheError;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

/// Raw storage. Implementations may fail; [`super::ContentCache`] absorbs it.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, fingerprint: &ContentFingerprint) -> Result<Option<CachedEntry>, CacheError>;

    /// Returns `true` when storing pushed out another fingerprint's entry.
    async fn save(&self, fingerprint: ContentFingerprint, entry: CachedEntry) -> Result<bool, CacheError>;

    async fn remove(&self, fingerprint: &ContentFingerprint) -> Result<bool, CacheError>;

    /// Removes every entry whose fingerprint belongs to `owner_id`.
    async fn remove_owner(&self, owner_id: &str) -> Result<usize, CacheError>;
}

/// Process-lifetime LRU store.
pub struct MemoryStore {
    entries: Mutex<LruCache<ContentFingerprint, CachedEntry>>,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self, fingerprint: &ContentFingerprint) -> Result<Option<CachedEntry>, CacheError> {
        Ok(self.entries.lock().await.get(fingerprint).cloned())
    }

    async fn save(&self, fingerprint: ContentFingerprint, entry: CachedEntry) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        let key = fingerprint.clone();
        let evicted = match entries.push(fingerprint, entry) {
            Some((old_key, _)) => old_key != key,
            None => false,
        };
        Ok(evicted)
    }

    async fn remove(&self, fingerprint: &ContentFingerprint) -> Result<bool, CacheError> {
        Ok(self.entries.lock().await.pop(fingerprint).is_some())
    }

    async fn remove_owner(&self, owner_id: &str) -> Result<usize, CacheError> {
        let mut entries = self.entries.lock().await;
        let owned: Vec<ContentFingerprint> = entries
            .iter()
            .filter(|(fingerprint, _)| fingerprint.owner_id == owner_id)
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect();
        for fingerprint in &owned {
            entries.pop(fingerprint);
        }
        Ok(owned.len())
    }
}
