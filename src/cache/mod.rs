//! Content cache keyed by composite fingerprints.
//! Identity is the only invalidation: no TTL, no partial matches.

pub mod fingerprint;
pub mod manager;
pub mod store;

pub use fingerprint::{CachedEntry, ContentFingerprint, VersionToken};
pub use manager::{CacheStats, ContentCache};
pub use store::{CacheStore, MemoryStore};
