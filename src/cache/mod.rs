//! In-memory definition cache
//!
//! Holds the last successfully fetched descriptor text per [`ServiceKey`].
//! Reads dominate writes by orders of magnitude (every UI client reads, only
//! the refresh loop writes), so the store is a sharded [`DashMap`]: a reader
//! only ever contends with a writer on the same shard, and each put is atomic
//! per key.
//!
//! Entries are never removed. A service that disappears from the fleet keeps
//! serving its last known descriptor until the process restarts.
//!
//! # Example
//!
//! ```rust
//! use docshub::cache::DefinitionCache;
//!
//! let cache = DefinitionCache::new();
//! cache.put("orders - v1", r#"{"swagger":"2.0"}"#);
//!
//! assert!(cache.get("ORDERS - V1").is_some());
//! assert_eq!(cache.list_all()[0].location, "/service/ORDERS - V1");
//! ```

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::{CachedDefinition, DirectoryEntry, ServiceKey};

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Total puts (including overwrites)
    pub writes: u64,
    /// Distinct keys currently held
    pub entries: usize,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Concurrent key to descriptor-text store
#[derive(Debug, Default)]
pub struct DefinitionCache {
    definitions: DashMap<ServiceKey, CachedDefinition>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` under the normalized form of `key`, replacing any prior value
    pub fn put(&self, key: impl AsRef<str>, text: impl Into<String>) {
        let key = ServiceKey::new(key);
        let definition = CachedDefinition::new(key.clone(), text);
        self.definitions.insert(key, definition);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Look up a key exactly as stored (keys are held uppercase)
    pub fn get(&self, key: &str) -> Option<String> {
        let found = self
            .definitions
            .get(key)
            .map(|entry| entry.text.clone());
        self.record_lookup(found.is_some());
        found
    }

    /// Look up a key after normalizing it
    pub fn get_normalized(&self, key: &str) -> Option<String> {
        let found = self
            .definitions
            .get(&ServiceKey::new(key))
            .map(|entry| entry.text.clone());
        self.record_lookup(found.is_some());
        found
    }

    /// Full cached record (text plus last write time)
    pub fn entry(&self, key: &str) -> Option<CachedDefinition> {
        self.definitions
            .get(&ServiceKey::new(key))
            .map(|entry| entry.value().clone())
    }

    /// Directory of every cached key, sorted ascending.
    ///
    /// Not a snapshot: a put racing with this call may or may not show up.
    pub fn list_all(&self) -> Vec<DirectoryEntry> {
        let mut keys: Vec<ServiceKey> = self
            .definitions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort_unstable();
        keys.dedup();

        keys.iter().map(DirectoryEntry::for_key).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            entries: self.definitions.len(),
        }
    }

    fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}
