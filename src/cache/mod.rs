//! In-process cache of loaded model artifacts
//!
//! Entries are bounded by count and age. Each entry remembers the
//! `trained_at` of the artifact it was loaded from; a lookup with a newer
//! revision misses, so retraining is picked up without explicit invalidation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::export::{ArtifactKey, ModelArtifact};

#[derive(Debug)]
struct CacheEntry {
    artifact: Arc<ModelArtifact>,
    revision: DateTime<Utc>,
    created_at: Instant,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// LRU + TTL cache keyed by artifact key
#[derive(Debug)]
pub struct ArtifactCache {
    max_size: usize,
    ttl: Duration,
    entries: Mutex<HashMap<ArtifactKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ArtifactCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            max_size: max_size.max(1),
            ttl,
            entries: Mutex::new(HashMap::with_capacity(max_size)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached artifact for `key` if it is fresh and matches `revision`
    pub fn get(&self, key: &ArtifactKey, revision: DateTime<Utc>) -> Option<Arc<ModelArtifact>> {
        let mut entries = self.entries.lock();

        let fresh = match entries.get_mut(key) {
            Some(entry) if entry.revision == revision && !entry.is_expired(self.ttl) => {
                entry.last_accessed = Instant::now();
                Some(entry.artifact.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };

        match fresh {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        fresh
    }

    /// Insert, evicting the least recently used entry when full
    pub fn insert(&self, key: ArtifactKey, revision: DateTime<Utc>, artifact: Arc<ModelArtifact>) {
        let mut entries = self.entries.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            let lru = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(lru) = lru {
                entries.remove(&lru);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                artifact,
                revision,
                created_at: now,
                last_accessed: now,
            },
        );
    }

    pub fn invalidate(&self, key: &ArtifactKey) {
        self.entries.lock().remove(key);
    }

    /// Drop expired entries, returning how many were removed
    pub fn prune_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(self.ttl));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::CategoricalEncoders;
    use crate::training::RandomForest;

    fn artifact() -> Arc<ModelArtifact> {
        Arc::new(ModelArtifact::new(
            RandomForest::new_regressor(1),
            CategoricalEncoders::new(),
        ))
    }

    fn key(item: &str) -> ArtifactKey {
        ArtifactKey::new("r1", item).unwrap()
    }

    #[test]
    fn test_hit_and_revision_miss() {
        let cache = ArtifactCache::new(4, Duration::from_secs(60));
        let rev = Utc::now();
        cache.insert(key("Idli"), rev, artifact());

        assert!(cache.get(&key("Idli"), rev).is_some());
        let newer = rev + chrono::Duration::seconds(1);
        assert!(cache.get(&key("Idli"), newer).is_none());
        // Stale entry is dropped on a revision mismatch
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ArtifactCache::new(2, Duration::from_secs(60));
        let rev = Utc::now();
        cache.insert(key("A"), rev, artifact());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(key("B"), rev, artifact());
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get(&key("A"), rev).is_some());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(key("C"), rev, artifact());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("A"), rev).is_some());
        assert!(cache.get(&key("B"), rev).is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = ArtifactCache::new(2, Duration::from_millis(1));
        let rev = Utc::now();
        cache.insert(key("A"), rev, artifact());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.prune_expired(), 1);
        assert!(cache.get(&key("A"), rev).is_none());
    }
}
