//! TTL cache for decoded upstream responses.
//!
//! Entries are keyed `"{METHOD}:{path}"` and expire lazily: an expired entry
//! stays in storage until the next read or an explicit invalidation touches
//! it. There is no background sweep.

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    created_at: Instant,
}

/// Process-wide response cache. Cheap to clone; clones share storage.
#[derive(Clone)]
pub struct ResponseCache {
    ttl: Duration,
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

/// Introspection snapshot for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub ttl_seconds: u64,
    pub entries: Vec<String>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Return the stored value if it is still fresh.
    ///
    /// A read that observes an expired entry evicts it immediately; that is
    /// the only path (besides invalidation) that removes stale entries.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut map = self.inner.write();
        let entry = map.get(key)?;
        if entry.created_at.elapsed() >= self.ttl {
            map.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Store a value under `key`, overwriting any prior entry.
    pub fn insert(&self, key: String, value: Value) {
        self.inner.write().insert(
            key,
            Entry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Remove entries whose key contains `pattern`; with no pattern, clear
    /// the whole store. Returns the number of entries removed.
    ///
    /// Substring matching is intentionally coarse: a write to `/users/42`
    /// invalidates every cached read whose key mentions `users`, including
    /// false positives like `superusers`. Stale reads are worse than a
    /// lower hit rate.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut map = self.inner.write();
        let before = map.len();
        match pattern {
            Some(p) => map.retain(|k, _| !k.contains(p)),
            None => map.clear(),
        }
        before - map.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let map = self.inner.read();
        CacheStats {
            total_entries: map.len(),
            ttl_seconds: self.ttl.as_secs(),
            entries: map.keys().cloned().collect(),
        }
    }
}

/// Normalized cache key for one operation: upper-case method, path as given.
///
/// Query strings are not normalized here; callers that need cache
/// correctness across query variants must normalize them first.
#[must_use]
pub fn cache_key(method: &reqwest::Method, path: &str) -> String {
    format!("{}:{}", method.as_str().to_uppercase(), path)
}
