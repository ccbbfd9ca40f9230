//! Time-bounded memo for discovery results.
//!
//! Entries are validated lazily on read against a single process-wide TTL;
//! nothing evicts them proactively and nothing persists across restarts. A
//! single coarse mutex guards the whole map. This is not a hot-path
//! structure and contention is low.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::types::FunctionDescriptor;

/// Which discovery operation produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    /// Intent search against the unified server.
    Search,
}

/// Composite key: operation kind, query text, result limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub op: CacheOp,
    pub query: String,
    pub limit: u32,
}

impl CacheKey {
    /// Key for an intent-search result.
    pub fn search(intent: &str, limit: u32) -> Self {
        Self {
            op: CacheOp::Search,
            query: intent.to_string(),
            limit,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Vec<FunctionDescriptor>,
    stored_at: Instant,
}

/// In-memory discovery cache owned by the gateway.
#[derive(Debug)]
pub struct DiscoveryCache {
    enabled: bool,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl DiscoveryCache {
    /// Create a cache. A disabled cache reports every key invalid and
    /// silently drops writes.
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            enabled,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    // A panic while holding this lock cannot leave the map torn (all
    // mutations are single statements), so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The stored value for `key`, regardless of freshness.
    ///
    /// Pair with [`is_valid`](Self::is_valid); the gateway only returns
    /// entries that pass the validity check.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<FunctionDescriptor>> {
        self.lock().get(key).map(|entry| entry.value.clone())
    }

    /// Whether `key` holds a fresh entry. Always false when caching is
    /// disabled, regardless of entry presence.
    pub fn is_valid(&self, key: &CacheKey) -> bool {
        if !self.enabled {
            return false;
        }
        self.lock()
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    /// Store a discovery result. No-op when caching is disabled.
    pub fn put(&self, key: CacheKey, value: Vec<FunctionDescriptor>) {
        if !self.enabled {
            return;
        }
        self.lock().insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop all entries unconditionally. Idempotent.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors(names: &[&str]) -> Vec<FunctionDescriptor> {
        names
            .iter()
            .map(|n| FunctionDescriptor::named(*n))
            .collect()
    }

    #[test]
    fn test_put_then_get_within_ttl() {
        let cache = DiscoveryCache::new(true, Duration::from_secs(300));
        let key = CacheKey::search("send email", 5);

        cache.put(key.clone(), descriptors(&["GMAIL__SEND_EMAIL"]));

        assert!(cache.is_valid(&key));
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].name, "GMAIL__SEND_EMAIL");
    }

    #[test]
    fn test_order_is_preserved() {
        let cache = DiscoveryCache::new(true, Duration::from_secs(300));
        let key = CacheKey::search("send email", 5);
        let ranked = descriptors(&["GMAIL__SEND_EMAIL", "SENDGRID__SEND", "SLACK__SEND_MESSAGE"]);

        cache.put(key.clone(), ranked.clone());

        assert_eq!(cache.get(&key).unwrap(), ranked);
    }

    #[test]
    fn test_zero_ttl_is_immediately_stale() {
        let cache = DiscoveryCache::new(true, Duration::ZERO);
        let key = CacheKey::search("send email", 5);

        cache.put(key.clone(), descriptors(&["GMAIL__SEND_EMAIL"]));

        // Entry is present but never valid.
        assert!(cache.get(&key).is_some());
        assert!(!cache.is_valid(&key));
    }

    #[test]
    fn test_disabled_cache_reports_invalid_and_drops_writes() {
        let cache = DiscoveryCache::new(false, Duration::from_secs(300));
        let key = CacheKey::search("send email", 5);

        cache.put(key.clone(), descriptors(&["GMAIL__SEND_EMAIL"]));

        assert!(!cache.is_valid(&key));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_distinguish_query_and_limit() {
        let cache = DiscoveryCache::new(true, Duration::from_secs(300));

        cache.put(
            CacheKey::search("send email", 5),
            descriptors(&["GMAIL__SEND_EMAIL"]),
        );

        assert!(!cache.is_valid(&CacheKey::search("send email", 10)));
        assert!(!cache.is_valid(&CacheKey::search("send mail", 5)));
        assert!(cache.is_valid(&CacheKey::search("send email", 5)));
    }

    #[test]
    fn test_clear_is_unconditional_and_idempotent() {
        let cache = DiscoveryCache::new(true, Duration::from_secs(300));
        cache.put(CacheKey::search("a", 1), descriptors(&["A__X"]));
        cache.put(CacheKey::search("b", 1), descriptors(&["B__Y"]));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_key() {
        let cache = DiscoveryCache::new(true, Duration::from_secs(300));
        let key = CacheKey::search("never stored", 3);
        assert!(cache.get(&key).is_none());
        assert!(!cache.is_valid(&key));
    }
}
