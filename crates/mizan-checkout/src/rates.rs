//! # Rate Cache
//!
//! Per-organization cache of resolved [`RateSet`]s with a bounded TTL.
//!
//! Totals recompute on every cart mutation, and each recompute needs the
//! organization's full rate set. Without a cache that is one storage round
//! trip per keystroke at the till; with it, rates are fetched once per TTL
//! window. A miss is resolved synchronously before any total is trusted -
//! there is no stale-while-revalidate here, and no lock is held across the
//! fetch.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use mizan_core::RateSet;

struct CachedRates {
    rates: RateSet,
    fetched_at: Instant,
}

/// Thread-safe TTL cache keyed by organization id.
///
/// ## Why Mutex, not RwLock?
/// Lookups clone a small struct and insertions are rare (one per TTL
/// expiry); the critical section is tiny either way.
pub struct RateCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedRates>>,
}

impl RateCache {
    /// Creates a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        RateCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached rate set for an organization, if still fresh.
    pub fn get(&self, organization_id: &str) -> Option<RateSet> {
        let mut entries = self.entries.lock().expect("rate cache mutex poisoned");

        match entries.get(organization_id) {
            Some(cached) if cached.fetched_at.elapsed() < self.ttl => Some(cached.rates.clone()),
            Some(_) => {
                entries.remove(organization_id);
                None
            }
            None => None,
        }
    }

    /// Stores a freshly resolved rate set.
    pub fn put(&self, organization_id: &str, rates: RateSet) {
        let mut entries = self.entries.lock().expect("rate cache mutex poisoned");
        entries.insert(
            organization_id.to_string(),
            CachedRates {
                rates,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drops an organization's entry (e.g. after a rate update).
    pub fn invalidate(&self, organization_id: &str) {
        let mut entries = self.entries.lock().expect("rate cache mutex poisoned");
        entries.remove(organization_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_core::CurrencyCode;

    fn rates() -> RateSet {
        RateSet::new(CurrencyCode::new("IQD").unwrap())
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = RateCache::new(Duration::from_secs(60));
        assert!(cache.get("org-1").is_none());

        cache.put("org-1", rates());
        assert!(cache.get("org-1").is_some());
        assert!(cache.get("org-2").is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = RateCache::new(Duration::ZERO);
        cache.put("org-1", rates());
        assert!(cache.get("org-1").is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = RateCache::new(Duration::from_secs(60));
        cache.put("org-1", rates());
        cache.invalidate("org-1");
        assert!(cache.get("org-1").is_none());
    }
}
