use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::market_data::loader::LoadOutcome;
use crate::types::{Interval, Period};

// ---------------------------------------------------------------------------
// Cache key
// ---------------------------------------------------------------------------

/// Composite key that identifies one loader request.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
    pub autofix: bool,
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}/{}{}",
            self.symbol,
            self.period,
            self.interval,
            if self.autofix { "+fix" } else { "" }
        )
    }
}

// ---------------------------------------------------------------------------
// SeriesCache -- thread-safe TTL map per loader request
// ---------------------------------------------------------------------------

struct Entry {
    outcome: LoadOutcome,
    stored_at: Instant,
}

/// Thread-safe cache of loader outcomes. Entries older than `ttl` are never
/// returned and are dropped on the next lookup or [`SeriesCache::purge_expired`].
pub struct SeriesCache {
    entries: RwLock<HashMap<SeriesKey, Entry>>,
    ttl: Duration,
}

impl SeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `outcome` under `key`. Empty outcomes are not cached so that a
    /// transient provider failure is retried on the next request.
    pub fn insert(&self, key: SeriesKey, outcome: LoadOutcome) {
        if outcome.candles.is_empty() {
            debug!(key = %key, "not caching empty outcome");
            return;
        }
        self.entries.write().insert(
            key,
            Entry {
                outcome,
                stored_at: Instant::now(),
            },
        );
    }

    /// Return a fresh copy of the cached outcome, if any.
    pub fn get(&self, key: &SeriesKey) -> Option<LoadOutcome> {
        {
            let map = self.entries.read();
            match map.get(key) {
                Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                    return Some(entry.outcome.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop it under the write lock.
        self.entries.write().remove(key);
        debug!(key = %key, "cache entry expired");
        None
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut map = self.entries.write();
        let before = map.len();
        let ttl = self.ttl;
        map.retain(|_, e| e.stored_at.elapsed() < ttl);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Candle;

    fn make_key(sym: &str) -> SeriesKey {
        SeriesKey {
            symbol: sym.into(),
            period: Period::Month1,
            interval: Interval::Minute5,
            autofix: true,
        }
    }

    fn outcome(rows: usize) -> LoadOutcome {
        LoadOutcome {
            candles: (0..rows)
                .map(|i| Candle::new(i as i64 * 300, 1.0, 1.0, 1.0, 1.0, 0.0))
                .collect(),
            period: Period::Month1,
            interval: Interval::Minute5,
            attempts: Vec::new(),
            cached: false,
        }
    }

    #[test]
    fn hit_within_ttl() {
        let cache = SeriesCache::new(Duration::from_secs(600));
        cache.insert(make_key("AAPL"), outcome(3));
        let hit = cache.get(&make_key("AAPL")).expect("should hit");
        assert_eq!(hit.candles.len(), 3);
        assert!(cache.get(&make_key("MSFT")).is_none());
    }

    #[test]
    fn empty_outcome_not_cached() {
        let cache = SeriesCache::new(Duration::from_secs(600));
        cache.insert(make_key("AAPL"), outcome(0));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn zero_ttl_always_expires() {
        let cache = SeriesCache::new(Duration::ZERO);
        cache.insert(make_key("AAPL"), outcome(2));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&make_key("AAPL")).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn purge_removes_expired() {
        let cache = SeriesCache::new(Duration::ZERO);
        cache.insert(make_key("AAPL"), outcome(2));
        cache.insert(make_key("TSLA"), outcome(2));
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn key_display() {
        assert_eq!(make_key("BTC-USD").to_string(), "BTC-USD@1mo/5m+fix");
    }
}
