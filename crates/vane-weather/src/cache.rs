//! Concurrent result cache keyed by normalized location.
//!
//! Keys are trimmed and ASCII-lowercased before every lookup and store, so
//! `"Austin"`, `"austin"` and `" austin "` share one entry. Entries
//! optionally expire after a TTL; an expired entry reads as a miss and is
//! evicted in place. Without a TTL the cache grows without bound, which is
//! acceptable for the current location cardinality.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::types::WeatherReport;

/// Normalization rule applied to every cache key.
pub fn normalize_key(location: &str) -> String {
    location.trim().to_ascii_lowercase()
}

#[derive(Debug)]
struct CacheEntry {
    report: WeatherReport,
    stored_at: Instant,
}

/// Thread-safe location → report cache with optional expiry.
#[derive(Debug)]
pub struct WeatherCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl WeatherCache {
    /// `ttl: None` means entries never expire.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns a copy of the cached report, or `None` on a miss or an
    /// expired entry.
    pub fn get(&self, location: &str) -> Option<WeatherReport> {
        let key = normalize_key(location);

        {
            let entries = self.entries.read();
            match entries.get(&key) {
                None => return None,
                Some(entry) if !self.is_expired(entry) => return Some(entry.report.clone()),
                Some(_) => {}
            }
        }

        // The entry was expired under the read lock. Re-check under the
        // write lock: a concurrent store may have refreshed it meanwhile.
        let mut entries = self.entries.write();
        match entries.get(&key) {
            Some(entry) if !self.is_expired(entry) => Some(entry.report.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Stores a report snapshot, replacing any previous entry for the key.
    pub fn store(&self, location: &str, report: WeatherReport) {
        let key = normalize_key(location);
        self.entries.write().insert(
            key,
            CacheEntry {
                report,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of entries currently held, including not-yet-evicted expired
    /// ones.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry.stored_at.elapsed() >= ttl,
            None => false,
        }
    }
}
