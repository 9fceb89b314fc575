use crate::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default lifetime of a cached entry.
pub const DEFAULT_TTL_SECS: u64 = 5 * 60;

#[derive(Debug, Clone)]
struct CacheRecord {
    entry: Entry,
    fetched_at: i64,
}

/// TTL-keyed entry cache shared by concurrent fetches.
///
/// Expiry is evaluated lazily on read. A stale record stays in the map until a
/// later `set` overwrites it or the cache is cleared.
#[derive(Debug)]
pub struct CatalogCache {
    ttl_secs: i64,
    records: Mutex<HashMap<String, CacheRecord>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs.unsigned_abs())
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, CacheRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, id: &str) -> Option<Entry> {
        self.get_at(id, now())
    }

    /// Look up `id` as of the epoch second `now`.
    pub fn get_at(&self, id: &str, now: i64) -> Option<Entry> {
        let records = self.records();
        let record = records.get(id)?;
        if now.saturating_sub(record.fetched_at) > self.ttl_secs {
            return None;
        }
        Some(record.entry.clone())
    }

    pub fn set(&self, id: &str, entry: Entry) {
        self.set_at(id, entry, now());
    }

    pub fn set_at(&self, id: &str, entry: Entry, now: i64) {
        self.records().insert(
            id.to_owned(),
            CacheRecord {
                entry,
                fetched_at: now,
            },
        );
    }

    pub fn delete(&self, id: &str) {
        self.records().remove(id);
    }

    pub fn clear(&self) {
        self.records().clear();
    }

    /// Number of stored records, stale ones included.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
