use crate::{CatalogBackend, CatalogCache, CatalogConfig, CatalogError, Entry, HttpBackend, MAX_BATCH};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a batched fetch.
///
/// Every requested ID lands in exactly one of `found` or `missing`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    pub found: Vec<Entry>,
    pub missing: Vec<String>,
}

impl FetchResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.found.iter().find(|e| e.id == id)
    }
}

/// Cache-fronted catalog client.
pub struct CatalogClient {
    backend: Arc<dyn CatalogBackend>,
    cache: CatalogCache,
    batch_size: usize,
}

impl CatalogClient {
    pub fn new(backend: Arc<dyn CatalogBackend>, cache: CatalogCache) -> Self {
        Self {
            backend,
            cache,
            batch_size: MAX_BATCH,
        }
    }

    /// Client over the HTTP backend described by `config`.
    pub fn from_config(config: &CatalogConfig) -> Self {
        let cache = CatalogCache::new(config.cache_ttl());
        let backend = Arc::new(HttpBackend::new(config.clone()));
        Self::new(backend, cache).with_batch_size(config.effective_batch_size())
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH);
        self
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// Fetch entries for `ids`, serving cache hits locally.
    ///
    /// Misses go to the backend in batches of at most `batch_size`. A transport
    /// or credential error from any batch aborts the whole call. Rows whose
    /// status is not "ok", and IDs the service omitted, are reported as missing.
    pub fn fetch_many(&self, ids: &[String]) -> Result<FetchResult, CatalogError> {
        let mut seen = HashSet::new();
        let mut result = FetchResult::default();
        let mut to_fetch = Vec::new();

        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match self.cache.get(id) {
                Some(entry) => {
                    debug!("cache hit: {id}");
                    result.found.push(entry);
                }
                None => to_fetch.push(id.clone()),
            }
        }

        if to_fetch.is_empty() {
            return Ok(result);
        }

        let mut fetched = Vec::new();
        for chunk in to_fetch.chunks(self.batch_size) {
            debug!("fetching batch of {} entries", chunk.len());
            let rows = self.backend.fetch_batch(chunk)?;
            let mut by_id: HashMap<String, Entry> = HashMap::with_capacity(rows.len());
            for row in rows {
                by_id.entry(row.id.clone()).or_insert(row);
            }

            for id in chunk {
                match by_id.remove(id) {
                    Some(entry) if entry.is_found() => fetched.push(entry),
                    _ => {
                        warn!("catalog entry unavailable: {id}");
                        result.missing.push(id.clone());
                    }
                }
            }
        }

        for entry in &fetched {
            self.cache.set(&entry.id, entry.clone());
        }
        result.found.extend(fetched);
        Ok(result)
    }

    /// Fetch a single entry. `Ok(None)` when the service does not have it.
    pub fn fetch_one(&self, id: &str) -> Result<Option<Entry>, CatalogError> {
        let mut result = self.fetch_many(&[id.to_owned()])?;
        Ok(result.found.pop())
    }
}
