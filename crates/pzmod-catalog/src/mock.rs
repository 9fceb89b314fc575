use crate::{CatalogBackend, CatalogError, Entry, MAX_BATCH};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory catalog backend.
///
/// Unknown IDs are answered with not-found rows, every batch is recorded, and
/// failures can be injected per call or per ID.
#[derive(Default)]
pub struct MockCatalog {
    entries: Mutex<HashMap<String, Entry>>,
    requests: Mutex<Vec<Vec<String>>>,
    unauthorized: Mutex<bool>,
    failing_ids: Mutex<HashSet<String>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mock = Self::new();
        for entry in entries {
            mock.insert(entry);
        }
        mock
    }

    pub fn insert(&self, entry: Entry) {
        lock(&self.entries).insert(entry.id.clone(), entry);
    }

    pub fn remove(&self, id: &str) {
        lock(&self.entries).remove(id);
    }

    /// Every batch received so far, in call order.
    pub fn requests(&self) -> Vec<Vec<String>> {
        lock(&self.requests).clone()
    }

    /// Number of times `id` was sent to the backend.
    pub fn request_count_for(&self, id: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|batch| batch.iter().any(|i| i == id))
            .count()
    }

    pub fn fail_with_unauthorized(&self) {
        *lock(&self.unauthorized) = true;
    }

    /// Any batch containing `id` fails with a transport error.
    pub fn fail_batches_containing(&self, id: &str) {
        lock(&self.failing_ids).insert(id.to_owned());
    }
}

impl CatalogBackend for MockCatalog {
    fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Entry>, CatalogError> {
        lock(&self.requests).push(ids.to_vec());

        if ids.len() > MAX_BATCH {
            return Err(CatalogError::Http(format!(
                "HTTP 400: batch of {} exceeds limit",
                ids.len()
            )));
        }
        if *lock(&self.unauthorized) {
            return Err(CatalogError::Unauthorized);
        }
        {
            let failing = lock(&self.failing_ids);
            if let Some(id) = ids.iter().find(|id| failing.contains(*id)) {
                return Err(CatalogError::Http(format!("HTTP 500 while fetching {id}")));
            }
        }

        let entries = lock(&self.entries);
        Ok(ids
            .iter()
            .map(|id| {
                entries
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| Entry::not_found(id))
            })
            .collect())
    }
}
