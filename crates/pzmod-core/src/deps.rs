use crate::collection::expand_children;
use crate::concurrency::parallel_map;
use crate::lists::dedupe;
use pzmod_catalog::{CatalogClient, CatalogError, Entry};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Children of an entry that are not in the installed items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    /// Resolved children absent from the installed items, in child order.
    pub missing: Vec<Entry>,
    /// Child IDs the catalog could not return. These are never installed
    /// implicitly and should be surfaced as warnings.
    pub unfetchable: Vec<String>,
}

impl DependencyReport {
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty() && self.unfetchable.is_empty()
    }

    pub fn missing_ids(&self) -> Vec<String> {
        self.missing.iter().map(|e| e.id.clone()).collect()
    }
}

/// Direct dependencies of `entry` that `installed_items` lacks.
pub fn missing_dependencies_of(
    client: &CatalogClient,
    entry: &Entry,
    installed_items: &[String],
) -> Result<DependencyReport, CatalogError> {
    let children = expand_children(client, entry)?;
    let installed: HashSet<&str> = installed_items.iter().map(String::as_str).collect();

    let mut report = DependencyReport::default();
    for child_id in entry.child_ids() {
        if let Some(child) = children.get(&child_id) {
            if !installed.contains(child.id.as_str()) {
                report.missing.push(child.clone());
            }
        }
    }
    for id in &children.missing {
        warn!(
            "could not fetch dependency {id} of '{}' ({})",
            entry.title, entry.id
        );
    }
    report.unfetchable = children.missing;
    Ok(report)
}

/// Like [`missing_dependencies_of`], but follows the dependencies of every
/// missing child as well. Each ID is expanded at most once.
pub fn missing_dependencies_deep(
    client: &CatalogClient,
    entry: &Entry,
    installed_items: &[String],
) -> Result<DependencyReport, CatalogError> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(entry.id.clone());
    let mut report = DependencyReport::default();
    let mut queue = vec![entry.clone()];

    while let Some(current) = queue.pop() {
        let direct = missing_dependencies_of(client, &current, installed_items)?;
        for id in direct.unfetchable {
            if visited.insert(id.clone()) {
                report.unfetchable.push(id);
            }
        }
        let mut next = Vec::new();
        for child in direct.missing {
            if !visited.insert(child.id.clone()) {
                continue;
            }
            report.missing.push(child.clone());
            next.push(child);
        }
        // Keep discovery order for the next level.
        queue.extend(next.into_iter().rev());
    }
    Ok(report)
}

/// Re-fetch every ID in `ids` and return those the catalog no longer has.
///
/// Each unique ID is fetched on its own so one bad ID cannot hide behind a
/// batch. A transport or credential error from any fetch fails the call.
pub fn validate_installed_set(
    client: &CatalogClient,
    ids: &[String],
    workers: usize,
) -> Result<Vec<String>, CatalogError> {
    let unique = dedupe(ids);
    debug!("validating {} workshop IDs on {workers} workers", unique.len());
    let missing = parallel_map(&unique, workers, |id| {
        client
            .fetch_many(std::slice::from_ref(id))
            .map(|result| result.missing)
    })?;
    Ok(missing.into_iter().flatten().collect())
}
