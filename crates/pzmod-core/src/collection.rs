//! Collection expansion.
//!
//! Collections may nest, and nothing stops a collection from listing itself
//! or an ancestor, so the recursive walk tracks visited IDs and treats a
//! rediscovered ID as already handled.

use crate::CoreError;
use pzmod_catalog::{CatalogClient, CatalogError, Entry, EntryKind, FetchResult};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Resolve the immediate children of `entry`.
pub fn expand_children(client: &CatalogClient, entry: &Entry) -> Result<FetchResult, CatalogError> {
    if matches!(entry.kind, EntryKind::Other(_)) || entry.children.is_empty() {
        return Ok(FetchResult::default());
    }
    client.fetch_many(&entry.child_ids())
}

/// Flattened contents of a collection tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionExpansion {
    /// Packages in depth-first order, each at most once.
    pub packages: Vec<Entry>,
    /// Child IDs the catalog could not return.
    pub missing: Vec<String>,
    /// Children that are neither packages nor collections.
    pub skipped: Vec<Entry>,
    /// Nested collections that were walked, root excluded.
    pub collections: Vec<String>,
}

/// Walk `root` and every nested collection below it.
pub fn expand_collection(
    client: &CatalogClient,
    root: &Entry,
) -> Result<CollectionExpansion, CoreError> {
    if !root.is_collection() {
        return Err(CoreError::NotACollection(root.id.clone()));
    }

    let mut visited = HashSet::new();
    visited.insert(root.id.clone());
    let mut out = CollectionExpansion::default();
    walk(client, root, &mut visited, &mut out)?;
    Ok(out)
}

fn walk(
    client: &CatalogClient,
    collection: &Entry,
    visited: &mut HashSet<String>,
    out: &mut CollectionExpansion,
) -> Result<(), CoreError> {
    debug!("expanding collection {}", collection.id);
    let children = expand_children(client, collection)?;
    for id in &children.missing {
        if visited.insert(id.clone()) {
            out.missing.push(id.clone());
        }
    }

    for child_id in collection.child_ids() {
        let Some(child) = children.get(&child_id) else {
            continue;
        };
        if !visited.insert(child.id.clone()) {
            debug!("already visited {}, skipping", child.id);
            continue;
        }
        match child.kind {
            EntryKind::Package => out.packages.push(child.clone()),
            EntryKind::Collection => {
                out.collections.push(child.id.clone());
                walk(client, child, visited, out)?;
            }
            EntryKind::Other(code) => {
                warn!(
                    "skipping '{}' ({}): unsupported kind {code}",
                    child.title, child.id
                );
                out.skipped.push(child.clone());
            }
        }
    }
    Ok(())
}
