//! Add, update and remove workflows as pure decisions over an [`InstalledSet`].
//!
//! An interactive shell gathers choices (which mods, which maps, where to
//! insert them) and hands them in; every function here returns the new
//! installed state without touching the store. Only [`install_collection`]
//! talks to the catalog and the store, one package at a time.

use crate::collection::{expand_children, expand_collection};
use crate::concurrency::{parallel_map, CancelToken};
use crate::installed::{ConfigStore, InstalledSet, ModKey};
use crate::lists::{dedupe, filter, insert_at, position_options, surviving_position, Position};
use crate::CoreError;
use pzmod_catalog::{CatalogClient, Entry};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What a prompt can offer when adding `entry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddChoices {
    /// Mod IDs declared in the description.
    pub mods: Vec<String>,
    /// Map folders declared in the description.
    pub maps: Vec<String>,
    pub default_mods: Vec<String>,
    pub default_maps: Vec<String>,
    pub mod_positions: Vec<Position>,
    pub map_positions: Vec<Position>,
}

impl AddChoices {
    /// The description declared no mod IDs; the caller has to ask for them.
    pub fn needs_manual_ids(&self) -> bool {
        self.mods.is_empty()
    }
}

/// Choices for adding one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSelection {
    /// Selected mod IDs, or manually entered ones when none were declared.
    pub mods: Vec<String>,
    pub mod_position: Position,
    /// Selected maps, each with its own insertion point. Applied in order.
    pub maps: Vec<(String, Position)>,
}

/// Choices for re-selecting the mods and maps of an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSelection {
    pub mods: Vec<String>,
    pub mod_position: Position,
    pub maps: Vec<String>,
    pub map_position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFailure {
    pub id: String,
    pub title: String,
    pub reason: String,
}

/// Outcome of [`install_collection`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkInstallReport {
    /// Packages written to the store, in install order.
    pub added: Vec<String>,
    pub failures: Vec<InstallFailure>,
    /// IDs inside the collection tree that the catalog could not return.
    pub missing: Vec<String>,
    /// Entries of unsupported kinds.
    pub skipped: Vec<String>,
    /// Stopped early; everything in `added` is already persisted.
    pub cancelled: bool,
}

impl BulkInstallReport {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }
}

fn require_package(entry: &Entry) -> Result<(), CoreError> {
    if entry.is_package() {
        Ok(())
    } else {
        Err(CoreError::NotAPackage {
            id: entry.id.clone(),
            kind: entry.kind,
        })
    }
}

fn owned_keys(owner: &str, mods: &[String]) -> Vec<String> {
    mods.iter()
        .map(|m| ModKey::new(owner, m).to_string())
        .collect()
}

/// Pre-selected values for a multi-select over `declared`.
///
/// A single declared value is always pre-selected; otherwise only the
/// values already in `enabled` are.
pub fn default_selection(declared: &[String], enabled: &[String]) -> Vec<String> {
    if declared.len() == 1 {
        return declared.to_vec();
    }
    filter(declared, |d| enabled.iter().any(|e| e == d))
}

fn enabled_mods_for(installed: &InstalledSet, entry: &Entry, declared: &[String]) -> Vec<String> {
    let keys = installed.mod_keys();
    filter(declared, |m| keys.iter().any(|k| k.matches(&entry.id, m)))
}

pub fn add_choices(installed: &InstalledSet, entry: &Entry) -> Result<AddChoices, CoreError> {
    require_package(entry)?;
    let parsed = entry.parse();
    let enabled = enabled_mods_for(installed, entry, &parsed.mods);
    Ok(AddChoices {
        default_mods: default_selection(&parsed.mods, &enabled),
        default_maps: default_selection(&parsed.maps, &installed.maps),
        mod_positions: position_options(&installed.mods),
        map_positions: position_options(&installed.maps),
        mods: parsed.mods,
        maps: parsed.maps,
    })
}

/// Add `entry` with the operator's choices.
pub fn plan_add(
    installed: &InstalledSet,
    entry: &Entry,
    selection: &AddSelection,
) -> Result<InstalledSet, CoreError> {
    require_package(entry)?;
    if selection.mods.is_empty() {
        if entry.parse().has_mods() {
            return Err(CoreError::NoModsSelected);
        }
        return Err(CoreError::NoModIds {
            id: entry.id.clone(),
            title: entry.title.clone(),
        });
    }

    let keys = owned_keys(&entry.id, &selection.mods);
    let mods = insert_at(&installed.mods, &keys, &selection.mod_position)?;

    let mut maps = installed.maps.clone();
    for (map, position) in &selection.maps {
        maps = insert_at(&maps, std::slice::from_ref(map), position)?;
    }

    let mut items = installed.items.clone();
    items.push(entry.id.clone());

    debug!("planned add of {} ({} mods)", entry.id, keys.len());
    Ok(InstalledSet { items, mods, maps }.deduped())
}

/// Add `entry` without prompting: every declared mod and map goes to the end
/// of its list, and the fetched `children` join the items.
pub fn add_unattended(
    installed: &InstalledSet,
    entry: &Entry,
    children: &[Entry],
) -> Result<InstalledSet, CoreError> {
    require_package(entry)?;
    let parsed = entry.parse();
    if !parsed.has_mods() {
        return Err(CoreError::NoModIds {
            id: entry.id.clone(),
            title: entry.title.clone(),
        });
    }

    let mut next = installed.clone();
    next.mods.extend(owned_keys(&entry.id, &parsed.mods));
    next.maps.extend(parsed.maps);
    next.items.push(entry.id.clone());
    for child_id in entry.child_ids() {
        if children.iter().any(|c| c.id == child_id) && !next.has_item(&child_id) {
            next.items.push(child_id);
        }
    }
    Ok(next.deduped())
}

/// Re-select which of `entry`'s mods and maps are enabled.
///
/// Newly selected values go to the chosen position, deselected ones are
/// removed, and values that stay selected keep their place. A deselected
/// mod is also dropped when it is enabled through a legacy bare key. An
/// anchor removed by the same update falls back to the nearest surviving
/// value before it.
pub fn plan_update(
    installed: &InstalledSet,
    entry: &Entry,
    selection: &UpdateSelection,
) -> Result<InstalledSet, CoreError> {
    if selection.mods.is_empty() {
        return Err(CoreError::NoModsSelected);
    }
    let parsed = entry.parse();
    let selected: HashSet<&str> = selection.mods.iter().map(String::as_str).collect();
    let enabled = enabled_mods_for(installed, entry, &parsed.mods);

    let kept = filter(&installed.mods, |raw| {
        let key = ModKey::parse(raw);
        let ours = key.owner.is_none() || key.is_owned_by(&entry.id);
        !(ours && parsed.declares_mod(&key.mod_id) && !selected.contains(key.mod_id.as_str()))
    });
    let added = filter(&selection.mods, |m| !enabled.iter().any(|e| e == m));
    let mods = splice(
        &installed.mods,
        kept,
        &owned_keys(&entry.id, &added),
        &selection.mod_position,
    )?;

    let mut maps = installed.maps.clone();
    if !parsed.maps.is_empty() {
        let kept = filter(&installed.maps, |m| {
            !parsed.declares_map(m) || selection.maps.iter().any(|s| s == m)
        });
        let added = filter(&selection.maps, |m| !installed.has_map(m));
        maps = splice(&installed.maps, kept, &added, &selection.map_position)?;
    }

    let mut items = installed.items.clone();
    if !installed.has_item(&entry.id) {
        items.push(entry.id.clone());
    }

    Ok(InstalledSet { items, mods, maps }.deduped())
}

/// Insert `added` into `kept`, resolving `position` against `original`.
fn splice(
    original: &[String],
    kept: Vec<String>,
    added: &[String],
    position: &Position,
) -> Result<Vec<String>, CoreError> {
    if added.is_empty() {
        return Ok(kept);
    }
    let position = surviving_position(original, &kept, position);
    Ok(insert_at(&kept, added, &position)?)
}

/// Drop `entry`, its mod keys and every map it declares.
pub fn remove_entry(installed: &InstalledSet, entry: &Entry) -> InstalledSet {
    let parsed = entry.parse();
    InstalledSet {
        items: filter(&installed.items, |i| i != entry.id),
        mods: filter(&installed.mods, |m| !ModKey::parse(m).is_owned_by(&entry.id)),
        maps: filter(&installed.maps, |m| !parsed.declares_map(m)),
    }
}

pub fn remove_all() -> InstalledSet {
    InstalledSet::default()
}

/// IDs of `entries` that declare at least one installed map.
fn map_owners(installed: &InstalledSet, entries: &[Entry]) -> HashSet<String> {
    entries
        .iter()
        .filter(|e| e.parse().maps.iter().any(|m| installed.has_map(m)))
        .map(|e| e.id.clone())
        .collect()
}

fn owner_in(raw: &str, owners: &HashSet<String>) -> bool {
    ModKey::parse(raw)
        .owner
        .is_some_and(|o| owners.contains(&o))
}

/// Remove every mod except those providing an installed map.
///
/// `entries` are the fetched installed items; items the catalog could not
/// return cannot be shown to provide a map and are removed.
pub fn remove_all_keep_maps(installed: &InstalledSet, entries: &[Entry]) -> InstalledSet {
    let needed = map_owners(installed, entries);
    InstalledSet {
        items: filter(&installed.items, |i| needed.contains(i)),
        mods: filter(&installed.mods, |m| owner_in(m, &needed)),
        maps: installed.maps.clone(),
    }
}

/// Clear the map list and remove the items that provide those maps.
pub fn remove_all_maps(installed: &InstalledSet, entries: &[Entry]) -> InstalledSet {
    let related = map_owners(installed, entries);
    InstalledSet {
        items: filter(&installed.items, |i| !related.contains(i)),
        mods: filter(&installed.mods, |m| !owner_in(m, &related)),
        maps: Vec::new(),
    }
}

/// Install every package in the collection `collection_id`.
///
/// The tree is expanded first and each package's dependencies are resolved
/// on up to `workers` threads. Packages are then added one at a time, and the
/// installed set is written back to `store` after each. A cancelled `token`
/// stops the loop between packages; what was written stays. Cancelling
/// before the first write fails with [`CoreError::Cancelled`].
pub fn install_collection(
    client: &CatalogClient,
    store: &mut dyn ConfigStore,
    collection_id: &str,
    workers: usize,
    token: &CancelToken,
) -> Result<BulkInstallReport, CoreError> {
    let root = client
        .fetch_one(collection_id)?
        .ok_or_else(|| CoreError::NotFound(collection_id.to_owned()))?;
    let expansion = expand_collection(client, &root)?;
    info!(
        "collection '{}' holds {} packages",
        root.title,
        expansion.packages.len()
    );

    if token.is_cancelled() {
        return Err(CoreError::Cancelled);
    }
    let mut report = BulkInstallReport {
        skipped: expansion.skipped.iter().map(|e| e.id.clone()).collect(),
        ..BulkInstallReport::default()
    };

    let children = parallel_map(&expansion.packages, workers, |pkg| {
        expand_children(client, pkg)
    })?;

    let mut missing = expansion.missing;
    let mut installed = InstalledSet::load(store);
    for (pkg, deps) in expansion.packages.iter().zip(children) {
        if token.is_cancelled() {
            warn!(
                "install cancelled after {} of {} packages",
                report.added.len(),
                expansion.packages.len()
            );
            report.cancelled = true;
            break;
        }
        missing.extend(deps.missing);
        match add_unattended(&installed, pkg, &deps.found) {
            Ok(next) => {
                installed = next;
                installed.save(store);
                info!("added '{}' ({})", pkg.title, pkg.id);
                report.added.push(pkg.id.clone());
            }
            Err(e) => {
                warn!("failed to add '{}' ({}): {e}", pkg.title, pkg.id);
                report.failures.push(InstallFailure {
                    id: pkg.id.clone(),
                    title: pkg.title.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    report.missing = dedupe(&missing);
    Ok(report)
}
