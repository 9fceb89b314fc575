//! Consistency checks between the installed lists and the catalog.

use crate::concurrency::parallel_map;
use crate::deps::{missing_dependencies_of, validate_installed_set};
use crate::installed::{InstalledSet, ModKey};
use crate::CoreError;
use pzmod_catalog::{CatalogClient, Entry, ParsedEntry};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// A referenced workshop ID the catalog does not know.
    InvalidId(String),
    /// An installed item that could not be fetched for inspection.
    UnfetchableItem(String),
    /// A mod key whose owner does not declare that mod ID.
    UnknownModKey(String),
    /// A mod key whose owner is not in the workshop item list.
    OrphanModKey { key: String, owner: String },
    /// A mod ID declared by an installed item but not enabled.
    UnusedModId { owner: String, mod_id: String },
    /// A map in the map list that no installed item declares.
    UnknownMap(String),
    /// A map declared by an installed item but absent from the map list.
    UnusedMap { owner: String, map: String },
    /// A mod key naming a map folder that is missing from the map list.
    MapListedAsMod { key: String, map: String },
    MissingDependency {
        required_by: String,
        required_by_title: String,
        id: String,
        title: Option<String>,
    },
    UnfetchableDependency { required_by: String, id: String },
}

impl Problem {
    /// Errors break the server; the rest are warnings.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidId(_)
                | Self::UnfetchableItem(_)
                | Self::UnknownModKey(_)
                | Self::OrphanModKey { .. }
                | Self::MissingDependency { .. }
        )
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "invalid workshop ID: {id}"),
            Self::UnfetchableItem(id) => write!(f, "could not fetch workshop item {id}"),
            Self::UnknownModKey(key) => write!(f, "unknown mod ID: {key} (not in workshop items)"),
            Self::OrphanModKey { key, owner } => {
                write!(f, "mod ID {key} belongs to {owner}, which is not in workshop items")
            }
            Self::UnusedModId { owner, mod_id } => {
                write!(f, "unused mod ID: {mod_id} (declared by {owner})")
            }
            Self::UnknownMap(map) => write!(f, "map '{map}' is not declared by any workshop item"),
            Self::UnusedMap { owner, map } => {
                write!(f, "map '{map}' declared by {owner} is not in the map list")
            }
            Self::MapListedAsMod { key, map } => {
                write!(f, "mod {key} is a map but '{map}' is not in the map list")
            }
            Self::MissingDependency {
                required_by,
                required_by_title,
                id,
                title,
            } => write!(
                f,
                "missing dependency: {} ({id}), required by '{required_by_title}' ({required_by})",
                title
                    .as_deref()
                    .map_or_else(|| "an unknown mod".to_owned(), |t| format!("'{t}'"))
            ),
            Self::UnfetchableDependency { required_by, id } => {
                write!(f, "could not fetch dependency {id} of {required_by}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemReport {
    pub problems: Vec<Problem>,
}

impl ProblemReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(Problem::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| p.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| !p.is_error())
    }
}

/// Cross-check `installed` against the catalog and collect every problem.
///
/// Transport and credential errors abort the check; everything the catalog
/// answers is turned into a [`Problem`].
pub fn detect_problems(
    client: &CatalogClient,
    installed: &InstalledSet,
    workers: usize,
) -> Result<ProblemReport, CoreError> {
    let mut problems = Vec::new();

    let referenced = installed.referenced_ids();
    let invalid = validate_installed_set(client, &referenced, workers)?;
    problems.extend(invalid.iter().cloned().map(Problem::InvalidId));
    let invalid: HashSet<String> = invalid.into_iter().collect();

    let fetched = client.fetch_many(&referenced)?;
    for id in &fetched.missing {
        if !invalid.contains(id) && installed.has_item(id) {
            problems.push(Problem::UnfetchableItem(id.clone()));
        }
    }

    let items: Vec<(&Entry, ParsedEntry)> = installed
        .items
        .iter()
        .filter_map(|id| fetched.get(id))
        .map(|e| (e, e.parse()))
        .collect();
    debug!("checking {} fetched items", items.len());

    let keys = installed.mod_keys();
    for key in &keys {
        let known = match &key.owner {
            Some(owner) if invalid.contains(owner) => continue,
            Some(owner) if !installed.has_item(owner) => {
                problems.push(Problem::OrphanModKey {
                    key: key.to_string(),
                    owner: owner.clone(),
                });
                continue;
            }
            Some(owner) => match fetched.get(owner) {
                Some(entry) => entry.parse().declares_mod(&key.mod_id),
                None => continue,
            },
            None => items.iter().any(|(_, p)| p.declares_mod(&key.mod_id)),
        };
        if !known {
            problems.push(Problem::UnknownModKey(key.to_string()));
        }
    }

    for (entry, parsed) in &items {
        for mod_id in &parsed.mods {
            if !keys.iter().any(|k| k.matches(&entry.id, mod_id)) {
                problems.push(Problem::UnusedModId {
                    owner: entry.id.clone(),
                    mod_id: mod_id.clone(),
                });
            }
        }
    }

    for map in &installed.maps {
        if !items.iter().any(|(_, p)| p.declares_map(map)) {
            problems.push(Problem::UnknownMap(map.clone()));
        }
    }
    for (entry, parsed) in &items {
        for map in &parsed.maps {
            if !installed.has_map(map) {
                problems.push(Problem::UnusedMap {
                    owner: entry.id.clone(),
                    map: map.clone(),
                });
            }
        }
    }
    problems.extend(maps_listed_as_mods(installed, &keys, &items));

    let deps = parallel_map(&items, workers, |(entry, _)| {
        missing_dependencies_of(client, entry, &installed.items)
    })?;
    for ((entry, _), report) in items.iter().zip(deps) {
        for child in report.missing {
            problems.push(Problem::MissingDependency {
                required_by: entry.id.clone(),
                required_by_title: entry.title.clone(),
                id: child.id,
                title: Some(child.title),
            });
        }
        for id in report.unfetchable {
            problems.push(Problem::UnfetchableDependency {
                required_by: entry.id.clone(),
                id,
            });
        }
    }

    Ok(ProblemReport { problems })
}

fn maps_listed_as_mods(
    installed: &InstalledSet,
    keys: &[ModKey],
    items: &[(&Entry, ParsedEntry)],
) -> Vec<Problem> {
    keys.iter()
        .filter(|k| !installed.has_map(&k.mod_id))
        .filter(|k| items.iter().any(|(_, p)| p.declares_map(&k.mod_id)))
        .map(|k| Problem::MapListedAsMod {
            key: k.to_string(),
            map: k.mod_id.clone(),
        })
        .collect()
}
