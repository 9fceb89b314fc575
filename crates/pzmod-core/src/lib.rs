//! Catalog resolution and installed-list reconciliation for pzmod.
//!
//! This crate walks collections and dependency graphs through a
//! [`pzmod_catalog::CatalogClient`], validates an installed set against the
//! catalog, and computes new `WorkshopItems` / `Mods` / `Map` lists as pure
//! functions of already-resolved choices. Prompting is left to the caller: the
//! decision functions here take the choices as input and return the new state.

pub mod check;
pub mod collection;
pub mod concurrency;
pub mod deps;
pub mod installed;
pub mod lists;
pub mod summary;
pub mod workflow;

pub use check::{detect_problems, Problem, ProblemReport};
pub use collection::{expand_children, expand_collection, CollectionExpansion};
pub use concurrency::{install_interrupt_handler, parallel_map, CancelToken};
pub use deps::{
    missing_dependencies_deep, missing_dependencies_of, validate_installed_set, DependencyReport,
};
pub use installed::{ConfigKey, ConfigStore, InstalledSet, MemoryStore, ModKey};
pub use lists::{
    dedupe, filter, index_of, insert_at, join_list, parse_list, parse_map_list, position_options,
    surviving_position, ListError, Position,
};
pub use summary::{summarize, EntrySummary, Toggle};
pub use workflow::{
    add_choices, add_unattended, default_selection, install_collection, plan_add, plan_update,
    remove_all, remove_all_keep_maps, remove_all_maps, remove_entry, AddChoices, AddSelection,
    BulkInstallReport, InstallFailure, UpdateSelection,
};

use pzmod_catalog::EntryKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("catalog error: {0}")]
    Catalog(#[from] pzmod_catalog::CatalogError),
    #[error("list error: {0}")]
    List(#[from] ListError),
    #[error("workshop item not found: {0}")]
    NotFound(String),
    #[error("workshop item {id} is a {kind}, not a mod")]
    NotAPackage { id: String, kind: EntryKind },
    #[error("workshop item {0} is not a collection")]
    NotACollection(String),
    #[error("could not parse any Mod ID from '{title}' ({id})")]
    NoModIds { id: String, title: String },
    #[error("no mods selected")]
    NoModsSelected,
    #[error("operation cancelled")]
    Cancelled,
}
