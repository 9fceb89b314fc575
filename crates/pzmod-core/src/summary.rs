use crate::installed::InstalledSet;
use pzmod_catalog::Entry;
use serde::Serialize;

/// A declared value and whether the installed lists enable it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toggle {
    pub name: String,
    pub enabled: bool,
}

/// One row of the installed-mods listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub mods: Vec<Toggle>,
    pub maps: Vec<Toggle>,
    pub has_mods: bool,
}

/// Describe each of `entries` against `installed`, in entry order.
pub fn summarize(entries: &[Entry], installed: &InstalledSet) -> Vec<EntrySummary> {
    let keys = installed.mod_keys();
    entries
        .iter()
        .map(|entry| {
            let parsed = entry.parse();
            EntrySummary {
                id: entry.id.clone(),
                title: entry.title.clone(),
                url: entry.workshop_url(),
                has_mods: parsed.has_mods(),
                mods: parsed
                    .mods
                    .iter()
                    .map(|m| Toggle {
                        name: m.clone(),
                        enabled: keys.iter().any(|k| k.matches(&entry.id, m)),
                    })
                    .collect(),
                maps: parsed
                    .maps
                    .iter()
                    .map(|m| Toggle {
                        name: m.clone(),
                        enabled: installed.has_map(m),
                    })
                    .collect(),
            }
        })
        .collect()
}
