use crate::lists::{dedupe, join_list, parse_list, parse_map_list};
use std::collections::BTreeMap;
use std::fmt;

/// Separator between owner entry ID and mod ID in a stored mod key.
pub const MOD_KEY_SEPARATOR: char = '\\';

/// Keys of the three lists in the server config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Items,
    Mods,
    Maps,
}

impl ConfigKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Items => "WorkshopItems",
            Self::Mods => "Mods",
            Self::Maps => "Map",
        }
    }
}

/// Key/value store holding the persisted lists.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory [`ConfigStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }
}

/// A stored mod reference: `<owner entry ID>\<mod ID>`.
///
/// Older configs may hold bare mod IDs; those parse with no owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModKey {
    pub owner: Option<String>,
    pub mod_id: String,
}

impl ModKey {
    pub fn new(owner: &str, mod_id: &str) -> Self {
        Self {
            owner: Some(owner.to_owned()),
            mod_id: mod_id.to_owned(),
        }
    }

    /// Split on the first separator; entry IDs never contain one, mod IDs may.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(MOD_KEY_SEPARATOR) {
            Some((owner, mod_id)) if !owner.is_empty() => Self {
                owner: Some(owner.to_owned()),
                mod_id: mod_id.to_owned(),
            },
            _ => Self {
                owner: None,
                mod_id: raw.to_owned(),
            },
        }
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner.as_deref() == Some(owner)
    }

    /// Whether this key refers to `mod_id` declared by `owner`. Bare keys
    /// match any owner.
    pub fn matches(&self, owner: &str, mod_id: &str) -> bool {
        self.mod_id == mod_id
            && match self.owner.as_deref() {
                Some(o) => o == owner,
                None => true,
            }
    }
}

impl fmt::Display for ModKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{owner}{MOD_KEY_SEPARATOR}{}", self.mod_id),
            None => write!(f, "{}", self.mod_id),
        }
    }
}

/// The operator's current selection, as stored in the server config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledSet {
    pub items: Vec<String>,
    pub mods: Vec<String>,
    pub maps: Vec<String>,
}

impl InstalledSet {
    pub fn new(items: &[&str], mods: &[&str], maps: &[&str]) -> Self {
        let own = |l: &[&str]| -> Vec<String> { l.iter().map(|s| (*s).to_owned()).collect() };
        Self {
            items: own(items),
            mods: own(mods),
            maps: own(maps),
        }
    }

    pub fn load(store: &dyn ConfigStore) -> Self {
        let read = |key: ConfigKey, parse: fn(&str) -> Vec<String>| {
            store
                .get(key.as_str())
                .map(|v| parse(&v))
                .unwrap_or_default()
        };
        Self {
            items: read(ConfigKey::Items, parse_list),
            mods: read(ConfigKey::Mods, parse_list),
            maps: read(ConfigKey::Maps, parse_map_list),
        }
    }

    /// Write all three lists back, deduped.
    pub fn save(&self, store: &mut dyn ConfigStore) {
        store.set(ConfigKey::Items.as_str(), &join_list(&dedupe(&self.items)));
        store.set(ConfigKey::Mods.as_str(), &join_list(&dedupe(&self.mods)));
        store.set(ConfigKey::Maps.as_str(), &join_list(&dedupe(&self.maps)));
    }

    #[must_use]
    pub fn deduped(mut self) -> Self {
        self.items = dedupe(&self.items);
        self.mods = dedupe(&self.mods);
        self.maps = dedupe(&self.maps);
        self
    }

    pub fn mod_keys(&self) -> Vec<ModKey> {
        self.mods.iter().map(|m| ModKey::parse(m)).collect()
    }

    /// Mod IDs currently enabled for `owner`, in list order.
    pub fn enabled_mods_of(&self, owner: &str) -> Vec<String> {
        self.mod_keys()
            .into_iter()
            .filter(|k| k.is_owned_by(owner))
            .map(|k| k.mod_id)
            .collect()
    }

    pub fn has_item(&self, id: &str) -> bool {
        self.items.iter().any(|i| i == id)
    }

    pub fn has_map(&self, map: &str) -> bool {
        self.maps.iter().any(|m| m == map)
    }

    /// Item IDs plus mod key owners, first occurrence order.
    pub fn referenced_ids(&self) -> Vec<String> {
        let mut ids = self.items.clone();
        ids.extend(self.mod_keys().into_iter().filter_map(|k| k.owner));
        dedupe(&ids)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.mods.is_empty() && self.maps.is_empty()
    }
}
