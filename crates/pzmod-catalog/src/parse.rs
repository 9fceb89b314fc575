//! Extraction of mod IDs and map folders from entry descriptions.
//!
//! Authors advertise identifiers with line prefixes such as `Mod ID: Foo` or
//! `Map Folder: Bar`. Matching is case-sensitive and prefix-based; lines that
//! match no prefix are ignored.

use crate::Entry;
use std::collections::HashSet;

const MOD_PREFIXES: [&str; 2] = ["Mod ID: ", "ModID: "];
const MAP_PREFIX: &str = "Map Folder: ";

/// Identifiers declared by one entry, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEntry {
    pub mods: Vec<String>,
    pub maps: Vec<String>,
}

impl ParsedEntry {
    pub fn has_mods(&self) -> bool {
        !self.mods.is_empty()
    }

    pub fn declares_mod(&self, mod_id: &str) -> bool {
        self.mods.iter().any(|m| m == mod_id)
    }

    pub fn declares_map(&self, map: &str) -> bool {
        self.maps.iter().any(|m| m == map)
    }
}

pub fn parse_description(description: &str) -> ParsedEntry {
    let mut parsed = ParsedEntry::default();
    let mut seen_mods = HashSet::new();
    let mut seen_maps = HashSet::new();

    for line in description.lines() {
        let line = line.trim();
        if let Some(rest) = MOD_PREFIXES.iter().find_map(|p| line.strip_prefix(p)) {
            let value = rest.trim();
            if !value.is_empty() && seen_mods.insert(value.to_owned()) {
                parsed.mods.push(value.to_owned());
            }
        } else if let Some(rest) = line.strip_prefix(MAP_PREFIX) {
            let value = rest.trim();
            if !value.is_empty() && seen_maps.insert(value.to_owned()) {
                parsed.maps.push(value.to_owned());
            }
        }
    }

    parsed
}

impl Entry {
    pub fn parse(&self) -> ParsedEntry {
        parse_description(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_spellings_deduped_in_order() {
        let parsed = parse_description("Mod ID: A\nModID: B\nMod ID: A\nMap Folder: M1");
        assert_eq!(parsed.mods, vec!["A", "B"]);
        assert_eq!(parsed.maps, vec!["M1"]);
    }

    #[test]
    fn unmatched_lines_ignored() {
        let parsed = parse_description("A great mod.\nWorkshop ID: 123\nmod id: lower\n");
        assert!(parsed.mods.is_empty());
        assert!(parsed.maps.is_empty());
        assert!(!parsed.has_mods());
    }

    #[test]
    fn crlf_and_indentation_tolerated() {
        let parsed = parse_description("  Mod ID: Foo  \r\nMap Folder: Muldraugh, KY\r\n");
        assert_eq!(parsed.mods, vec!["Foo"]);
        assert_eq!(parsed.maps, vec!["Muldraugh, KY"]);
    }

    #[test]
    fn empty_values_skipped() {
        let parsed = parse_description("Mod ID: \nModID:    \nMod ID: Real");
        assert_eq!(parsed.mods, vec!["Real"]);
    }

    #[test]
    fn prefix_must_start_line() {
        let parsed = parse_description("See Mod ID: Nope");
        assert!(parsed.mods.is_empty());
    }

    #[test]
    fn entry_parse_uses_description() {
        let entry = Entry::package("1", "t", "Mod ID: X\nMap Folder: Y");
        let parsed = entry.parse();
        assert!(parsed.declares_mod("X"));
        assert!(parsed.declares_map("Y"));
        assert!(!parsed.declares_map("X"));
    }
}
