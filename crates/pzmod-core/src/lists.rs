//! Order-preserving algorithms over the semicolon-separated config lists.
//!
//! Order is load order for the game server, so none of these functions sort.
//! Nothing here touches the network or the cache.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("'{0}' is not in the list")]
    AnchorNotFound(String),
}

/// Where new elements go in a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Start,
    End,
    After(String),
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "Add to the start of the list"),
            Self::End => write!(f, "Add to the end of the list"),
            Self::After(anchor) => write!(f, "{anchor}"),
        }
    }
}

/// Stable dedupe, first occurrence wins.
pub fn dedupe(list: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(list.len());
    list.iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

pub fn index_of(list: &[String], value: &str) -> Option<usize> {
    list.iter().position(|item| item == value)
}

pub fn contains(list: &[String], value: &str) -> bool {
    index_of(list, value).is_some()
}

pub fn filter(list: &[String], mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
    list.iter().filter(|item| keep(item.as_str())).cloned().collect()
}

/// Insert `items` into `list` at `position`, keeping their relative order.
///
/// Does not dedupe; callers dedupe before writing the list back.
pub fn insert_at(
    list: &[String],
    items: &[String],
    position: &Position,
) -> Result<Vec<String>, ListError> {
    let at = match position {
        Position::Start => 0,
        Position::End => list.len(),
        Position::After(anchor) => {
            index_of(list, anchor).ok_or_else(|| ListError::AnchorNotFound(anchor.clone()))? + 1
        }
    };

    let mut out = Vec::with_capacity(list.len() + items.len());
    out.extend_from_slice(&list[..at]);
    out.extend_from_slice(items);
    out.extend_from_slice(&list[at..]);
    Ok(out)
}

/// Carry `position` over from `original` to `kept`, a filtered copy of it.
///
/// An anchor that was filtered out is replaced by the nearest surviving
/// element before it, or by the start of the list when none survives.
/// Anchors unknown to `original` are returned unchanged.
pub fn surviving_position(original: &[String], kept: &[String], position: &Position) -> Position {
    let Position::After(anchor) = position else {
        return position.clone();
    };
    if contains(kept, anchor) {
        return position.clone();
    }
    let Some(at) = index_of(original, anchor) else {
        return position.clone();
    };
    original[..at]
        .iter()
        .rev()
        .find(|item| contains(kept, item))
        .map_or(Position::Start, |item| Position::After(item.clone()))
}

/// Positions a prompt can offer for `list`: start, end, then after each element.
pub fn position_options(list: &[String]) -> Vec<Position> {
    let mut options = vec![Position::Start, Position::End];
    options.extend(list.iter().cloned().map(Position::After));
    options
}

/// Split a stored list value.
///
/// Fields are `;`-separated; a `,` inside a field is accepted as an alternate
/// separator. Whitespace is trimmed, empty fields dropped, duplicates removed.
pub fn parse_list(value: &str) -> Vec<String> {
    let items: Vec<String> = value
        .split(';')
        .flat_map(|field| field.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect();
    dedupe(&items)
}

/// Split a stored map list. Map folder names may contain commas
/// (`Muldraugh, KY`), so only `;` separates fields here.
pub fn parse_map_list(value: &str) -> Vec<String> {
    let items: Vec<String> = value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect();
    dedupe(&items)
}

pub fn join_list(list: &[String]) -> String {
    list.join(";")
}
