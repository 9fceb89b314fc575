use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Per-item result code the details service uses for a readable entry.
pub const RESULT_OK: i64 = 1;
/// Result code used for rows the service could not find.
pub const RESULT_NOT_FOUND: i64 = 9;

pub const FILE_TYPE_PACKAGE: i64 = 0;
pub const FILE_TYPE_COLLECTION: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Package,
    Collection,
    Other(i64),
}

impl EntryKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            FILE_TYPE_PACKAGE => Self::Package,
            FILE_TYPE_COLLECTION => Self::Collection,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Package => FILE_TYPE_PACKAGE,
            Self::Collection => FILE_TYPE_COLLECTION,
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Package => write!(f, "package"),
            Self::Collection => write!(f, "collection"),
            Self::Other(code) => write!(f, "kind {code}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Found,
    NotFound,
}

/// A declared child of an entry. A reference only, not ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRef {
    pub id: String,
    pub kind: i64,
}

/// A catalog entry as fetched from the details service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub kind: EntryKind,
    pub title: String,
    pub size_bytes: u64,
    pub description: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub children: Vec<ChildRef>,
    pub status: EntryStatus,
}

impl Entry {
    /// A found package entry with the given description.
    pub fn package(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_owned(),
            kind: EntryKind::Package,
            title: title.to_owned(),
            size_bytes: 0,
            description: description.to_owned(),
            creator: String::new(),
            banned: false,
            children: Vec::new(),
            status: EntryStatus::Found,
        }
    }

    /// A found collection entry whose children are all declared as packages.
    pub fn collection(id: &str, title: &str, children: &[&str]) -> Self {
        Self {
            kind: EntryKind::Collection,
            children: children
                .iter()
                .map(|c| ChildRef {
                    id: (*c).to_owned(),
                    kind: FILE_TYPE_PACKAGE,
                })
                .collect(),
            ..Self::package(id, title, "")
        }
    }

    /// Placeholder row for an ID the service did not return.
    pub fn not_found(id: &str) -> Self {
        Self {
            kind: EntryKind::Other(-1),
            status: EntryStatus::NotFound,
            ..Self::package(id, "", "")
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: &[&str]) -> Self {
        self.children = children
            .iter()
            .map(|c| ChildRef {
                id: (*c).to_owned(),
                kind: FILE_TYPE_PACKAGE,
            })
            .collect();
        self
    }

    #[must_use]
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn is_found(&self) -> bool {
        self.status == EntryStatus::Found
    }

    pub fn is_package(&self) -> bool {
        self.kind == EntryKind::Package
    }

    pub fn is_collection(&self) -> bool {
        self.kind == EntryKind::Collection
    }

    pub fn child_ids(&self) -> Vec<String> {
        self.children.iter().map(|c| c.id.clone()).collect()
    }

    pub fn workshop_url(&self) -> String {
        format!(
            "https://steamcommunity.com/sharedfiles/filedetails/?id={}",
            self.id
        )
    }
}

/// Find an entry by ID in a fetched slice.
pub fn find_entry<'a>(entries: &'a [Entry], id: &str) -> Option<&'a Entry> {
    entries.iter().find(|e| e.id == id)
}

/// Map entry IDs to their titles, for prompt descriptions.
pub fn titles_by_id(entries: &[Entry]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|e| (e.id.clone(), e.title.clone()))
        .collect()
}

// --- Wire format ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireChild {
    #[serde(rename = "publishedfileid")]
    pub published_file_id: String,
    #[serde(default)]
    pub file_type: i64,
}

/// One row of a details response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireItem {
    #[serde(default)]
    pub result: i64,
    #[serde(rename = "publishedfileid")]
    pub published_file_id: String,
    #[serde(default)]
    pub file_type: i64,
    #[serde(default, deserialize_with = "size_from_int_or_string")]
    pub file_size: u64,
    #[serde(default)]
    pub creator: String,
    #[serde(default, rename = "file_description")]
    pub description: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub children: Vec<WireChild>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireDetails {
    #[serde(default)]
    pub publishedfiledetails: Vec<WireItem>,
}

#[derive(Debug, Deserialize)]
pub struct WireResponse {
    pub response: WireDetails,
}

/// The service reports sizes either as a JSON number or as a numeric string.
fn size_from_int_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Int(u64),
        Text(String),
    }

    match RawSize::deserialize(deserializer)? {
        RawSize::Int(n) => Ok(n),
        RawSize::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid file_size '{s}': {e}"))),
    }
}

impl From<WireItem> for Entry {
    fn from(item: WireItem) -> Self {
        let status = if item.result == RESULT_OK {
            EntryStatus::Found
        } else {
            EntryStatus::NotFound
        };
        Self {
            id: item.published_file_id,
            kind: EntryKind::from_code(item.file_type),
            title: item.title,
            size_bytes: item.file_size,
            description: item.description,
            creator: item.creator,
            banned: item.banned,
            children: item
                .children
                .into_iter()
                .map(|c| ChildRef {
                    id: c.published_file_id,
                    kind: c.file_type,
                })
                .collect(),
            status,
        }
    }
}

impl From<&Entry> for WireItem {
    fn from(entry: &Entry) -> Self {
        Self {
            result: if entry.is_found() {
                RESULT_OK
            } else {
                RESULT_NOT_FOUND
            },
            published_file_id: entry.id.clone(),
            file_type: entry.kind.code(),
            file_size: entry.size_bytes,
            creator: entry.creator.clone(),
            description: entry.description.clone(),
            title: entry.title.clone(),
            banned: entry.banned,
            children: entry
                .children
                .iter()
                .map(|c| WireChild {
                    published_file_id: c.id.clone(),
                    file_type: c.kind,
                })
                .collect(),
        }
    }
}
