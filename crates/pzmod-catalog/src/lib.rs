//! Workshop catalog access for pzmod.
//!
//! This crate fetches entry details (packages and collections) from the workshop
//! details service in fixed-size batches, keeps a TTL cache of fetched entries,
//! and parses entry descriptions into mod and map identifiers. The network side
//! sits behind the [`CatalogBackend`] trait so callers can swap the HTTP backend
//! for the in-memory [`MockCatalog`].

pub mod cache;
pub mod client;
pub mod config;
pub mod entry;
pub mod http;
pub mod mock;
pub mod parse;

pub use cache::{CatalogCache, DEFAULT_TTL_SECS};
pub use client::{CatalogClient, FetchResult};
pub use config::CatalogConfig;
pub use entry::{find_entry, titles_by_id, ChildRef, Entry, EntryKind, EntryStatus, WireItem};
pub use http::HttpBackend;
pub use mock::MockCatalog;
pub use parse::{parse_description, ParsedEntry};

/// Maximum number of IDs the details service accepts in one request.
pub const MAX_BATCH: usize = 10;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog API key was rejected; set a valid key and retry")]
    Unauthorized,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("catalog config error: {0}")]
    Config(String),
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Whether the caller should suggest re-entering the API key.
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Trait for catalog backends.
pub trait CatalogBackend: Send + Sync {
    /// Fetch one batch of at most [`MAX_BATCH`] IDs, children included.
    ///
    /// Every returned row carries its own status; IDs the service does not
    /// know come back as rows with [`EntryStatus::NotFound`] or are omitted.
    fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Entry>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_credential_error() {
        assert!(CatalogError::Unauthorized.is_credential_error());
        assert!(!CatalogError::Http("HTTP 500".to_owned()).is_credential_error());
    }

    #[test]
    fn unauthorized_message_mentions_key() {
        let msg = CatalogError::Unauthorized.to_string();
        assert!(msg.contains("API key"));
    }
}
