use crate::{CatalogError, DEFAULT_TTL_SECS, MAX_BATCH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.steampowered.com";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_batch_size() -> usize {
    MAX_BATCH
}

fn default_workers() -> usize {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Worker threads for bulk validation and collection installs.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl CatalogConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_url: default_api_url(),
            api_key: api_key.to_owned(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            batch_size: default_batch_size(),
            workers: default_workers(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: &str) -> Self {
        self.api_url = url.trim_end_matches('/').to_owned();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Batch size clamped to what the service accepts.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH)
    }

    /// Load config from `~/.config/pzmod/catalog.json`.
    pub fn load_default() -> Result<Self, CatalogError> {
        let path = default_config_path()?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| CatalogError::Config(format!("invalid catalog config: {e}")))?;
        if config.api_key.trim().is_empty() {
            return Err(CatalogError::Config("api_key is empty".to_owned()));
        }
        config.api_url = config.api_url.trim_end_matches('/').to_owned();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CatalogError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, CatalogError> {
    let home =
        std::env::var("HOME").map_err(|_| CatalogError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/pzmod/catalog.json"))
}
