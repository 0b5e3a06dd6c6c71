use crate::{
    error::{Result, ScrapeError},
    extract::SelectorTable,
    store::{FileStore, MergeStore, merge::DEFAULT_STORAGE_KEY},
};
use serde::{Deserialize, Serialize};
use std::{path::{Path, PathBuf}, sync::Arc, time::Duration};

/// Where the dataset lives and which selector table drives extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory of the file-backed store
    pub data_dir: PathBuf,

    /// Name of the persisted dataset document
    pub storage_key: String,

    /// JSON selector table; the built-in layout when unset
    pub selectors: Option<PathBuf>,

    /// How long the terminal status badge stays on the page
    pub dismiss_after_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".crm-scrape"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            selectors: None,
            dismiss_after_ms: 1500,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json)
            .map_err(|e| ScrapeError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn selectors(mut self, path: impl Into<PathBuf>) -> Self {
        self.selectors = Some(path.into());
        self
    }

    pub fn dismiss_after_ms(mut self, millis: u64) -> Self {
        self.dismiss_after_ms = millis;
        self
    }

    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.dismiss_after_ms)
    }

    pub fn load_selectors(&self) -> Result<SelectorTable> {
        match &self.selectors {
            Some(path) => SelectorTable::from_file(path),
            None => Ok(SelectorTable::default()),
        }
    }

    /// Merge store over a [`FileStore`] in `data_dir`
    pub fn open_store(&self) -> MergeStore {
        MergeStore::new(Arc::new(FileStore::new(&self.data_dir))).with_key(&self.storage_key)
    }
}
