use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use std::{collections::HashMap, path::PathBuf};
use tokio::sync::RwLock;

/// Opaque byte store holding named documents.
///
/// `set` must replace a document atomically: a concurrent `get` sees either
/// the old bytes or the new bytes, never a mix.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// In-process store, mostly for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON file per key under a directory.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the document stored under `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ScrapeError::storage(&format!("failed to read {}", path.display()), e)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ScrapeError::storage("failed to prepare store directory", e))?;

        let path = self.path_for(key);
        let temp_path = self.dir.join(format!(".{}.{}.tmp", key, std::process::id()));

        tokio::fs::write(&temp_path, value)
            .await
            .map_err(|e| ScrapeError::storage("failed to write store payload", e))?;

        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| ScrapeError::storage("failed to finalize store payload", e))?;

        Ok(())
    }
}
