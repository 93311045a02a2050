//! Filesystem-backed document store.
//!
//! Keys produced by the pipeline are relative slash-separated paths; they are
//! validated here before touching the filesystem so a malicious file name can
//! never escape the storage root.

use async_trait::async_trait;
use docgate::{DocumentStore, StorageError};
use std::path::{Component, Path, PathBuf};

pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "key must be a plain relative path: {key}"
                    )))
                }
            }
        }
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn put(&self, key: &str, bytes: &[u8], _mime: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::Io(err.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| StorageError::Io(err.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|err| StorageError::Io(err.to_string()))
    }
}
