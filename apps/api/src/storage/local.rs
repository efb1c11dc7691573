use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::storage::{ArtifactKey, ArtifactStore, StorageError};

/// Stores artifacts as plain files under `root`, mirroring the key layout.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store(&self, key: &ArtifactKey, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let write_err = |e: io::Error| StorageError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let partial = path.with_extension(format!("{}.partial", key.kind().extension()));
        tokio::fs::write(&partial, &bytes).await.map_err(write_err)?;
        tokio::fs::rename(&partial, &path).await.map_err(write_err)?;

        debug!(key = %key, bytes = bytes.len(), "Stored artifact on local disk");
        Ok(())
    }

    async fn fetch(&self, key: &ArtifactKey) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(self.path_for(key)).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound {
                    key: key.to_string(),
                }
            } else {
                StorageError::Read {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }

    async fn remove(&self, keys: &[ArtifactKey]) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in keys {
            match tokio::fs::remove_file(self.path_for(key)).await {
                Ok(()) => debug!(key = %key, "Removed artifact from local disk"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    first_error.get_or_insert(StorageError::Delete {
                        key: key.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        // Drop folders left empty, deepest first; non-empty ones stay.
        let mut dirs: Vec<PathBuf> = keys
            .iter()
            .filter_map(|key| self.path_for(key).parent().map(PathBuf::from))
            .collect();
        dirs.sort_by(|a, b| {
            b.components()
                .count()
                .cmp(&a.components().count())
                .then_with(|| a.cmp(b))
        });
        dirs.dedup();
        for dir in dirs {
            let _ = tokio::fs::remove_dir(dir).await;
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
