// Durable storage for rendered artifacts. Every backend implements the same
// `ArtifactStore` contract so orchestration never branches on the backend.

pub mod local;
pub mod s3;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use local::LocalArtifactStore;
pub use s3::S3ArtifactStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Failed to write {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to read {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Failed to delete {key}: {reason}")]
    Delete { key: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Source,
    Binary,
    Preview,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Source,
        ArtifactKind::Binary,
        ArtifactKind::Preview,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Source => "tex",
            ArtifactKind::Binary => "pdf",
            ArtifactKind::Preview => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::Source => "application/x-tex",
            ArtifactKind::Binary => "application/pdf",
            ArtifactKind::Preview => "image/png",
        }
    }
}

/// Backend-agnostic object key: `{id}/resume_{id}.{ext}`. The per-resume
/// folder keeps every resume's artifacts under its own prefix.
///
/// Output of a failed render goes to `{id}/attempt/resume_{id}.{ext}` so the
/// committed set the record points to is never overwritten by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    key: String,
    kind: ArtifactKind,
}

impl ArtifactKey {
    pub fn new(resume_id: Uuid, kind: ArtifactKind) -> Self {
        Self {
            key: format!(
                "{}resume_{resume_id}.{}",
                resume_prefix(resume_id),
                kind.extension()
            ),
            kind,
        }
    }

    pub fn attempt(resume_id: Uuid, kind: ArtifactKind) -> Self {
        Self {
            key: format!(
                "{}{ATTEMPT_DIR}/resume_{resume_id}.{}",
                resume_prefix(resume_id),
                kind.extension()
            ),
            kind,
        }
    }

    /// The three keys a successful render commits.
    pub fn committed(resume_id: Uuid) -> Vec<ArtifactKey> {
        ArtifactKind::ALL
            .into_iter()
            .map(|kind| ArtifactKey::new(resume_id, kind))
            .collect()
    }

    /// Keys a failed render may leave behind. A failure never gets as far as
    /// a preview.
    pub fn attempts(resume_id: Uuid) -> Vec<ArtifactKey> {
        [ArtifactKind::Source, ArtifactKind::Binary]
            .into_iter()
            .map(|kind| ArtifactKey::attempt(resume_id, kind))
            .collect()
    }

    /// Every key a resume can own.
    pub fn all_for(resume_id: Uuid) -> Vec<ArtifactKey> {
        let mut keys = Self::committed(resume_id);
        keys.extend(Self::attempts(resume_id));
        keys
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

const ATTEMPT_DIR: &str = "attempt";

pub fn resume_prefix(resume_id: Uuid) -> String {
    format!("{resume_id}/")
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Writes `bytes` at `key`, replacing whatever was there.
    async fn store(&self, key: &ArtifactKey, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Reads the object at `key`; `StorageError::NotFound` when absent.
    async fn fetch(&self, key: &ArtifactKey) -> Result<Vec<u8>, StorageError>;

    /// Deletes every key. Absent keys are not an error. All keys are attempted
    /// and the first failure is returned.
    async fn remove(&self, keys: &[ArtifactKey]) -> Result<(), StorageError>;

    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = Uuid::nil();
        let key = ArtifactKey::new(id, ArtifactKind::Binary);
        assert_eq!(
            key.as_str(),
            "00000000-0000-0000-0000-000000000000/resume_00000000-0000-0000-0000-000000000000.pdf"
        );
        assert_eq!(key.file_name(), "resume_00000000-0000-0000-0000-000000000000.pdf");
        assert!(key.as_str().starts_with(&resume_prefix(id)));
    }

    #[test]
    fn test_committed_covers_each_kind_once() {
        let keys = ArtifactKey::committed(Uuid::new_v4());
        let exts: Vec<_> = keys.iter().map(|k| k.kind().extension()).collect();
        assert_eq!(exts, vec!["tex", "pdf", "png"]);
    }

    #[test]
    fn test_attempt_keys_stay_under_prefix_and_apart_from_committed() {
        let id = Uuid::new_v4();
        let attempt = ArtifactKey::attempt(id, ArtifactKind::Source);
        assert_eq!(attempt.as_str(), format!("{id}/attempt/resume_{id}.tex"));
        assert_ne!(attempt, ArtifactKey::new(id, ArtifactKind::Source));

        let all = ArtifactKey::all_for(id);
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|k| k.as_str().starts_with(&resume_prefix(id))));
        assert!(all.contains(&attempt));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(ArtifactKind::Binary.content_type(), "application/pdf");
        assert_eq!(ArtifactKind::Preview.content_type(), "image/png");
    }
}
