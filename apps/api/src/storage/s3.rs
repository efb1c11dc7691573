use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::info;

use crate::storage::{ArtifactKey, ArtifactStore, StorageError};

/// Artifacts in an S3-compatible bucket (AWS, MinIO, Supabase storage).
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn store(&self, key: &ArtifactKey, bytes: Vec<u8>) -> Result<(), StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(ByteStream::from(bytes))
            .content_type(key.kind().content_type())
            .send()
            .await
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: e.into_service_error().to_string(),
            })?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn fetch(&self, key: &ArtifactKey) -> Result<Vec<u8>, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_no_such_key() {
                    StorageError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Read {
                        key: key.to_string(),
                        reason: err.to_string(),
                    }
                }
            })?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            })?
            .into_bytes()
            .to_vec();
        Ok(body)
    }

    async fn remove(&self, keys: &[ArtifactKey]) -> Result<(), StorageError> {
        // DeleteObject succeeds for absent keys, so retries are harmless.
        let mut first_error = None;
        for key in keys {
            let result = self
                .client
                .delete_object()
                .bucket(&self.bucket)
                .key(key.as_str())
                .send()
                .await;
            match result {
                Ok(_) => info!("Deleted s3://{}/{}", self.bucket, key),
                Err(e) => {
                    first_error.get_or_insert(StorageError::Delete {
                        key: key.to_string(),
                        reason: e.into_service_error().to_string(),
                    });
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}
