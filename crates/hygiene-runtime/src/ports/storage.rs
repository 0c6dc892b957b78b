use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Errors from blob storage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Failed to sign URL: {0}")]
    Presign(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Where an upload landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    /// Content checksum
    pub etag: Option<String>,
    pub size_bytes: u64,
}

/// Port for the blob store holding audit images.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Store `bytes` under `key` in the provider's bucket.
    async fn upload(
        &self,
        bytes: &[u8],
        key: &str,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<StoredObject, StorageError>;

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Time-limited URL for reviewers to view an image.
    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Bucket that uploads go to.
    fn bucket(&self) -> &str;

    fn storage_uri(&self, bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }
}
