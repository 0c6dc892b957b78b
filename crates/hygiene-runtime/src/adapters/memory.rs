//! In-memory storage and repository adapters.
//!
//! Used for local runs, the CLI and tests. Both are safe to share across
//! tasks.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use uuid::Uuid;

use hygiene_core::{AuditResult, CleanlinessStatus};

use crate::cache::content_hash;
use crate::ports::{AuditRepository, RepositoryError, StorageError, StorageProvider, StoredObject};

#[derive(Debug, Clone)]
struct Blob {
    bytes: Vec<u8>,
    content_type: String,
    metadata: BTreeMap<String, String>,
    version: u64,
}

/// Blob store backed by a map, keyed by `(bucket, key)`.
///
/// Re-uploading a key bumps its version, like a versioned bucket.
#[derive(Debug)]
pub struct InMemoryStorage {
    bucket: String,
    objects: RwLock<HashMap<(String, String), Blob>>,
}

impl InMemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Content type and user metadata recorded for an object.
    pub fn object_info(&self, key: &str) -> Option<(String, BTreeMap<String, String>)> {
        self.objects
            .read()
            .get(&(self.bucket.clone(), key.to_string()))
            .map(|blob| (blob.content_type.clone(), blob.metadata.clone()))
    }
}

#[async_trait]
impl StorageProvider for InMemoryStorage {
    async fn upload(
        &self,
        bytes: &[u8],
        key: &str,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<StoredObject, StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::Upload("object key is empty".to_string()));
        }

        let mut objects = self.objects.write();
        let slot = (self.bucket.clone(), key.to_string());
        let version = objects.get(&slot).map_or(1, |blob| blob.version + 1);

        objects.insert(
            slot,
            Blob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
                version,
            },
        );

        tracing::debug!(bucket = %self.bucket, key, size = bytes.len(), version, "Stored object");

        Ok(StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            version_id: Some(format!("v{}", version)),
            etag: Some(format!("{:016x}", content_hash(bytes))),
            size_bytes: bytes.len() as u64,
        })
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        if !self
            .objects
            .read()
            .contains_key(&(bucket.to_string(), key.to_string()))
        {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        // Deleting a missing object succeeds, as with S3
        self.objects
            .write()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Audit repository backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    audits: RwLock<HashMap<Uuid, AuditResult>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.audits.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.audits.read().is_empty()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn save(&self, audit: &AuditResult) -> Result<(), RepositoryError> {
        self.audits.write().insert(audit.audit_id(), audit.clone());
        tracing::debug!(audit_id = %audit.audit_id(), "Saved audit to memory");
        Ok(())
    }

    async fn save_unless_finalized(&self, audit: &AuditResult) -> Result<bool, RepositoryError> {
        let mut audits = self.audits.write();
        if audits
            .get(&audit.audit_id())
            .is_some_and(AuditResult::is_finalized)
        {
            tracing::debug!(audit_id = %audit.audit_id(), "Stored audit already reviewed, not replaced");
            return Ok(false);
        }
        audits.insert(audit.audit_id(), audit.clone());
        Ok(true)
    }

    async fn find_by_id(&self, audit_id: Uuid) -> Result<Option<AuditResult>, RepositoryError> {
        Ok(self.audits.read().get(&audit_id).cloned())
    }

    async fn find_by_dealer_and_checkpoint(
        &self,
        dealer_id: &str,
        checkpoint_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditResult>, RepositoryError> {
        let mut results: Vec<AuditResult> = self
            .audits
            .read()
            .values()
            .filter(|audit| {
                audit.image_metadata().dealer_id() == dealer_id
                    && audit.image_metadata().checkpoint_id() == checkpoint_id
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| b.analyzed_at().cmp(&a.analyzed_at()));
        results.truncate(limit);
        Ok(results)
    }

    async fn find_pending_reviews(&self, limit: usize) -> Result<Vec<AuditResult>, RepositoryError> {
        let mut results: Vec<AuditResult> = self
            .audits
            .read()
            .values()
            .filter(|audit| audit.requires_review() && !audit.is_finalized())
            .cloned()
            .collect();

        results.sort_by_key(|audit| audit.analyzed_at());
        results.truncate(limit);
        Ok(results)
    }

    async fn count_by_status(
        &self,
        dealer_id: &str,
    ) -> Result<BTreeMap<CleanlinessStatus, u64>, RepositoryError> {
        let mut counts: BTreeMap<CleanlinessStatus, u64> =
            CleanlinessStatus::all().into_iter().map(|s| (s, 0)).collect();

        for audit in self
            .audits
            .read()
            .values()
            .filter(|audit| audit.image_metadata().dealer_id() == dealer_id)
        {
            *counts.entry(audit.status()).or_insert(0) += 1;
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use hygiene_core::{ConfidenceScore, ImageMetadata};

    fn audit(dealer: &str, checkpoint: &str, status: CleanlinessStatus, minute: u32) -> AuditResult {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap();
        let metadata = ImageMetadata::builder(dealer, checkpoint, "user-1")
            .location("audits", format!("{}/{}/{}.jpg", dealer, checkpoint, minute))
            .size_bytes(1024)
            .captured_at(at)
            .build();
        AuditResult::builder(metadata, vec![], ConfidenceScore::zero(), status)
            .analyzed_at(at + ChronoDuration::seconds(5))
            .build()
    }

    #[tokio::test]
    async fn test_storage_round_trip() {
        let storage = InMemoryStorage::new("audits");
        let stored = storage
            .upload(b"jpeg-bytes", "d1/c1/a.jpg", "image/jpeg", &BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(stored.bucket, "audits");
        assert_eq!(stored.size_bytes, 10);
        assert_eq!(stored.version_id.as_deref(), Some("v1"));
        assert_eq!(storage.download("audits", "d1/c1/a.jpg").await.unwrap(), b"jpeg-bytes");
        assert_eq!(storage.storage_uri("audits", "d1/c1/a.jpg"), "s3://audits/d1/c1/a.jpg");
    }

    #[tokio::test]
    async fn test_storage_versions_and_etag() {
        let storage = InMemoryStorage::new("audits");
        let first = storage.upload(b"one", "k.jpg", "image/jpeg", &BTreeMap::new()).await.unwrap();
        let second = storage.upload(b"two", "k.jpg", "image/jpeg", &BTreeMap::new()).await.unwrap();
        let same = storage.upload(b"two", "k2.jpg", "image/png", &BTreeMap::new()).await.unwrap();

        assert_eq!(second.version_id.as_deref(), Some("v2"));
        assert_ne!(first.etag, second.etag);
        assert_eq!(second.etag, same.etag);
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.object_info("k2.jpg").unwrap().0, "image/png");
    }

    #[tokio::test]
    async fn test_storage_missing_object() {
        let storage = InMemoryStorage::new("audits");
        assert!(matches!(
            storage.download("audits", "nope.jpg").await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(storage.presigned_url("audits", "nope.jpg", Duration::from_secs(60)).await.is_err());
        assert!(storage.delete("audits", "nope.jpg").await.is_ok());
    }

    #[tokio::test]
    async fn test_presigned_url() {
        let storage = InMemoryStorage::new("audits");
        storage.upload(b"x", "a.jpg", "image/jpeg", &BTreeMap::new()).await.unwrap();
        let url = storage
            .presigned_url("audits", "a.jpg", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(url, "memory://audits/a.jpg?expires_in=3600");
    }

    #[tokio::test]
    async fn test_checkpoint_history_newest_first() {
        let repo = InMemoryAuditRepository::new();
        let older = audit("d1", "lobby", CleanlinessStatus::Clean, 1);
        let newer = audit("d1", "lobby", CleanlinessStatus::NotClean, 30);
        let other = audit("d1", "bay", CleanlinessStatus::Clean, 10);
        for a in [&older, &newer, &other] {
            repo.save(a).await.unwrap();
        }

        let history = repo.find_by_dealer_and_checkpoint("d1", "lobby", 10).await.unwrap();
        let ids: Vec<Uuid> = history.iter().map(|a| a.audit_id()).collect();
        assert_eq!(ids, vec![newer.audit_id(), older.audit_id()]);

        let limited = repo.find_by_dealer_and_checkpoint("d1", "lobby", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_reviews_oldest_first_and_unreviewed() {
        let repo = InMemoryAuditRepository::new();
        let late = audit("d1", "lobby", CleanlinessStatus::RequiresManualReview, 40);
        let early = audit("d2", "bay", CleanlinessStatus::InsufficientData, 5);
        let clean = audit("d1", "lobby", CleanlinessStatus::Clean, 1);
        let mut reviewed = audit("d1", "lobby", CleanlinessStatus::RequiresManualReview, 2);
        reviewed.apply_manual_override("auditor", true, "fine");

        for a in [&late, &early, &clean, &reviewed] {
            repo.save(a).await.unwrap();
        }

        let pending = repo.find_pending_reviews(10).await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|a| a.audit_id()).collect();
        assert_eq!(ids, vec![early.audit_id(), late.audit_id()]);
    }

    #[tokio::test]
    async fn test_count_by_status_is_per_dealer() {
        let repo = InMemoryAuditRepository::new();
        repo.save(&audit("d1", "lobby", CleanlinessStatus::Clean, 1)).await.unwrap();
        repo.save(&audit("d1", "bay", CleanlinessStatus::Clean, 2)).await.unwrap();
        repo.save(&audit("d1", "bay", CleanlinessStatus::NotClean, 3)).await.unwrap();
        repo.save(&audit("d2", "bay", CleanlinessStatus::NotClean, 4)).await.unwrap();

        let counts = repo.count_by_status("d1").await.unwrap();
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[&CleanlinessStatus::Clean], 2);
        assert_eq!(counts[&CleanlinessStatus::NotClean], 1);
        assert_eq!(counts[&CleanlinessStatus::InsufficientData], 0);

        let none = repo.count_by_status("d9").await.unwrap();
        assert!(none.values().all(|c| *c == 0));
    }

    #[tokio::test]
    async fn test_save_replaces_by_id() {
        let repo = InMemoryAuditRepository::new();
        let mut a = audit("d1", "lobby", CleanlinessStatus::RequiresManualReview, 1);
        repo.save(&a).await.unwrap();
        a.apply_manual_override("auditor", false, "dirty");
        repo.save(&a).await.unwrap();

        assert_eq!(repo.len(), 1);
        let stored = repo.find_by_id(a.audit_id()).await.unwrap().unwrap();
        assert!(stored.is_finalized());
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_unless_finalized_keeps_review() {
        let repo = InMemoryAuditRepository::new();
        let original = audit("d1", "lobby", CleanlinessStatus::RequiresManualReview, 1);
        assert!(repo.save_unless_finalized(&original).await.unwrap());

        let mut reviewed = original.clone();
        reviewed.apply_manual_override("auditor", true, "wiped down");
        repo.save(&reviewed).await.unwrap();

        // A re-analysis computed from the pre-review copy must not land
        assert!(!repo.save_unless_finalized(&original).await.unwrap());
        let stored = repo.find_by_id(original.audit_id()).await.unwrap().unwrap();
        assert_eq!(stored.reviewed_by(), Some("auditor"));
        assert_eq!(stored.status(), CleanlinessStatus::Clean);
    }
}
