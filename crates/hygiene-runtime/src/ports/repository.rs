use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use hygiene_core::{AuditResult, CleanlinessStatus};

/// Errors from audit persistence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to (de)serialize audit: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Port for storing and querying audits.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Insert or replace an audit by id.
    async fn save(&self, audit: &AuditResult) -> Result<(), RepositoryError>;

    /// Replace an audit only if the stored copy has not been reviewed.
    ///
    /// Returns `false`, leaving the stored audit untouched, when a review
    /// landed first. The check and the write must be atomic.
    async fn save_unless_finalized(&self, audit: &AuditResult) -> Result<bool, RepositoryError>;

    async fn find_by_id(&self, audit_id: Uuid) -> Result<Option<AuditResult>, RepositoryError>;

    /// Audits for one checkpoint, newest first.
    async fn find_by_dealer_and_checkpoint(
        &self,
        dealer_id: &str,
        checkpoint_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditResult>, RepositoryError>;

    /// Unreviewed audits that need a human, oldest first.
    async fn find_pending_reviews(&self, limit: usize) -> Result<Vec<AuditResult>, RepositoryError>;

    /// Audit count per status for one dealer; every status is present.
    async fn count_by_status(
        &self,
        dealer_id: &str,
    ) -> Result<BTreeMap<CleanlinessStatus, u64>, RepositoryError>;
}
