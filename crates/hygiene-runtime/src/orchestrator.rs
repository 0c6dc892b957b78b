//! Audit service: the upload → analyze → evaluate → persist pipeline.
//!
//! The service owns no state of its own beyond the evaluator and the
//! vision cache. Everything else goes through the ports:
//! - [`VisionProvider`] for label detection on the stored image
//! - [`StorageProvider`] for the image itself
//! - [`AuditRepository`] for audit records
//!
//! Vision calls run under the configured timeout. Retries and provider
//! fallback are layered inside the vision port by [`AuditServiceBuilder::from_config`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use chrono::{DateTime, Utc};
use hygiene_core::value_objects::MAX_IMAGE_BYTES;
use hygiene_core::{
    AuditResult, CleanlinessEvaluator, CleanlinessStatus, DomainError, ImageMetadata,
    VisionAnalysisResult,
};

use crate::adapters::{InMemoryAuditRepository, InMemoryStorage};
use crate::cache::{CacheKey, VisionCache};
use crate::config::RuntimeConfig;
use crate::ports::{
    AnalysisParams, AuditRepository, RepositoryError, StorageError, StorageProvider,
    StoredObject, VisionError, VisionProvider,
};
use crate::providers::ProviderRegistry;
use crate::report::AuditReport;
use crate::resilience::{FallbackVisionProvider, RetryingVisionProvider};

/// Image formats accepted for audit, with their object key extension.
const ACCEPTED_TYPES: [(&str, &str); 2] = [("image/jpeg", "jpg"), ("image/png", "png")];

/// Errors from the audit service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Audit not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Vision analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Vision analysis failed: {0}")]
    Vision(#[from] VisionError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Repository failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Whether the caller caused the failure.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::NotFound(_) | ServiceError::InvalidRequest(_) => true,
            ServiceError::Domain(err) => {
                err.is_validation() || matches!(err, DomainError::AuditAlreadyFinalized(_))
            }
            _ => false,
        }
    }

    /// Message safe to show callers; collaborator internals are never included.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::NotFound(id) => format!("Audit {} not found", id),
            ServiceError::InvalidRequest(message) => message.clone(),
            ServiceError::Domain(err) if self.is_client_error() => err.to_string(),
            ServiceError::Timeout(_) => "Image analysis timed out, please retry".to_string(),
            ServiceError::Vision(_) => "Image analysis is temporarily unavailable".to_string(),
            ServiceError::Storage(_) => "Image storage is temporarily unavailable".to_string(),
            ServiceError::Repository(_) => "Audit records are temporarily unavailable".to_string(),
            ServiceError::Domain(_) | ServiceError::NotConfigured(_) => {
                "Audit service is misconfigured".to_string()
            }
        }
    }
}

/// A new photo to audit.
#[derive(Debug, Clone)]
pub struct SubmitAudit {
    pub dealer_id: String,
    pub checkpoint_id: String,
    pub uploader_id: String,
    pub image: Vec<u8>,
    pub content_type: String,
    /// Defaults to the submission time
    pub captured_at: Option<DateTime<Utc>>,
    /// `(width, height)` in pixels when known
    pub dimensions: Option<(u32, u32)>,
    /// Verdict supplied up front, bypassing the automated one
    pub manual_override: Option<bool>,
    /// Per-request label confidence floor (0–100); the configured one otherwise
    pub min_confidence: Option<f64>,
}

impl SubmitAudit {
    pub fn new(
        dealer_id: impl Into<String>,
        checkpoint_id: impl Into<String>,
        uploader_id: impl Into<String>,
        image: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            dealer_id: dealer_id.into(),
            checkpoint_id: checkpoint_id.into(),
            uploader_id: uploader_id.into(),
            image,
            content_type: content_type.into(),
            captured_at: None,
            dimensions: None,
            manual_override: None,
            min_confidence: None,
        }
    }

    fn analysis_params(&self, config: &RuntimeConfig) -> AnalysisParams {
        let mut params = config.analysis_params();
        if let Some(min_confidence) = self.min_confidence {
            params.min_confidence = min_confidence;
        }
        params
    }

    fn extension(&self) -> Result<&'static str, ServiceError> {
        ACCEPTED_TYPES
            .iter()
            .find(|(mime, _)| mime.eq_ignore_ascii_case(self.content_type.trim()))
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                ServiceError::InvalidRequest(format!(
                    "unsupported content type '{}', expected image/jpeg or image/png",
                    self.content_type
                ))
            })
    }

    fn validate(&self) -> Result<&'static str, ServiceError> {
        for (field, value) in [
            ("dealer_id", &self.dealer_id),
            ("checkpoint_id", &self.checkpoint_id),
            ("uploader_id", &self.uploader_id),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::InvalidRequest(format!("{} is required", field)));
            }
        }
        if self.image.is_empty() {
            return Err(ServiceError::InvalidRequest("image is empty".to_string()));
        }
        if let Some(min_confidence) = self.min_confidence {
            if !(0.0..=100.0).contains(&min_confidence) {
                return Err(ServiceError::InvalidRequest(format!(
                    "min_confidence must be between 0 and 100, got {}",
                    min_confidence
                )));
            }
        }
        if self.image.len() as u64 > MAX_IMAGE_BYTES {
            return Err(ServiceError::InvalidRequest(format!(
                "image is {} bytes, limit is {} bytes",
                self.image.len(),
                MAX_IMAGE_BYTES
            )));
        }
        self.extension()
    }
}

/// Status counts for one dealer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    pub dealer_id: String,
    pub counts: BTreeMap<CleanlinessStatus, u64>,
    pub total: u64,
    /// Share of audits that are `CLEAN`, 0–100; zero when there are none
    pub compliance_percentage: f64,
}

impl ComplianceSummary {
    fn new(dealer_id: &str, counts: BTreeMap<CleanlinessStatus, u64>) -> Self {
        let total: u64 = counts.values().sum();
        let clean = counts.get(&CleanlinessStatus::Clean).copied().unwrap_or(0);
        let compliance_percentage = if total == 0 {
            0.0
        } else {
            clean as f64 / total as f64 * 100.0
        };
        Self {
            dealer_id: dealer_id.to_string(),
            counts,
            total,
            compliance_percentage,
        }
    }
}

/// Coordinates storage, vision, evaluation and persistence for audits.
pub struct AuditService {
    vision: Arc<dyn VisionProvider>,
    storage: Arc<dyn StorageProvider>,
    repository: Arc<dyn AuditRepository>,
    evaluator: CleanlinessEvaluator,
    cache: Option<VisionCache>,
    config: RuntimeConfig,
}

impl AuditService {
    pub fn builder(config: RuntimeConfig) -> AuditServiceBuilder {
        AuditServiceBuilder::new(config)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &CleanlinessEvaluator {
        &self.evaluator
    }

    /// Upload, analyze, evaluate and save a new audit.
    ///
    /// Images failing analysis requirements are rejected before upload. If
    /// anything fails after the upload, the stored image is deleted again.
    pub async fn submit(&self, request: SubmitAudit) -> Result<AuditResult, ServiceError> {
        let extension = request.validate()?;
        let params = request.analysis_params(&self.config);

        let image_id = Uuid::new_v4();
        let key = format!(
            "{}/{}/{}.{}",
            request.dealer_id, request.checkpoint_id, image_id, extension
        );
        let now = Utc::now();

        let mut metadata = ImageMetadata::builder(
            request.dealer_id.as_str(),
            request.checkpoint_id.as_str(),
            request.uploader_id.as_str(),
        )
        .image_id(image_id)
        .location(self.storage.bucket(), key.as_str())
        .captured_at(request.captured_at.unwrap_or(now))
        .uploaded_at(now)
        .size_bytes(request.image.len() as u64)
        .content_type(request.content_type.trim());
        if let Some((width, height)) = request.dimensions {
            metadata = metadata.dimensions(width, height);
        }
        let metadata = metadata.build();
        metadata.validate_for_analysis()?;

        let tags = BTreeMap::from([
            ("dealer-id".to_string(), request.dealer_id.clone()),
            ("checkpoint-id".to_string(), request.checkpoint_id.clone()),
            ("uploader-id".to_string(), request.uploader_id.clone()),
            ("image-id".to_string(), image_id.to_string()),
        ]);
        let stored = self
            .storage
            .upload(&request.image, &key, metadata.content_type(), &tags)
            .await?;

        let outcome = async {
            let vision = self
                .analyze(&request.image, &stored.bucket, &stored.key, &params)
                .await?;
            let audit = self
                .evaluator
                .evaluate(&vision, metadata, request.manual_override);
            self.repository.save(&audit).await?;
            Ok::<_, ServiceError>(audit)
        }
        .await;

        let audit = match outcome {
            Ok(audit) => audit,
            Err(err) => {
                self.discard_upload(&stored).await;
                return Err(err);
            }
        };

        tracing::info!(
            audit_id = %audit.audit_id(),
            dealer_id = %request.dealer_id,
            checkpoint_id = %request.checkpoint_id,
            status = %audit.status(),
            provider = %audit.vision_provider(),
            "Audit saved"
        );

        Ok(audit)
    }

    /// Record a reviewer's verdict on an audit.
    pub async fn review(
        &self,
        audit_id: Uuid,
        reviewer_id: &str,
        is_clean: bool,
        notes: &str,
    ) -> Result<AuditResult, ServiceError> {
        if reviewer_id.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("reviewer_id is required".to_string()));
        }

        let mut audit = self.load(audit_id).await?;
        audit.apply_manual_override(reviewer_id, is_clean, notes);
        self.repository.save(&audit).await?;
        Ok(audit)
    }

    /// Run the stored image through vision again and re-evaluate.
    ///
    /// Reviewed audits are rejected before any vision call is made, and a
    /// review that lands while vision is running wins over the new result.
    /// The cache is bypassed so the result reflects the current backend.
    pub async fn reanalyze(&self, audit_id: Uuid) -> Result<AuditResult, ServiceError> {
        let existing = self.load(audit_id).await?;
        existing.ensure_not_finalized()?;

        let metadata = existing.image_metadata();
        let vision = self
            .analyze_stored(metadata.bucket(), metadata.key(), &self.config.analysis_params())
            .await?;
        let audit = self.evaluator.reevaluate(&existing, &vision)?;

        if !self.repository.save_unless_finalized(&audit).await? {
            tracing::warn!(audit_id = %audit_id, "Audit reviewed during re-analysis, result discarded");
            return Err(DomainError::AuditAlreadyFinalized(audit_id).into());
        }

        tracing::info!(
            audit_id = %audit_id,
            previous = %existing.status(),
            status = %audit.status(),
            "Audit re-analyzed"
        );

        Ok(audit)
    }

    /// Audits waiting for a human, oldest first.
    pub async fn pending_reviews(&self, limit: usize) -> Result<Vec<AuditResult>, ServiceError> {
        Ok(self.repository.find_pending_reviews(limit).await?)
    }

    /// Recent audits of one checkpoint, newest first.
    pub async fn checkpoint_history(
        &self,
        dealer_id: &str,
        checkpoint_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditResult>, ServiceError> {
        Ok(self
            .repository
            .find_by_dealer_and_checkpoint(dealer_id, checkpoint_id, limit)
            .await?)
    }

    pub async fn compliance_summary(&self, dealer_id: &str) -> Result<ComplianceSummary, ServiceError> {
        let counts = self.repository.count_by_status(dealer_id).await?;
        Ok(ComplianceSummary::new(dealer_id, counts))
    }

    /// Time-limited URL for viewing an audit's image.
    pub async fn image_url(&self, audit_id: Uuid) -> Result<String, ServiceError> {
        let audit = self.load(audit_id).await?;
        self.presign(&audit).await
    }

    /// Report for an audit, image URL included.
    pub async fn report(&self, audit_id: Uuid) -> Result<AuditReport, ServiceError> {
        let audit = self.load(audit_id).await?;
        let url = self.presign(&audit).await?;
        Ok(AuditReport::from(&audit).with_image_url(url))
    }

    async fn load(&self, audit_id: Uuid) -> Result<AuditResult, ServiceError> {
        self.repository
            .find_by_id(audit_id)
            .await?
            .ok_or(ServiceError::NotFound(audit_id))
    }

    async fn presign(&self, audit: &AuditResult) -> Result<String, ServiceError> {
        let metadata = audit.image_metadata();
        Ok(self
            .storage
            .presigned_url(metadata.bucket(), metadata.key(), self.config.presign_expiry)
            .await?)
    }

    async fn discard_upload(&self, stored: &StoredObject) {
        if let Err(err) = self.storage.delete(&stored.bucket, &stored.key).await {
            tracing::warn!(
                bucket = %stored.bucket,
                key = %stored.key,
                error = %err,
                "Failed to delete image of abandoned audit"
            );
        }
    }

    async fn analyze(
        &self,
        image: &[u8],
        bucket: &str,
        key: &str,
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, ServiceError> {
        let Some(cache) = &self.cache else {
            return self.analyze_stored(bucket, key, params).await;
        };

        let cache_key = CacheKey::new(image, params);
        if let Some(hit) = cache.get(&cache_key).await {
            tracing::debug!(key, "Vision cache hit");
            return Ok(hit);
        }

        let result = self.analyze_stored(bucket, key, params).await?;
        cache.insert(cache_key, result.clone()).await;
        Ok(result)
    }

    async fn analyze_stored(
        &self,
        bucket: &str,
        key: &str,
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, ServiceError> {
        let timeout = self.config.vision_timeout;

        match tokio::time::timeout(timeout, self.vision.analyze_stored(bucket, key, params)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(bucket, key, timeout = ?timeout, "Vision analysis timed out");
                Err(ServiceError::Timeout(timeout))
            }
        }
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService")
            .field("vision", &self.vision.name())
            .field("bucket", &self.storage.bucket())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

/// Assembles an [`AuditService`].
///
/// Storage and repository default to the in-memory adapters; the vision
/// port is required.
pub struct AuditServiceBuilder {
    config: RuntimeConfig,
    vision: Option<Arc<dyn VisionProvider>>,
    storage: Option<Arc<dyn StorageProvider>>,
    repository: Option<Arc<dyn AuditRepository>>,
}

impl AuditServiceBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            vision: None,
            storage: None,
            repository: None,
        }
    }

    /// Start from configuration, building the vision chain from the registry.
    ///
    /// Every configured provider is wrapped with retries; when fallbacks are
    /// configured the chain runs behind a per-provider circuit breaker.
    pub fn from_config(
        config: RuntimeConfig,
        registry: &ProviderRegistry,
    ) -> Result<Self, ServiceError> {
        let mut chain: Vec<Arc<dyn VisionProvider>> = Vec::new();

        let selections: Vec<_> = std::iter::once(&config.provider)
            .chain(&config.fallback_providers)
            .collect();

        // Reject bad settings for any provider before building the chain
        for selection in &selections {
            registry
                .validate(&selection.provider_type, &selection.settings)
                .map_err(|e| ServiceError::NotConfigured(e.to_string()))?;
        }

        for selection in selections {
            let provider = registry
                .create(&selection.provider_type, &selection.settings)
                .map_err(|e| ServiceError::NotConfigured(e.to_string()))?;
            chain.push(Arc::new(RetryingVisionProvider::new(
                provider,
                config.retry.clone(),
            )));
        }

        let vision: Arc<dyn VisionProvider> = if chain.len() == 1 {
            chain.remove(0)
        } else {
            Arc::new(FallbackVisionProvider::new(
                chain,
                config.circuit_breaker.clone(),
            )?)
        };

        tracing::info!(
            provider = %config.provider.provider_type,
            fallbacks = config.fallback_providers.len(),
            "Vision provider chain configured"
        );

        Ok(Self::new(config).vision(vision))
    }

    pub fn vision(mut self, vision: Arc<dyn VisionProvider>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageProvider>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn AuditRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn build(self) -> Result<AuditService, ServiceError> {
        self.config
            .validate()
            .map_err(|e| ServiceError::NotConfigured(e.to_string()))?;

        let vision = self
            .vision
            .ok_or_else(|| ServiceError::NotConfigured("vision provider is required".to_string()))?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(InMemoryStorage::new(self.config.bucket.as_str())));
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryAuditRepository::new()));

        let evaluator = CleanlinessEvaluator::new(self.config.rules.clone())?;
        let cache = VisionCache::from_config(&self.config.cache);

        Ok(AuditService {
            vision,
            storage,
            repository,
            evaluator,
            cache,
            config: self.config,
        })
    }
}
