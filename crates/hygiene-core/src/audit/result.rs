use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{reason, DetectedLabel};
use crate::error::DomainError;
use crate::value_objects::{CleanlinessStatus, ConfidenceScore, ImageMetadata};
use crate::vision::VisionProviderKind;

/// Where an audit is in its review lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditLifecycle {
    /// Produced by the evaluator, no human decision yet
    Analyzed,
    /// A reviewer has recorded a verdict; the audit is final
    ManuallyReviewed,
}

/// The outcome of one audit: verdict, explanation and review trail.
///
/// Fields are private so the derived state cannot drift:
/// `negative_labels` is always the negative subset of `detected_labels`
/// and `reason` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AuditRecord")]
pub struct AuditResult {
    audit_id: Uuid,
    image_metadata: ImageMetadata,
    detected_labels: Vec<DetectedLabel>,
    negative_labels: Vec<DetectedLabel>,
    overall_confidence: ConfidenceScore,
    status: CleanlinessStatus,
    reason: String,
    analyzed_at: DateTime<Utc>,
    reviewed_by: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    manual_override: Option<bool>,
    vision_provider: VisionProviderKind,
    model_version: Option<String>,
}

impl AuditResult {
    /// Start assembling an audit from its required parts.
    pub fn builder(
        image_metadata: ImageMetadata,
        detected_labels: Vec<DetectedLabel>,
        overall_confidence: ConfidenceScore,
        status: CleanlinessStatus,
    ) -> AuditResultBuilder {
        AuditResultBuilder {
            audit_id: None,
            image_metadata,
            detected_labels,
            overall_confidence,
            status,
            reason: None,
            analyzed_at: None,
            reviewed_by: None,
            reviewed_at: None,
            manual_override: None,
            vision_provider: VisionProviderKind::default(),
            model_version: None,
        }
    }

    pub fn audit_id(&self) -> Uuid {
        self.audit_id
    }

    pub fn image_metadata(&self) -> &ImageMetadata {
        &self.image_metadata
    }

    pub fn detected_labels(&self) -> &[DetectedLabel] {
        &self.detected_labels
    }

    pub fn negative_labels(&self) -> &[DetectedLabel] {
        &self.negative_labels
    }

    pub fn overall_confidence(&self) -> ConfidenceScore {
        self.overall_confidence
    }

    pub fn status(&self) -> CleanlinessStatus {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }

    pub fn reviewed_by(&self) -> Option<&str> {
        self.reviewed_by.as_deref()
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn manual_override(&self) -> Option<bool> {
        self.manual_override
    }

    pub fn vision_provider(&self) -> &VisionProviderKind {
        &self.vision_provider
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model_version.as_deref()
    }

    /// Record a reviewer's verdict, replacing the automated one.
    ///
    /// Applying a second override is allowed; the latest reviewer wins.
    pub fn apply_manual_override(
        &mut self,
        reviewer_id: impl Into<String>,
        is_clean: bool,
        notes: &str,
    ) {
        self.apply_manual_override_at(reviewer_id, is_clean, notes, Utc::now());
    }

    /// [`apply_manual_override`](Self::apply_manual_override) with an
    /// explicit review time.
    pub fn apply_manual_override_at(
        &mut self,
        reviewer_id: impl Into<String>,
        is_clean: bool,
        notes: &str,
        reviewed_at: DateTime<Utc>,
    ) {
        self.manual_override = Some(is_clean);
        self.status = CleanlinessStatus::from_verdict(is_clean);
        self.reviewed_by = Some(reviewer_id.into());
        self.reviewed_at = Some(reviewed_at);
        self.reason = reason::manual_override(notes);

        tracing::info!(
            audit_id = %self.audit_id,
            reviewer = self.reviewed_by.as_deref().unwrap_or_default(),
            status = %self.status,
            "Manual override applied"
        );
    }

    /// True once a reviewer has been recorded.
    pub fn is_finalized(&self) -> bool {
        self.reviewed_by.is_some()
    }

    pub fn lifecycle(&self) -> AuditLifecycle {
        if self.is_finalized() {
            AuditLifecycle::ManuallyReviewed
        } else {
            AuditLifecycle::Analyzed
        }
    }

    /// Precondition for re-running analysis on this audit.
    pub fn ensure_not_finalized(&self) -> Result<(), DomainError> {
        if self.is_finalized() {
            Err(DomainError::AuditAlreadyFinalized(self.audit_id))
        } else {
            Ok(())
        }
    }

    pub fn passes_compliance(&self) -> bool {
        self.status.is_compliant()
    }

    pub fn requires_review(&self) -> bool {
        self.status.requires_human_intervention()
    }
}

/// Builder that computes derived fields as it finishes.
#[derive(Debug, Clone)]
pub struct AuditResultBuilder {
    audit_id: Option<Uuid>,
    image_metadata: ImageMetadata,
    detected_labels: Vec<DetectedLabel>,
    overall_confidence: ConfidenceScore,
    status: CleanlinessStatus,
    reason: Option<String>,
    analyzed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    manual_override: Option<bool>,
    vision_provider: VisionProviderKind,
    model_version: Option<String>,
}

impl AuditResultBuilder {
    /// Keep an existing identity instead of generating one.
    pub fn audit_id(mut self, audit_id: Uuid) -> Self {
        self.audit_id = Some(audit_id);
        self
    }

    /// Explicit explanation; blank strings are ignored.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn analyzed_at(mut self, at: DateTime<Utc>) -> Self {
        self.analyzed_at = Some(at);
        self
    }

    /// Restore a recorded review.
    pub fn reviewed(mut self, reviewer_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.reviewed_by = Some(reviewer_id.into());
        self.reviewed_at = Some(at);
        self
    }

    pub fn manual_override(mut self, manual_override: Option<bool>) -> Self {
        self.manual_override = manual_override;
        self
    }

    pub fn vision_provider(mut self, provider: VisionProviderKind) -> Self {
        self.vision_provider = provider;
        self
    }

    pub fn model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    pub fn build(self) -> AuditResult {
        let negative_labels: Vec<DetectedLabel> = self
            .detected_labels
            .iter()
            .filter(|label| label.is_negative)
            .cloned()
            .collect();

        let reason = self
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| {
                reason::generate(self.status, self.overall_confidence, &negative_labels)
            });

        AuditResult {
            audit_id: self.audit_id.unwrap_or_else(Uuid::new_v4),
            image_metadata: self.image_metadata,
            detected_labels: self.detected_labels,
            negative_labels,
            overall_confidence: self.overall_confidence,
            status: self.status,
            reason,
            analyzed_at: self.analyzed_at.unwrap_or_else(Utc::now),
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
            manual_override: self.manual_override,
            vision_provider: self.vision_provider,
            model_version: self.model_version,
        }
    }
}

/// Persisted shape of an audit.
///
/// Deserialization goes through the builder so stored negative labels are
/// re-derived rather than trusted.
#[derive(Deserialize)]
struct AuditRecord {
    audit_id: Uuid,
    image_metadata: ImageMetadata,
    detected_labels: Vec<DetectedLabel>,
    overall_confidence: ConfidenceScore,
    status: CleanlinessStatus,
    #[serde(default)]
    reason: Option<String>,
    analyzed_at: DateTime<Utc>,
    #[serde(default)]
    reviewed_by: Option<String>,
    #[serde(default)]
    reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    manual_override: Option<bool>,
    #[serde(default)]
    vision_provider: VisionProviderKind,
    #[serde(default)]
    model_version: Option<String>,
}

impl From<AuditRecord> for AuditResult {
    fn from(record: AuditRecord) -> Self {
        let mut builder = AuditResult::builder(
            record.image_metadata,
            record.detected_labels,
            record.overall_confidence,
            record.status,
        )
        .audit_id(record.audit_id)
        .analyzed_at(record.analyzed_at)
        .manual_override(record.manual_override)
        .vision_provider(record.vision_provider);

        if let Some(reason) = record.reason {
            builder = builder.reason(reason);
        }
        if let Some(version) = record.model_version {
            builder = builder.model_version(version);
        }
        if let Some(reviewer) = record.reviewed_by {
            let at = record.reviewed_at.unwrap_or(record.analyzed_at);
            builder = builder.reviewed(reviewer, at);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(v: f64) -> ConfidenceScore {
        ConfidenceScore::new(v).unwrap()
    }

    fn metadata() -> ImageMetadata {
        ImageMetadata::builder("dealer-001", "service-bay-1", "user-7")
            .location("hygiene-audits", "dealer-001/service-bay-1/img.jpg")
            .size_bytes(1024)
            .build()
    }

    fn labels() -> Vec<DetectedLabel> {
        vec![
            DetectedLabel::compliant("Car", score(95.0)),
            DetectedLabel::violation("Oil Spill", score(91.0), "Spill"),
            DetectedLabel::violation("Trash", score(88.0), "Trash"),
        ]
    }

    fn not_clean_audit() -> AuditResult {
        AuditResult::builder(metadata(), labels(), score(91.0), CleanlinessStatus::NotClean)
            .vision_provider(VisionProviderKind::Rekognition)
            .model_version("3.0")
            .build()
    }

    #[test]
    fn test_negative_labels_are_derived() {
        let audit = not_clean_audit();
        assert_eq!(audit.detected_labels().len(), 3);
        let names: Vec<&str> = audit.negative_labels().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Oil Spill", "Trash"]);
    }

    #[test]
    fn test_reason_generated_when_absent() {
        let audit = not_clean_audit();
        assert_eq!(audit.reason(), "Issues detected: Oil Spill, Trash");

        let blank = AuditResult::builder(metadata(), vec![], score(0.0), CleanlinessStatus::Clean)
            .reason("   ")
            .build();
        assert_eq!(blank.reason(), reason::NO_ISSUES);
    }

    #[test]
    fn test_explicit_reason_kept() {
        let audit = AuditResult::builder(metadata(), labels(), score(90.0), CleanlinessStatus::NotClean)
            .reason("Flagged by pilot rules")
            .build();
        assert_eq!(audit.reason(), "Flagged by pilot rules");
    }

    #[test]
    fn test_manual_override_finalizes() {
        let mut audit = not_clean_audit();
        assert!(!audit.is_finalized());
        assert_eq!(audit.lifecycle(), AuditLifecycle::Analyzed);
        assert!(audit.ensure_not_finalized().is_ok());

        audit.apply_manual_override("auditor-3", true, "Spill was water, already mopped");

        assert_eq!(audit.status(), CleanlinessStatus::Clean);
        assert_eq!(audit.manual_override(), Some(true));
        assert_eq!(audit.reviewed_by(), Some("auditor-3"));
        assert!(audit.reviewed_at().is_some());
        assert_eq!(audit.reason(), "Manual override: Spill was water, already mopped");
        assert!(audit.is_finalized());
        assert!(audit.passes_compliance());
        assert_eq!(audit.lifecycle(), AuditLifecycle::ManuallyReviewed);
        assert_eq!(
            audit.ensure_not_finalized(),
            Err(DomainError::AuditAlreadyFinalized(audit.audit_id()))
        );
    }

    #[test]
    fn test_override_keeps_identity_and_labels() {
        let mut audit = not_clean_audit();
        let id = audit.audit_id();
        audit.apply_manual_override("auditor-3", false, "confirmed");
        assert_eq!(audit.audit_id(), id);
        assert_eq!(audit.status(), CleanlinessStatus::NotClean);
        assert_eq!(audit.negative_labels().len(), 2);
    }

    #[test]
    fn test_requires_review() {
        let audit = AuditResult::builder(
            metadata(),
            vec![],
            score(0.0),
            CleanlinessStatus::RequiresManualReview,
        )
        .build();
        assert!(audit.requires_review());
        assert!(!audit.passes_compliance());
    }

    #[test]
    fn test_serde_rederives_negative_labels() {
        let audit = not_clean_audit();
        let mut json = serde_json::to_value(&audit).unwrap();

        // Tamper with the stored subset; it must be ignored on load
        json["negative_labels"] = serde_json::json!([]);
        let restored: AuditResult = serde_json::from_value(json).unwrap();

        assert_eq!(restored, audit);
        assert_eq!(restored.negative_labels().len(), 2);
    }

    #[test]
    fn test_serde_keeps_review_trail() {
        let mut audit = not_clean_audit();
        audit.apply_manual_override("auditor-9", true, "ok");
        let restored: AuditResult =
            serde_json::from_str(&serde_json::to_string(&audit).unwrap()).unwrap();
        assert!(restored.is_finalized());
        assert_eq!(restored.reason(), "Manual override: ok");
        assert_eq!(restored.reviewed_at(), audit.reviewed_at());
    }
}
