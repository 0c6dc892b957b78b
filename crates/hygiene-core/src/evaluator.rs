//! Cleanliness evaluator: turns normalized vision output into a verdict.
//!
//! The evaluator applies a fixed priority table, first match wins:
//! 1. A manual override decides (`true` → CLEAN, `false` → NOT_CLEAN)
//! 2. Aggregate confidence below the threshold → REQUIRES_MANUAL_REVIEW
//!    or INSUFFICIENT_DATA, per the rules
//! 3. More negative labels than tolerated → NOT_CLEAN
//! 4. Any negative label → NOT_CLEAN
//! 5. Otherwise → CLEAN
//!
//! It is pure and synchronous. The same rules and inputs always produce the
//! same labels, confidence, status and reason; only the audit id and
//! timestamp differ between runs.

use crate::audit::{reason, AuditResult, DetectedLabel};
use crate::error::DomainError;
use crate::rules::{CleanlinessRules, NegativeLabelMatcher};
use crate::value_objects::{CleanlinessStatus, ConfidenceScore, ImageMetadata};
use crate::vision::{VisionAnalysisResult, VisionLabel};

/// Detections averaged into the aggregate confidence.
pub const TOP_LABELS_FOR_CONFIDENCE: usize = 5;

/// Reason recorded when a verdict is supplied alongside the analysis.
const OVERRIDE_AT_SUBMISSION: &str = "verdict supplied with the analysis request";

/// Stateless evaluator bound to one set of rules.
#[derive(Debug, Clone)]
pub struct CleanlinessEvaluator {
    rules: CleanlinessRules,
    matcher: NegativeLabelMatcher,
}

impl CleanlinessEvaluator {
    /// Create an evaluator, compiling the rule terms.
    ///
    /// Fails only on malformed rules.
    pub fn new(rules: CleanlinessRules) -> Result<Self, DomainError> {
        rules.validate()?;
        let matcher = NegativeLabelMatcher::new(&rules.negative_labels)?;
        Ok(Self { rules, matcher })
    }

    pub fn rules(&self) -> &CleanlinessRules {
        &self.rules
    }

    /// Evaluate one analysis into a fresh audit.
    pub fn evaluate(
        &self,
        vision_result: &VisionAnalysisResult,
        image_metadata: ImageMetadata,
        manual_override: Option<bool>,
    ) -> AuditResult {
        let detected_labels = self.convert_labels(&vision_result.labels);
        let overall_confidence = self.calculate_overall_confidence(&detected_labels);
        let negative_count = detected_labels.iter().filter(|l| l.is_negative).count();
        let status = self.determine_status(negative_count, overall_confidence, manual_override);

        tracing::debug!(
            image_id = %image_metadata.image_id(),
            labels = detected_labels.len(),
            negative = negative_count,
            confidence = overall_confidence.value(),
            status = %status,
            "Evaluated vision result"
        );

        let mut builder = AuditResult::builder(image_metadata, detected_labels, overall_confidence, status)
            .manual_override(manual_override)
            .vision_provider(vision_result.provider.clone())
            .model_version(vision_result.model_version.clone());

        if manual_override.is_some() {
            builder = builder.reason(reason::manual_override(OVERRIDE_AT_SUBMISSION));
        }

        builder.build()
    }

    /// Re-run analysis for an existing audit, keeping its identity and image.
    ///
    /// Reviewed audits are final and are rejected with
    /// [`DomainError::AuditAlreadyFinalized`].
    pub fn reevaluate(
        &self,
        existing: &AuditResult,
        vision_result: &VisionAnalysisResult,
    ) -> Result<AuditResult, DomainError> {
        existing.ensure_not_finalized()?;

        let fresh = self.evaluate(vision_result, existing.image_metadata().clone(), None);
        let mut builder = AuditResult::builder(
            fresh.image_metadata().clone(),
            fresh.detected_labels().to_vec(),
            fresh.overall_confidence(),
            fresh.status(),
        )
        .audit_id(existing.audit_id())
        .analyzed_at(fresh.analyzed_at())
        .vision_provider(fresh.vision_provider().clone());

        if let Some(version) = fresh.model_version() {
            builder = builder.model_version(version);
        }

        Ok(builder.build())
    }

    /// Map provider labels to domain labels, flagging violations.
    fn convert_labels(&self, labels: &[VisionLabel]) -> Vec<DetectedLabel> {
        labels
            .iter()
            .map(|label| match self.matcher.matched_term(&label.name) {
                Some(term) => DetectedLabel::violation(label.name.clone(), label.confidence, term),
                None => DetectedLabel::compliant(label.name.clone(), label.confidence),
            })
            .collect()
    }

    /// Mean of the top detections by confidence; zero with no detections.
    fn calculate_overall_confidence(&self, labels: &[DetectedLabel]) -> ConfidenceScore {
        if labels.is_empty() {
            return ConfidenceScore::zero();
        }

        let mut values: Vec<f64> = labels.iter().map(|l| l.confidence.value()).collect();
        values.sort_by(|a, b| b.total_cmp(a));
        values.truncate(TOP_LABELS_FOR_CONFIDENCE);

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        ConfidenceScore::saturating(mean)
    }

    fn determine_status(
        &self,
        negative_count: usize,
        confidence: ConfidenceScore,
        manual_override: Option<bool>,
    ) -> CleanlinessStatus {
        if let Some(is_clean) = manual_override {
            return CleanlinessStatus::from_verdict(is_clean);
        }

        if !confidence.is_above_threshold(self.rules.confidence_threshold) {
            return if self.rules.require_review_on_low_confidence {
                CleanlinessStatus::RequiresManualReview
            } else {
                CleanlinessStatus::InsufficientData
            };
        }

        if negative_count > self.rules.max_negative_labels {
            return CleanlinessStatus::NotClean;
        }

        // Reachable with a non-zero tolerance: any violation still fails
        if negative_count > 0 {
            return CleanlinessStatus::NotClean;
        }

        CleanlinessStatus::Clean
    }
}
