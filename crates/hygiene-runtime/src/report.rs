//! Audit report returned to upstream callers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hygiene_core::{AuditResult, CleanlinessStatus};

/// One violation in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedLabel {
    pub name: String,
    pub confidence: f64,
}

/// JSON view of an audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub audit_id: Uuid,
    pub dealer_id: String,
    pub checkpoint_id: String,
    pub status: CleanlinessStatus,
    pub confidence: f64,
    pub reason: String,
    pub negative_labels: Vec<ReportedLabel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// RFC 3339
    pub analyzed_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
}

impl AuditReport {
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

impl From<&AuditResult> for AuditReport {
    fn from(audit: &AuditResult) -> Self {
        let metadata = audit.image_metadata();
        Self {
            audit_id: audit.audit_id(),
            dealer_id: metadata.dealer_id().to_string(),
            checkpoint_id: metadata.checkpoint_id().to_string(),
            status: audit.status(),
            confidence: audit.overall_confidence().value(),
            reason: audit.reason().to_string(),
            negative_labels: audit
                .negative_labels()
                .iter()
                .map(|label| ReportedLabel {
                    name: label.name.clone(),
                    confidence: label.confidence.value(),
                })
                .collect(),
            image_url: None,
            analyzed_at: audit.analyzed_at().to_rfc3339(),
            reviewed_by: audit.reviewed_by().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hygiene_core::{ConfidenceScore, DetectedLabel, ImageMetadata};

    fn audit() -> AuditResult {
        let metadata = ImageMetadata::builder("D1", "showroom", "u1")
            .location("bucket", "D1/showroom/a.jpg")
            .build();
        let labels = vec![
            DetectedLabel::violation("Trash", ConfidenceScore::new(92.0).unwrap(), "Trash"),
            DetectedLabel::compliant("Car", ConfidenceScore::new(95.0).unwrap()),
        ];
        AuditResult::builder(
            metadata,
            labels,
            ConfidenceScore::new(93.5).unwrap(),
            CleanlinessStatus::NotClean,
        )
        .build()
    }

    #[test]
    fn test_report_from_audit() {
        let audit = audit();
        let report = AuditReport::from(&audit);

        assert_eq!(report.audit_id, audit.audit_id());
        assert_eq!(report.dealer_id, "D1");
        assert_eq!(report.status, CleanlinessStatus::NotClean);
        assert_eq!(report.confidence, 93.5);
        assert_eq!(
            report.negative_labels,
            vec![ReportedLabel {
                name: "Trash".to_string(),
                confidence: 92.0
            }]
        );
        assert!(report.reviewed_by.is_none());
    }

    #[test]
    fn test_report_json_shape() {
        let report = AuditReport::from(&audit());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "NOT_CLEAN");
        assert!(json.get("image_url").is_none());
        assert!(json.get("reviewed_by").is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(json["analyzed_at"].as_str().unwrap()).is_ok());

        let json = serde_json::to_value(report.with_image_url("memory://b/k")).unwrap();
        assert_eq!(json["image_url"], "memory://b/k");
    }
}
