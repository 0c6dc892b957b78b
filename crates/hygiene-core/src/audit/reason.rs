//! Human-readable explanations for audit verdicts.

use super::DetectedLabel;
use crate::value_objects::{CleanlinessStatus, ConfidenceScore};

pub const NO_ISSUES: &str = "No cleanliness issues detected";
pub const UNCLEAR_RESULTS: &str = "Unclear results - manual review required";
pub const STATUS_UNCLEAR: &str = "Status determination unclear";

/// Violations named in an explanation.
const MAX_NAMED_ISSUES: usize = 3;

/// Explain a verdict from its status, confidence and violations.
pub fn generate(
    status: CleanlinessStatus,
    confidence: ConfidenceScore,
    negative_labels: &[DetectedLabel],
) -> String {
    match status {
        CleanlinessStatus::Clean => NO_ISSUES.to_string(),
        CleanlinessStatus::InsufficientData => {
            format!("Confidence too low ({})", confidence.as_percentage())
        }
        CleanlinessStatus::RequiresManualReview => UNCLEAR_RESULTS.to_string(),
        CleanlinessStatus::NotClean if !negative_labels.is_empty() => {
            let names: Vec<&str> = negative_labels
                .iter()
                .take(MAX_NAMED_ISSUES)
                .map(|label| label.name.as_str())
                .collect();
            format!("Issues detected: {}", names.join(", "))
        }
        CleanlinessStatus::NotClean => STATUS_UNCLEAR.to_string(),
    }
}

/// Explanation recorded for a human verdict.
pub fn manual_override(notes: &str) -> String {
    let notes = notes.trim();
    if notes.is_empty() {
        "Manual override".to_string()
    } else {
        format!("Manual override: {}", notes)
    }
}
