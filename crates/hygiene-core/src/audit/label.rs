use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::ConfidenceScore;

/// A detection as the domain sees it.
///
/// `is_negative` is always computed by rule matching, never taken from the
/// provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLabel {
    pub name: String,
    pub confidence: ConfidenceScore,
    pub is_negative: bool,

    /// Rule term that flagged this label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_term: Option<String>,
}

impl DetectedLabel {
    /// A label that matched no rule term.
    pub fn compliant(name: impl Into<String>, confidence: ConfidenceScore) -> Self {
        Self {
            name: name.into(),
            confidence,
            is_negative: false,
            matched_term: None,
        }
    }

    /// A label flagged by `term`.
    pub fn violation(
        name: impl Into<String>,
        confidence: ConfidenceScore,
        term: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            confidence,
            is_negative: true,
            matched_term: Some(term.into()),
        }
    }
}

impl fmt::Display for DetectedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.is_negative { "[x]" } else { "[ok]" };
        write!(f, "{} {} ({})", flag, self.name, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let score = ConfidenceScore::new(92.0).unwrap();
        assert_eq!(
            DetectedLabel::violation("Trash", score, "Trash").to_string(),
            "[x] Trash (92.00%)"
        );
        assert_eq!(
            DetectedLabel::compliant("Car", score).to_string(),
            "[ok] Car (92.00%)"
        );
    }
}
