//! Cleanliness rules: what counts as a violation and how strict the
//! verdict is.
//!
//! Rules are plain configuration. They can be built in code, or loaded from
//! YAML/JSON documents that are validated against an embedded JSON Schema.

mod defaults;
mod matcher;
mod parser;
mod schema;

pub use defaults::{
    category_of, default_negative_labels, terms_in, ViolationCategory, DEFAULT_NEGATIVE_TERMS,
};
pub use matcher::NegativeLabelMatcher;
pub use parser::RulesError;
pub use schema::validate_rules_schema;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::DomainError;

/// Default confidence below which automated verdicts are not trusted.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 80.0;

/// Strictness configuration for one evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanlinessRules {
    /// Terms matched case-insensitively as substrings of label names
    pub negative_labels: BTreeSet<String>,

    /// Minimum aggregate confidence (0–100) to accept an automated verdict
    pub confidence_threshold: f64,

    /// Negative labels tolerated before failing
    pub max_negative_labels: usize,

    /// Low confidence routes to manual review when true, otherwise to
    /// insufficient data
    pub require_review_on_low_confidence: bool,
}

impl Default for CleanlinessRules {
    fn default() -> Self {
        Self {
            negative_labels: default_negative_labels(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_negative_labels: 0,
            require_review_on_low_confidence: true,
        }
    }
}

impl CleanlinessRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the negative terms.
    pub fn with_negative_labels<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.negative_labels = terms.into_iter().map(Into::into).collect();
        self
    }

    /// Add terms on top of the current set.
    pub fn extend_negative_labels<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.negative_labels.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_max_negative_labels(mut self, max: usize) -> Self {
        self.max_negative_labels = max;
        self
    }

    pub fn with_review_on_low_confidence(mut self, enabled: bool) -> Self {
        self.require_review_on_low_confidence = enabled;
        self
    }

    /// Semantic checks the schema cannot express.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(DomainError::InvalidRules(format!(
                "confidence_threshold must be between 0 and 100, got {}",
                self.confidence_threshold
            )));
        }

        if let Some(term) = self.negative_labels.iter().find(|t| t.trim().is_empty()) {
            return Err(DomainError::InvalidRules(format!(
                "negative label terms must not be blank, got {:?}",
                term
            )));
        }

        Ok(())
    }
}
