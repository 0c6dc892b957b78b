//! Validated confidence percentage.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// A confidence value on the 0–100 scale.
///
/// Values outside the range (and NaN) are rejected at construction, so a
/// `ConfidenceScore` held anywhere in the domain is always valid.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;

    /// Create a score from a 0–100 value.
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if value.is_nan() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::InvalidConfidence(value));
        }
        Ok(Self(value))
    }

    /// Create a score from a 0–1 value, scaling it by 100.
    pub fn from_normalized(value: f64) -> Result<Self, DomainError> {
        Self::new(value * 100.0).map_err(|_| DomainError::InvalidConfidence(value))
    }

    /// The score of an analysis with no detections.
    pub const fn zero() -> Self {
        Self(0.0)
    }

    /// Clamp an already-derived value into range.
    ///
    /// Only for values computed from valid scores (averages), where float
    /// rounding is the only way to leave the range.
    pub(crate) fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self::zero()
        } else {
            Self(value.clamp(Self::MIN, Self::MAX))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// True when the score meets or exceeds `threshold`.
    pub fn is_above_threshold(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }

    /// Format as a two-decimal percentage, e.g. `"95.50%"`.
    pub fn as_percentage(&self) -> String {
        format!("{:.2}%", self.0)
    }
}

impl Default for ConfidenceScore {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<f64> for ConfidenceScore {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConfidenceScore> for f64 {
    fn from(score: ConfidenceScore) -> Self {
        score.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_percentage())
    }
}
