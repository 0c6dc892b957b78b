//! Domain errors.
//!
//! These are business and validation failures, kept apart from the
//! technical faults raised by vision, storage and persistence adapters.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the domain model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Confidence score must be between 0 and 100, got {0}")]
    InvalidConfidence(f64),

    #[error("Image rejected for analysis: {0}")]
    InvalidImage(String),

    #[error("Audit {0} has been reviewed and can no longer be re-analyzed")]
    AuditAlreadyFinalized(Uuid),

    #[error("Invalid cleanliness rules: {0}")]
    InvalidRules(String),
}

impl DomainError {
    /// Whether the error was caused by caller-supplied input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidConfidence(_) | DomainError::InvalidImage(_)
        )
    }
}
