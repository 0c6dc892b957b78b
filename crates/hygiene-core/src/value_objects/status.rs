//! Audit outcome status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business outcome of a facility audit.
///
/// `Ord` follows declaration order and only exists so statuses can key
/// sorted maps such as per-status counts. It ranks nothing: business logic
/// uses [`is_compliant`](Self::is_compliant) and
/// [`requires_human_intervention`](Self::requires_human_intervention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CleanlinessStatus {
    /// Facility passed all checks
    Clean,

    /// Violations were found
    NotClean,

    /// The analysis was unsure and a human must decide
    RequiresManualReview,

    /// Not enough signal to reach a verdict
    InsufficientData,
}

impl CleanlinessStatus {
    /// Every status, in declaration order.
    pub const fn all() -> [CleanlinessStatus; 4] {
        [
            CleanlinessStatus::Clean,
            CleanlinessStatus::NotClean,
            CleanlinessStatus::RequiresManualReview,
            CleanlinessStatus::InsufficientData,
        ]
    }

    /// Only `Clean` counts as a passing grade.
    pub fn is_compliant(&self) -> bool {
        matches!(self, CleanlinessStatus::Clean)
    }

    /// Statuses that belong in an auditor's queue.
    pub fn requires_human_intervention(&self) -> bool {
        matches!(
            self,
            CleanlinessStatus::RequiresManualReview | CleanlinessStatus::InsufficientData
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CleanlinessStatus::Clean => "CLEAN",
            CleanlinessStatus::NotClean => "NOT_CLEAN",
            CleanlinessStatus::RequiresManualReview => "REQUIRES_MANUAL_REVIEW",
            CleanlinessStatus::InsufficientData => "INSUFFICIENT_DATA",
        }
    }

    /// Status forced by a human verdict.
    pub fn from_verdict(is_clean: bool) -> Self {
        if is_clean {
            CleanlinessStatus::Clean
        } else {
            CleanlinessStatus::NotClean
        }
    }
}

impl fmt::Display for CleanlinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleanlinessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown cleanliness status: '{}'", s))
    }
}
