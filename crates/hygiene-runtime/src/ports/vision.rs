use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use hygiene_core::{VisionAnalysisResult, VisionProviderKind};

/// Errors from vision providers.
///
/// A failed analysis is always an error, never an empty result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Vision API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse vision response: {0}")]
    Parse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Vision provider not configured: {0}")]
    NotConfigured(String),

    #[error("Stored image not found: {0}")]
    ImageNotFound(String),

    #[error("Circuit open for vision provider '{0}'")]
    CircuitOpen(String),

    #[error("All vision providers failed: {}", .0.join("; "))]
    AllProvidersFailed(Vec<String>),
}

impl VisionError {
    /// Transient faults worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            VisionError::Http(_) | VisionError::RateLimited { .. } | VisionError::Timeout(_) => {
                true
            }
            VisionError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Call parameters for one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Most labels to return, highest confidence first
    pub max_labels: usize,

    /// Labels below this confidence (0–100) are dropped
    pub min_confidence: f64,
}

impl AnalysisParams {
    /// Keep every label. For payloads that were already filtered upstream.
    pub fn unfiltered() -> Self {
        Self {
            max_labels: usize::MAX,
            min_confidence: 0.0,
        }
    }
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            max_labels: 50,
            min_confidence: 70.0,
        }
    }
}

/// Port for image analysis engines.
///
/// Implementations normalize their native payloads into
/// [`VisionAnalysisResult`] before returning.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Analyze raw image bytes.
    async fn analyze(
        &self,
        image: &[u8],
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError>;

    /// Analyze an image that is already in blob storage, avoiding a
    /// download and re-upload.
    async fn analyze_stored(
        &self,
        bucket: &str,
        key: &str,
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError>;

    /// Backend recorded on every audit this provider analyzes.
    fn kind(&self) -> VisionProviderKind;

    fn model_version(&self) -> &str;

    /// Instance name for logs and circuit tracking.
    fn name(&self) -> &str;

    async fn health_check(&self) -> bool {
        true
    }
}
