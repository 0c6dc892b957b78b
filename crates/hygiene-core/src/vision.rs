//! Normalized vision output.
//!
//! Every provider adapter maps its native payload into these types before
//! the evaluator sees it. Confidence is always on the 0–100 scale here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::value_objects::ConfidenceScore;

/// Category assigned when a provider does not group its labels.
pub const DEFAULT_CATEGORY: &str = "general";

/// A single normalized detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionLabel {
    pub name: String,
    pub confidence: ConfidenceScore,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl VisionLabel {
    pub fn new(name: impl Into<String>, confidence: ConfidenceScore) -> Self {
        Self {
            name: name.into(),
            confidence,
            category: default_category(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// Known vision backends.
///
/// Unknown names round-trip through `Other` so stored audits from newer
/// providers still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VisionProviderKind {
    /// Hosted label detection returning 0–100 scores
    Rekognition,
    /// On-device classifier returning 0–1 scores
    OnDevice,
    /// Multimodal language model asked for structured labels
    LlmVision,
    /// Any other backend, by name
    Other(String),
}

impl VisionProviderKind {
    pub fn as_str(&self) -> &str {
        match self {
            VisionProviderKind::Rekognition => "rekognition",
            VisionProviderKind::OnDevice => "on-device",
            VisionProviderKind::LlmVision => "llm-vision",
            VisionProviderKind::Other(name) => name,
        }
    }
}

impl Default for VisionProviderKind {
    fn default() -> Self {
        VisionProviderKind::Other("unknown".to_string())
    }
}

impl fmt::Display for VisionProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for VisionProviderKind {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rekognition" => VisionProviderKind::Rekognition,
            "on-device" | "ondevice" | "tflite" => VisionProviderKind::OnDevice,
            "llm-vision" | "llm" | "gemini" => VisionProviderKind::LlmVision,
            _ => VisionProviderKind::Other(name.to_string()),
        }
    }
}

impl From<String> for VisionProviderKind {
    fn from(name: String) -> Self {
        VisionProviderKind::from(name.as_str())
    }
}

impl From<VisionProviderKind> for String {
    fn from(kind: VisionProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for VisionProviderKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(VisionProviderKind::from(s))
    }
}

/// Complete result of one vision analysis call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisionAnalysisResult {
    pub labels: Vec<VisionLabel>,

    /// Content-safety labels, when the provider reports them
    #[serde(default)]
    pub moderation_labels: Option<Vec<VisionLabel>>,

    /// OCR lines, when the provider reports them
    #[serde(default)]
    pub text_detections: Option<Vec<String>>,

    #[serde(default)]
    pub provider: VisionProviderKind,

    #[serde(default = "unknown_version")]
    pub model_version: String,

    #[serde(default)]
    pub processing_time_ms: u64,
}

fn unknown_version() -> String {
    "unknown".to_string()
}

impl VisionAnalysisResult {
    pub fn new(labels: Vec<VisionLabel>, provider: VisionProviderKind, model_version: impl Into<String>) -> Self {
        Self {
            labels,
            moderation_labels: None,
            text_detections: None,
            provider,
            model_version: model_version.into(),
            processing_time_ms: 0,
        }
    }

    /// The single most confident detection, if any.
    pub fn highest_confidence_label(&self) -> Option<&VisionLabel> {
        self.labels
            .iter()
            .max_by(|a, b| a.confidence.value().total_cmp(&b.confidence.value()))
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
