//! Translation of provider payloads into [`VisionAnalysisResult`].
//!
//! Each backend speaks its own shape: hosted label detection reports 0–100
//! scores under `Labels`, on-device classifiers emit index-aligned 0–1
//! scores, and multimodal models answer with JSON text (often fenced).
//! Everything is mapped here so the evaluator only ever sees the normalized
//! form.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use hygiene_core::vision::DEFAULT_CATEGORY;
use hygiene_core::{ConfidenceScore, VisionAnalysisResult, VisionLabel, VisionProviderKind};

use crate::ports::{AnalysisParams, VisionError};

lazy_static! {
    /// A ```json fenced block wrapping an object
    static ref FENCED_JSON: Regex = Regex::new(
        r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```"
    ).unwrap();
}

/// Shape of a stored or received vision payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// Already a serialized [`VisionAnalysisResult`]
    #[default]
    Normalized,
    /// Hosted label detection response
    Rekognition,
    /// Multimodal model answer
    Llm,
}

impl PayloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadFormat::Normalized => "normalized",
            PayloadFormat::Rekognition => "rekognition",
            PayloadFormat::Llm => "llm",
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normalized" => Ok(PayloadFormat::Normalized),
            "rekognition" => Ok(PayloadFormat::Rekognition),
            "llm" | "llm-vision" => Ok(PayloadFormat::Llm),
            other => Err(format!(
                "unknown payload format '{}' (expected normalized, rekognition or llm)",
                other
            )),
        }
    }
}

/// Parse a payload of the given format.
///
/// `model_version` is used when the payload does not carry its own.
pub fn parse_payload(
    text: &str,
    format: PayloadFormat,
    model_version: &str,
    params: &AnalysisParams,
) -> Result<VisionAnalysisResult, VisionError> {
    match format {
        PayloadFormat::Normalized => {
            let mut result: VisionAnalysisResult =
                serde_json::from_str(text).map_err(|e| VisionError::Parse(e.to_string()))?;
            result.labels = apply_params(result.labels, params);
            Ok(result)
        }
        PayloadFormat::Rekognition => from_rekognition(text, params),
        PayloadFormat::Llm => from_llm_text(text, model_version, params),
    }
}

/// Keep labels at or above `min_confidence`, most confident first, at most
/// `max_labels`.
pub fn apply_params(mut labels: Vec<VisionLabel>, params: &AnalysisParams) -> Vec<VisionLabel> {
    labels.retain(|label| label.confidence.is_above_threshold(params.min_confidence));
    labels.sort_by(|a, b| b.confidence.value().total_cmp(&a.confidence.value()));
    labels.truncate(params.max_labels);
    labels
}

// Hosted label detection wire format

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RekognitionResponse {
    #[serde(default)]
    labels: Vec<RekognitionLabel>,
    #[serde(default)]
    moderation_labels: Option<Vec<RekognitionModerationLabel>>,
    #[serde(default)]
    label_model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RekognitionLabel {
    name: String,
    confidence: f64,
    #[serde(default)]
    categories: Vec<RekognitionCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RekognitionCategory {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RekognitionModerationLabel {
    name: String,
    confidence: f64,
    #[serde(default)]
    parent_name: Option<String>,
}

/// Map a hosted label detection response (0–100 scores).
pub fn from_rekognition(
    text: &str,
    params: &AnalysisParams,
) -> Result<VisionAnalysisResult, VisionError> {
    let response: RekognitionResponse =
        serde_json::from_str(text).map_err(|e| VisionError::Parse(e.to_string()))?;

    let labels = response
        .labels
        .into_iter()
        .map(|label| {
            let confidence = score(label.confidence, &label.name)?;
            let category = label
                .categories
                .into_iter()
                .next()
                .map(|c| c.name)
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            Ok(VisionLabel::new(label.name, confidence).with_category(category))
        })
        .collect::<Result<Vec<_>, VisionError>>()?;

    let moderation_labels = response
        .moderation_labels
        .map(|labels| {
            labels
                .into_iter()
                .map(|label| {
                    let confidence = score(label.confidence, &label.name)?;
                    let category = label
                        .parent_name
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(|| "moderation".to_string());
                    Ok(VisionLabel::new(label.name, confidence).with_category(category))
                })
                .collect::<Result<Vec<_>, VisionError>>()
        })
        .transpose()?;

    let mut result = VisionAnalysisResult::new(
        apply_params(labels, params),
        VisionProviderKind::Rekognition,
        response
            .label_model_version
            .unwrap_or_else(|| "unknown".to_string()),
    );
    result.moderation_labels = moderation_labels;
    Ok(result)
}

/// Map on-device classifier output: class names with index-aligned 0–1
/// scores.
pub fn from_on_device(
    class_names: &[String],
    scores: &[f32],
    model_version: &str,
    params: &AnalysisParams,
) -> Result<VisionAnalysisResult, VisionError> {
    if class_names.len() != scores.len() {
        return Err(VisionError::Parse(format!(
            "{} class names but {} scores",
            class_names.len(),
            scores.len()
        )));
    }

    let labels = class_names
        .iter()
        .zip(scores)
        .map(|(name, value)| {
            let confidence = ConfidenceScore::from_normalized(f64::from(*value))
                .map_err(|e| VisionError::Parse(format!("label '{}': {}", name, e)))?;
            Ok(VisionLabel::new(name.clone(), confidence))
        })
        .collect::<Result<Vec<_>, VisionError>>()?;

    Ok(VisionAnalysisResult::new(
        apply_params(labels, params),
        VisionProviderKind::OnDevice,
        model_version,
    ))
}

// Multimodal model answer format

#[derive(Debug, Deserialize)]
struct LlmAnswer {
    labels: Vec<LlmLabel>,
}

#[derive(Debug, Deserialize)]
struct LlmLabel {
    name: String,
    confidence: f64,
    #[serde(default)]
    category: Option<String>,
}

/// Map a multimodal model answer (`{"labels": [{name, confidence 0–1,
/// category}]}`), with or without a fenced block around it.
pub fn from_llm_text(
    text: &str,
    model_version: &str,
    params: &AnalysisParams,
) -> Result<VisionAnalysisResult, VisionError> {
    let json = FENCED_JSON
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| text.trim());

    let answer: LlmAnswer =
        serde_json::from_str(json).map_err(|e| VisionError::Parse(e.to_string()))?;

    let labels = answer
        .labels
        .into_iter()
        .map(|label| {
            let confidence = ConfidenceScore::from_normalized(label.confidence)
                .map_err(|e| VisionError::Parse(format!("label '{}': {}", label.name, e)))?;
            let category = label
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            Ok(VisionLabel::new(label.name, confidence).with_category(category))
        })
        .collect::<Result<Vec<_>, VisionError>>()?;

    Ok(VisionAnalysisResult::new(
        apply_params(labels, params),
        VisionProviderKind::LlmVision,
        model_version,
    ))
}

fn score(value: f64, label: &str) -> Result<ConfidenceScore, VisionError> {
    ConfidenceScore::new(value).map_err(|e| VisionError::Parse(format!("label '{}': {}", label, e)))
}
