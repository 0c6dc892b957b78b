//! Vision provider that serves a recorded analysis.
//!
//! Lets the full pipeline run offline: the CLI replays a payload captured
//! from a real backend, and tests use it as a deterministic engine.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use hygiene_core::{VisionAnalysisResult, VisionProviderKind};

use super::normalize::{apply_params, parse_payload, PayloadFormat};
use crate::ports::{AnalysisParams, VisionError, VisionProvider};
use crate::providers::VisionProviderFactory;

/// Replays one recorded [`VisionAnalysisResult`] for every image.
#[derive(Debug, Clone)]
pub struct ReplayVisionProvider {
    recorded: VisionAnalysisResult,
}

impl ReplayVisionProvider {
    pub fn new(recorded: VisionAnalysisResult) -> Self {
        Self { recorded }
    }

    /// Load from payload text in any supported format.
    ///
    /// The payload is stored unfiltered; call parameters apply per request.
    pub fn from_payload(text: &str, format: PayloadFormat) -> Result<Self, VisionError> {
        parse_payload(text, format, "replay", &AnalysisParams::unfiltered()).map(Self::new)
    }

    fn replay(&self, params: &AnalysisParams) -> VisionAnalysisResult {
        let started = Instant::now();
        let mut result = self.recorded.clone();
        result.labels = apply_params(result.labels, params);
        result.processing_time_ms = started.elapsed().as_millis() as u64;
        result
    }
}

#[async_trait]
impl VisionProvider for ReplayVisionProvider {
    async fn analyze(
        &self,
        _image: &[u8],
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError> {
        Ok(self.replay(params))
    }

    async fn analyze_stored(
        &self,
        bucket: &str,
        key: &str,
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError> {
        tracing::debug!(bucket, key, "Replaying recorded analysis for stored image");
        Ok(self.replay(params))
    }

    fn kind(&self) -> VisionProviderKind {
        self.recorded.provider.clone()
    }

    fn model_version(&self) -> &str {
        &self.recorded.model_version
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Creates replay providers.
///
/// ## Configuration Format
/// ```json
/// {
///   "path": "fixtures/trash.json",   // Payload file, or
///   "payload": "{...}",              // inline payload text
///   "format": "rekognition"          // normalized (default) | rekognition | llm
/// }
/// ```
pub struct ReplayVisionProviderFactory;

impl ReplayVisionProviderFactory {
    fn format(config: &JsonValue) -> Result<PayloadFormat, VisionError> {
        config["format"]
            .as_str()
            .map(str::parse::<PayloadFormat>)
            .transpose()
            .map(Option::unwrap_or_default)
            .map_err(VisionError::NotConfigured)
    }

    fn missing_payload() -> VisionError {
        VisionError::NotConfigured("replay provider needs 'path' or 'payload'".to_string())
    }
}

impl VisionProviderFactory for ReplayVisionProviderFactory {
    fn provider_type(&self) -> &'static str {
        "replay"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn VisionProvider>, VisionError> {
        let format = Self::format(config)?;

        let text = if let Some(inline) = config["payload"].as_str() {
            inline.to_string()
        } else if let Some(path) = config["path"].as_str() {
            fs::read_to_string(path).map_err(|e| {
                VisionError::NotConfigured(format!("cannot read replay payload '{}': {}", path, e))
            })?
        } else {
            return Err(Self::missing_payload());
        };

        Ok(Arc::new(ReplayVisionProvider::from_payload(&text, format)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), VisionError> {
        if config["payload"].as_str().is_none() && config["path"].as_str().is_none() {
            return Err(Self::missing_payload());
        }
        Self::format(config).map(|_| ())
    }
}
