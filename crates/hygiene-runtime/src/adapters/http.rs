//! Remote label-detection service over HTTP.
//!
//! The service accepts raw image bytes (or a stored object reference) and
//! answers in the hosted label detection shape, which is normalized here.
//!
//! ## Security
//!
//! The API key is held in an [`ApiCredential`] and only exposed when the
//! request header is set.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hygiene_core::{VisionAnalysisResult, VisionProviderKind};

use super::normalize::from_rekognition;
use crate::ports::{AnalysisParams, VisionError, VisionProvider};
use crate::providers::{ApiCredential, VisionProviderFactory};

/// Environment variable holding the label service API key.
pub const VISION_API_KEY_ENV: &str = "HYGIENE_VISION_API_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP label service client.
pub struct HttpVisionProvider {
    endpoint: String,
    credential: Option<ApiCredential>,
    model_version: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpVisionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVisionProvider")
            .field("endpoint", &self.endpoint)
            .field("credential", &self.credential)
            .field("model_version", &self.model_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct StoredImageRequest<'a> {
    bucket: &'a str,
    key: &'a str,
    max_labels: usize,
    min_confidence: f64,
}

impl HttpVisionProvider {
    /// Create a client for `endpoint` (scheme included).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VisionError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credential: None,
            model_version: "unknown".to_string(),
            timeout,
            client,
        })
    }

    /// Create from JSON configuration with environment fallback for the key.
    pub fn from_config(config: &JsonValue) -> Result<Self, VisionError> {
        let endpoint = config["endpoint"]
            .as_str()
            .ok_or_else(|| VisionError::NotConfigured("'endpoint' is required".to_string()))?;

        let timeout = config["timeout_secs"]
            .as_u64()
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let mut provider = Self::new(endpoint, timeout)?;

        if ApiCredential::is_available(config, "api_key", VISION_API_KEY_ENV) {
            provider.credential = Some(ApiCredential::from_config_or_env(
                config,
                "api_key",
                VISION_API_KEY_ENV,
                "Vision API key",
            )?);
        }
        if let Some(version) = config["model_version"].as_str() {
            provider.model_version = version.to_string();
        }

        Ok(provider)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        // Only expose the credential here, at the point of use
        match &self.credential {
            Some(credential) => request.header("x-api-key", credential.expose()),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<VisionAnalysisResult, VisionError> {
        let started = Instant::now();

        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                VisionError::Timeout(self.timeout)
            } else {
                VisionError::Http(e.to_string())
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(VisionError::RateLimited { retry_after });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(VisionError::ImageNotFound(
                response.text().await.unwrap_or_default(),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VisionError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(VisionError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        // Filtering already happened server-side; keep every label returned
        let mut result = from_rekognition(&body, &AnalysisParams::unfiltered())?;
        if result.model_version == "unknown" {
            result.model_version = self.model_version.clone();
        }
        result.processing_time_ms = started.elapsed().as_millis() as u64;
        Ok(result)
    }
}

#[async_trait]
impl VisionProvider for HttpVisionProvider {
    async fn analyze(
        &self,
        image: &[u8],
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError> {
        let request = self
            .client
            .post(format!("{}/labels", self.endpoint))
            .query(&[
                ("max_labels", params.max_labels.to_string()),
                ("min_confidence", params.min_confidence.to_string()),
            ])
            .header("content-type", "application/octet-stream")
            .body(image.to_vec());

        self.send(request).await
    }

    async fn analyze_stored(
        &self,
        bucket: &str,
        key: &str,
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError> {
        let request = self
            .client
            .post(format!("{}/labels/stored", self.endpoint))
            .json(&StoredImageRequest {
                bucket,
                key,
                max_labels: params.max_labels,
                min_confidence: params.min_confidence,
            });

        self.send(request).await
    }

    fn kind(&self) -> VisionProviderKind {
        VisionProviderKind::Rekognition
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }

    fn name(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

/// Factory for HTTP label service providers.
///
/// ## Configuration Format
/// ```json
/// {
///   "endpoint": "https://vision.internal/v1",  // Required
///   "api_key": "...",                          // Optional, falls back to HYGIENE_VISION_API_KEY
///   "model_version": "3.0",                    // Optional, recorded when the reply omits it
///   "timeout_secs": 30                         // Optional
/// }
/// ```
pub struct HttpVisionProviderFactory;

impl VisionProviderFactory for HttpVisionProviderFactory {
    fn provider_type(&self) -> &'static str {
        "http"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn VisionProvider>, VisionError> {
        self.validate_config(config)?;
        Ok(Arc::new(HttpVisionProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), VisionError> {
        match config["endpoint"].as_str() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
            Some(_) => Err(VisionError::NotConfigured(
                "endpoint must start with http:// or https://".to_string(),
            )),
            None => Err(VisionError::NotConfigured("'endpoint' is required".to_string())),
        }
    }
}
