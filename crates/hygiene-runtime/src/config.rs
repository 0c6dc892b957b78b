//! Runtime configuration.
//!
//! Loaded from YAML. Durations are written the human way (`"30s"`, `"1h"`,
//! `"250ms"`); bare integers are read as seconds.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use hygiene_core::{CleanlinessRules, DomainError};

use crate::cache::CacheConfig;
use crate::ports::AnalysisParams;
use crate::resilience::{CircuitBreakerConfig, RetryPolicy};

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Rules(#[from] DomainError),
}

/// Which vision provider to build, by registered type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSelection {
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Provider-specific settings, passed to its factory as-is
    #[serde(default)]
    pub settings: JsonValue,
}

impl ProviderSelection {
    pub fn new(provider_type: impl Into<String>, settings: JsonValue) -> Self {
        Self {
            provider_type: provider_type.into(),
            settings,
        }
    }
}

impl Default for ProviderSelection {
    fn default() -> Self {
        Self::new("replay", JsonValue::Null)
    }
}

/// Everything the audit service needs besides its ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Bucket audit images are uploaded to
    pub bucket: String,

    /// Most labels requested per analysis
    pub max_labels: usize,

    /// Provider-side confidence floor (0–100)
    pub min_confidence: f64,

    /// Upper bound on one vision call, retries included
    #[serde(with = "duration_str")]
    pub vision_timeout: Duration,

    /// Lifetime of image URLs handed to reviewers
    #[serde(with = "duration_str")]
    pub presign_expiry: Duration,

    pub retry: RetryPolicy,

    pub circuit_breaker: CircuitBreakerConfig,

    pub cache: CacheConfig,

    pub provider: ProviderSelection,

    /// Tried in order when the primary provider fails
    pub fallback_providers: Vec<ProviderSelection>,

    pub rules: CleanlinessRules,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let params = AnalysisParams::default();
        Self {
            bucket: "hygiene-audits".to_string(),
            max_labels: params.max_labels,
            min_confidence: params.min_confidence,
            vision_timeout: Duration::from_secs(30),
            presign_expiry: Duration::from_secs(3600),
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
            provider: ProviderSelection::default(),
            fallback_providers: Vec::new(),
            rules: CleanlinessRules::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a YAML document; an empty document is all defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = if yaml.trim().is_empty() {
            RuntimeConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("bucket must not be empty".to_string()));
        }
        if self.max_labels == 0 {
            return Err(ConfigError::Invalid("max_labels must be at least 1".to_string()));
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(ConfigError::Invalid(format!(
                "min_confidence must be between 0 and 100, got {}",
                self.min_confidence
            )));
        }
        if self.vision_timeout.is_zero() {
            return Err(ConfigError::Invalid("vision_timeout must be positive".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        self.rules.validate()?;
        Ok(())
    }

    /// Call parameters for vision analysis.
    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams {
            max_labels: self.max_labels,
            min_confidence: self.min_confidence,
        }
    }
}

/// Serde adapter for [`Duration`] as a human-readable string.
pub mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Secs(secs) => Ok(Duration::from_secs(secs)),
            Repr::Text(text) => {
                humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
bucket: dealer-photos
max_labels: 20
min_confidence: 60
vision_timeout: 10s
presign_expiry: 15m
retry:
  max_attempts: 2
  min_delay: 50ms
circuit_breaker:
  failure_threshold: 5
  recovery_timeout: 1m
cache:
  enabled: false
provider:
  type: http
  settings:
    endpoint: "https://vision.internal/v1"
fallback_providers:
  - type: replay
    settings:
      path: fixtures/clean.json
rules:
  confidence_threshold: 85
  max_negative_labels: 1
"#;

    #[test]
    fn test_parse_full_config() {
        let config = RuntimeConfig::from_yaml(CONFIG).unwrap();

        assert_eq!(config.bucket, "dealer-photos");
        assert_eq!(config.vision_timeout, Duration::from_secs(10));
        assert_eq!(config.presign_expiry, Duration::from_secs(900));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.min_delay, Duration::from_millis(50));
        // Unspecified nested fields keep defaults
        assert_eq!(config.retry.max_delay, RetryPolicy::default().max_delay);
        assert_eq!(config.circuit_breaker.recovery_timeout, Duration::from_secs(60));
        assert!(!config.cache.enabled);
        assert_eq!(config.provider.provider_type, "http");
        assert_eq!(config.provider.settings["endpoint"], "https://vision.internal/v1");
        assert_eq!(config.fallback_providers.len(), 1);
        assert_eq!(config.rules.confidence_threshold, 85.0);
        assert!(config.rules.negative_labels.contains("Trash"));

        let params = config.analysis_params();
        assert_eq!(params.max_labels, 20);
        assert_eq!(params.min_confidence, 60.0);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = RuntimeConfig::from_yaml("").unwrap();
        assert_eq!(config.bucket, "hygiene-audits");
        assert_eq!(config.max_labels, 50);
        assert_eq!(config.min_confidence, 70.0);
        assert_eq!(config.vision_timeout, Duration::from_secs(30));
        assert_eq!(config.presign_expiry, Duration::from_secs(3600));
    }

    #[test]
    fn test_integer_durations_are_seconds() {
        let config = RuntimeConfig::from_yaml("vision_timeout: 45\n").unwrap();
        assert_eq!(config.vision_timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RuntimeConfig::from_yaml("min_confidence: 120\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("max_labels: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("vision_timeout: soon\n"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("rules:\n  confidence_threshold: 300\n"),
            Err(ConfigError::Rules(_))
        ));
    }

    #[test]
    fn test_durations_serialize_readably() {
        let yaml = serde_yaml::to_string(&RuntimeConfig::default()).unwrap();
        assert!(yaml.contains("30s"));
        assert!(yaml.contains("1h"));

        let reparsed = RuntimeConfig::from_yaml(&yaml).unwrap();
        assert_eq!(reparsed.vision_timeout, Duration::from_secs(30));
    }
}
