//! Rules parsing from YAML/JSON.

use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_rules_schema;
use super::CleanlinessRules;
use crate::error::DomainError;

/// Errors that can occur when loading rules.
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Failed to read rules file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rules do not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl CleanlinessRules {
    /// Parse rules from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RulesError> {
        // An empty document means "all defaults"
        if yaml.trim().is_empty() {
            return Self::from_value(serde_json::json!({}));
        }
        let value: serde_json::Value = match serde_yaml::from_str(yaml)? {
            serde_json::Value::Null => serde_json::json!({}),
            value => value,
        };
        Self::from_value(value)
    }

    /// Parse rules from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load rules from a file, choosing the format by extension
    /// (`.json` is JSON, anything else is YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    /// Render as YAML, e.g. to print the defaults.
    pub fn to_yaml(&self) -> Result<String, RulesError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, RulesError> {
        validate_rules_schema(&value).map_err(RulesError::SchemaError)?;

        let rules: CleanlinessRules = serde_json::from_value(value)?;
        rules.validate()?;

        tracing::debug!(
            terms = rules.negative_labels.len(),
            threshold = rules.confidence_threshold,
            max_negative = rules.max_negative_labels,
            "Loaded cleanliness rules"
        );

        Ok(rules)
    }
}
