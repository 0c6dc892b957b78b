//! Factory pattern for registering vision backends by name.
//!
//! New backends are added by registering a factory; configuration selects
//! one by its type string.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = ProviderRegistry::new();
//! registry.register(Arc::new(ReplayVisionProviderFactory));
//!
//! let provider = registry.create("replay", &config)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::ports::{VisionError, VisionProvider};

/// Creates vision providers from JSON configuration.
///
/// Each factory owns one type identifier, validates its own configuration
/// format and builds ready-to-use provider instances.
pub trait VisionProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, e.g. "replay" or "http".
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance from JSON configuration.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn VisionProvider>, VisionError>;

    /// Validate configuration without creating a provider.
    ///
    /// Use this for fast config validation during startup.
    fn validate_config(&self, config: &JsonValue) -> Result<(), VisionError>;
}

/// Registry of available provider factories, keyed by type name.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn VisionProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory, replacing any with the same type.
    pub fn register(&mut self, factory: Arc<dyn VisionProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Create a provider from type name and configuration.
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn VisionProvider>, VisionError> {
        self.factories
            .get(provider_type)
            .ok_or_else(|| VisionError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            )))?
            .create(config)
    }

    /// Validate configuration for a provider type.
    pub fn validate(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<(), VisionError> {
        self.factories
            .get(provider_type)
            .ok_or_else(|| VisionError::NotConfigured(format!(
                "Unknown provider type: '{}'",
                provider_type
            )))?
            .validate_config(config)
    }

    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    /// Create a registry with all built-in providers registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::adapters::ReplayVisionProviderFactory));
        #[cfg(feature = "http")]
        registry.register(Arc::new(crate::adapters::HttpVisionProviderFactory));
        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
