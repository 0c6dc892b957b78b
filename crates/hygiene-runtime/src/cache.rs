//! Caching layer for hygiene-runtime.
//!
//! Provides in-memory caching of vision results so re-submitting the same
//! photo with the same call parameters does not pay for a second analysis.

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use hygiene_core::VisionAnalysisResult;

use crate::config::duration_str;
use crate::ports::AnalysisParams;

/// Cache key for vision results.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    content_hash: u64,
    max_labels: usize,
    min_confidence_bits: u64,
}

impl CacheKey {
    /// Create a cache key from the image and call parameters.
    pub fn new(image: &[u8], params: &AnalysisParams) -> Self {
        Self {
            content_hash: content_hash(image),
            max_labels: params.max_labels,
            min_confidence_bits: params.min_confidence.to_bits(),
        }
    }
}

/// Stable hash of image content, also used as the in-memory etag.
pub fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    pub max_entries: u64,

    /// How long a result stays valid, e.g. `"1h"`
    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Vision result cache using moka.
#[derive(Clone)]
pub struct VisionCache {
    cache: Cache<CacheKey, VisionAnalysisResult>,
}

impl VisionCache {
    /// Create a new cache with the given limits.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Build from settings; `None` when caching is disabled.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_entries, config.ttl))
    }

    pub async fn get(&self, key: &CacheKey) -> Option<VisionAnalysisResult> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, result: VisionAnalysisResult) {
        self.cache.insert(key, result).await;
    }

    /// Clear the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate entry count.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for VisionCache {
    fn default() -> Self {
        let config = CacheConfig::default();
        Self::new(config.max_entries, config.ttl)
    }
}

impl std::fmt::Debug for VisionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionCache")
            .field("entries", &self.entry_count())
            .finish()
    }
}
