//! # hygiene-runtime
//!
//! Async audit orchestration for `hygiene-core`.
//!
//! The core crate decides; this crate does the I/O around the decision:
//! storing the photo, asking a vision backend what it sees, persisting the
//! audit and serving review queues.
//!
//! ## Layout
//!
//! - [`ports`]: traits for vision, storage and audit persistence
//! - [`adapters`]: replay, in-memory and (feature `http`) remote implementations
//! - [`resilience`]: retries, circuit breaker and provider fallback
//! - [`cache`]: vision results keyed by image content
//! - [`orchestrator`]: the [`AuditService`] tying it together
//!
//! ## Example
//!
//! ```rust,ignore
//! use hygiene_runtime::{AuditServiceBuilder, ProviderRegistry, RuntimeConfig, SubmitAudit};
//!
//! let config = RuntimeConfig::from_file("hygiene.yaml")?;
//! let service = AuditServiceBuilder::from_config(config, &ProviderRegistry::with_defaults())?
//!     .build()?;
//!
//! let audit = service
//!     .submit(SubmitAudit::new("D1", "showroom", "u1", bytes, "image/jpeg"))
//!     .await?;
//! println!("{}", audit.status());
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod ports;
pub mod providers;
pub mod report;
pub mod resilience;

pub use adapters::{
    InMemoryAuditRepository, InMemoryStorage, PayloadFormat, ReplayVisionProvider,
    ReplayVisionProviderFactory,
};
pub use cache::{CacheConfig, VisionCache};
pub use config::{ConfigError, ProviderSelection, RuntimeConfig};
pub use orchestrator::{
    AuditService, AuditServiceBuilder, ComplianceSummary, ServiceError, SubmitAudit,
};
pub use ports::{
    AnalysisParams, AuditRepository, RepositoryError, StorageError, StorageProvider,
    StoredObject, VisionError, VisionProvider,
};
pub use providers::{ApiCredential, CredentialSource, ProviderRegistry, VisionProviderFactory};
pub use report::{AuditReport, ReportedLabel};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, FallbackVisionProvider, RetryPolicy,
    RetryingVisionProvider,
};

#[cfg(feature = "http")]
pub use adapters::{HttpVisionProvider, HttpVisionProviderFactory};
