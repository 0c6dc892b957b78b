//! Vision provider registration and credentials.
//!
//! Backends are selected by type name through the [`ProviderRegistry`].
//! Remote backends load their keys through [`ApiCredential`].

mod factory;
pub mod secrets;

pub use factory::{ProviderRegistry, VisionProviderFactory};
pub use secrets::{ApiCredential, CredentialSource};
