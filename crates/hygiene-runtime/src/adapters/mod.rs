//! Concrete implementations of the [`crate::ports`] traits.
//!
//! - [`normalize`]: turns backend payloads into [`hygiene_core::VisionAnalysisResult`]
//! - [`ReplayVisionProvider`]: serves a recorded analysis
//! - [`InMemoryStorage`] and [`InMemoryAuditRepository`]: local state
//! - `HttpVisionProvider` (feature `http`): remote label service

mod memory;
pub mod normalize;
mod replay;

#[cfg(feature = "http")]
mod http;

pub use memory::{InMemoryAuditRepository, InMemoryStorage};
pub use normalize::PayloadFormat;
pub use replay::{ReplayVisionProvider, ReplayVisionProviderFactory};

#[cfg(feature = "http")]
pub use http::{HttpVisionProvider, HttpVisionProviderFactory, VISION_API_KEY_ENV};
