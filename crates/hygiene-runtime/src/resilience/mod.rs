//! Resilience patterns for vision calls.
//!
//! This module provides:
//! - Circuit breaker keyed by provider name
//! - Retry with exponential backoff for transient faults
//! - An ordered provider fallback chain

mod circuit_breaker;
mod fallback;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use fallback::FallbackVisionProvider;
pub use retry::{RetryPolicy, RetryingVisionProvider};
