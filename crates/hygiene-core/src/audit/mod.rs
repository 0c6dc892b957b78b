//! The audit aggregate: verdict, explanation and review lifecycle.

mod label;
pub mod reason;
mod result;

pub use label::DetectedLabel;
pub use result::{AuditLifecycle, AuditResult, AuditResultBuilder};
