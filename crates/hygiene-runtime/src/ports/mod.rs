//! Boundary contracts for the systems an audit touches.
//!
//! The audit service depends only on these traits. Concrete systems live in
//! [`crate::adapters`].

mod repository;
mod storage;
mod vision;

pub use repository::{AuditRepository, RepositoryError};
pub use storage::{StorageError, StorageProvider, StoredObject};
pub use vision::{AnalysisParams, VisionError, VisionProvider};
