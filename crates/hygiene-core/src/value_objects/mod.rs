//! Immutable, self-validating domain primitives.

mod confidence;
mod image;
mod status;

pub use confidence::ConfidenceScore;
pub use image::{ImageMetadata, ImageMetadataBuilder, MAX_IMAGE_BYTES, MIN_HEIGHT_PX, MIN_WIDTH_PX};
pub use status::CleanlinessStatus;
