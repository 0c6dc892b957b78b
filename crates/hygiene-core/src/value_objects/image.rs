//! Metadata for an uploaded facility image.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Largest payload the vision service accepts (15 MB).
pub const MAX_IMAGE_BYTES: u64 = 15 * 1024 * 1024;

/// Minimum width for a meaningful analysis.
pub const MIN_WIDTH_PX: u32 = 640;

/// Minimum height for a meaningful analysis.
pub const MIN_HEIGHT_PX: u32 = 480;

/// Immutable description of an image: who took it, where it is stored,
/// which dealer and checkpoint it belongs to.
///
/// Built through [`ImageMetadata::builder`]; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    image_id: Uuid,
    dealer_id: String,
    checkpoint_id: String,
    bucket: String,
    key: String,
    uploader_id: String,
    captured_at: DateTime<Utc>,
    uploaded_at: DateTime<Utc>,
    size_bytes: u64,
    content_type: String,
    #[serde(default)]
    width_px: Option<u32>,
    #[serde(default)]
    height_px: Option<u32>,
}

impl ImageMetadata {
    /// Start building metadata for a stored image.
    pub fn builder(
        dealer_id: impl Into<String>,
        checkpoint_id: impl Into<String>,
        uploader_id: impl Into<String>,
    ) -> ImageMetadataBuilder {
        ImageMetadataBuilder::new(dealer_id, checkpoint_id, uploader_id)
    }

    pub fn image_id(&self) -> Uuid {
        self.image_id
    }

    pub fn dealer_id(&self) -> &str {
        &self.dealer_id
    }

    pub fn checkpoint_id(&self) -> &str {
        &self.checkpoint_id
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn uploader_id(&self) -> &str {
        &self.uploader_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// `(width, height)` when both are known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.width_px.zip(self.height_px)
    }

    /// Canonical `s3://bucket/key` location.
    pub fn storage_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    /// Check the technical requirements for analysis, naming the first
    /// failed check.
    pub fn validate_for_analysis(&self) -> Result<(), DomainError> {
        if self.size_bytes > MAX_IMAGE_BYTES {
            return Err(DomainError::InvalidImage(format!(
                "image is {} bytes, limit is {} bytes",
                self.size_bytes, MAX_IMAGE_BYTES
            )));
        }

        // Resolution is only checked when both dimensions are known
        if let Some((width, height)) = self.dimensions() {
            if width < MIN_WIDTH_PX || height < MIN_HEIGHT_PX {
                return Err(DomainError::InvalidImage(format!(
                    "resolution {}x{} is below the {}x{} minimum",
                    width, height, MIN_WIDTH_PX, MIN_HEIGHT_PX
                )));
            }
        }

        Ok(())
    }

    pub fn is_valid_for_analysis(&self) -> bool {
        self.validate_for_analysis().is_ok()
    }

    /// Whole days between capture and `reference`.
    pub fn age_in_days(&self, reference: DateTime<Utc>) -> i64 {
        (reference - self.captured_at).num_days()
    }
}

/// Builder for [`ImageMetadata`].
#[derive(Debug, Clone)]
pub struct ImageMetadataBuilder {
    image_id: Uuid,
    dealer_id: String,
    checkpoint_id: String,
    uploader_id: String,
    bucket: String,
    key: String,
    captured_at: Option<DateTime<Utc>>,
    uploaded_at: Option<DateTime<Utc>>,
    size_bytes: u64,
    content_type: String,
    width_px: Option<u32>,
    height_px: Option<u32>,
}

impl ImageMetadataBuilder {
    pub fn new(
        dealer_id: impl Into<String>,
        checkpoint_id: impl Into<String>,
        uploader_id: impl Into<String>,
    ) -> Self {
        Self {
            image_id: Uuid::new_v4(),
            dealer_id: dealer_id.into(),
            checkpoint_id: checkpoint_id.into(),
            uploader_id: uploader_id.into(),
            bucket: String::new(),
            key: String::new(),
            captured_at: None,
            uploaded_at: None,
            size_bytes: 0,
            content_type: "image/jpeg".to_string(),
            width_px: None,
            height_px: None,
        }
    }

    pub fn image_id(mut self, image_id: Uuid) -> Self {
        self.image_id = image_id;
        self
    }

    pub fn location(mut self, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self.key = key.into();
        self
    }

    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    pub fn uploaded_at(mut self, at: DateTime<Utc>) -> Self {
        self.uploaded_at = Some(at);
        self
    }

    pub fn size_bytes(mut self, size: u64) -> Self {
        self.size_bytes = size;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width_px = Some(width);
        self.height_px = Some(height);
        self
    }

    /// Build the metadata.
    ///
    /// Missing timestamps default to now; a missing upload time follows the
    /// capture time.
    pub fn build(self) -> ImageMetadata {
        let captured_at = self.captured_at.unwrap_or_else(Utc::now);
        ImageMetadata {
            image_id: self.image_id,
            dealer_id: self.dealer_id,
            checkpoint_id: self.checkpoint_id,
            bucket: self.bucket,
            key: self.key,
            uploader_id: self.uploader_id,
            captured_at,
            uploaded_at: self.uploaded_at.unwrap_or(captured_at),
            size_bytes: self.size_bytes,
            content_type: self.content_type,
            width_px: self.width_px,
            height_px: self.height_px,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn metadata() -> ImageMetadataBuilder {
        ImageMetadata::builder("dealer-001", "reception", "user-7")
            .location("hygiene-audits", "dealer-001/reception/img.jpg")
            .size_bytes(2 * 1024 * 1024)
    }

    #[test]
    fn test_storage_uri() {
        let meta = metadata().build();
        assert_eq!(
            meta.storage_uri(),
            "s3://hygiene-audits/dealer-001/reception/img.jpg"
        );
    }

    #[test]
    fn test_oversized_image_is_invalid() {
        let meta = metadata().size_bytes(MAX_IMAGE_BYTES + 1).build();
        assert!(!meta.is_valid_for_analysis());
        assert!(matches!(
            meta.validate_for_analysis(),
            Err(DomainError::InvalidImage(_))
        ));

        let at_limit = metadata().size_bytes(MAX_IMAGE_BYTES).build();
        assert!(at_limit.is_valid_for_analysis());
    }

    #[test]
    fn test_low_resolution_is_invalid() {
        assert!(!metadata().dimensions(639, 480).build().is_valid_for_analysis());
        assert!(!metadata().dimensions(640, 479).build().is_valid_for_analysis());
        assert!(metadata().dimensions(640, 480).build().is_valid_for_analysis());
    }

    #[test]
    fn test_unknown_dimensions_skip_resolution_check() {
        let meta = metadata().build();
        assert_eq!(meta.dimensions(), None);
        assert!(meta.is_valid_for_analysis());

        // Stored records may carry only one dimension
        let mut json = serde_json::to_value(&meta).unwrap();
        json["width_px"] = serde_json::json!(10);
        let partial: ImageMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(partial.dimensions(), None);
        assert!(partial.is_valid_for_analysis());
    }

    #[test]
    fn test_accessors_reflect_builder() {
        let image_id = Uuid::new_v4();
        let meta = metadata()
            .image_id(image_id)
            .content_type("image/png")
            .dimensions(1920, 1080)
            .build();

        assert_eq!(meta.image_id(), image_id);
        assert_eq!(meta.dealer_id(), "dealer-001");
        assert_eq!(meta.checkpoint_id(), "reception");
        assert_eq!(meta.uploader_id(), "user-7");
        assert_eq!(meta.bucket(), "hygiene-audits");
        assert_eq!(meta.key(), "dealer-001/reception/img.jpg");
        assert_eq!(meta.size_bytes(), 2 * 1024 * 1024);
        assert_eq!(meta.content_type(), "image/png");
        assert_eq!(meta.dimensions(), Some((1920, 1080)));
    }

    #[test]
    fn test_age_in_days() {
        let captured = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let meta = metadata().captured_at(captured).build();

        assert_eq!(meta.age_in_days(captured + Duration::hours(47)), 1);
        assert_eq!(meta.age_in_days(captured + Duration::days(90)), 90);
        assert_eq!(meta.uploaded_at(), captured);
    }
}
