//! # hygiene-core
//!
//! Deterministic facility cleanliness evaluation.
//!
//! This crate turns the labels a vision engine detected in a checkpoint photo
//! into an auditable verdict, answering:
//! - Is this area clean?
//! - Which detections made it fail?
//! - Does a human need to look at it?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same rules and labels always produce the same verdict
//! 2. **No I/O**: Evaluation is pure; vision and storage live in `hygiene-runtime`
//! 3. **Traceable**: Every NOT_CLEAN names the labels and terms behind it
//! 4. **Final reviews**: A reviewed audit cannot be silently re-analyzed
//!
//! ## Example
//!
//! ```rust,ignore
//! use hygiene_core::{CleanlinessRules, CleanlinessEvaluator, ImageMetadata};
//!
//! let rules = CleanlinessRules::from_file("rules.yaml")?;
//! let evaluator = CleanlinessEvaluator::new(rules)?;
//! let audit = evaluator.evaluate(&vision_result, metadata, None);
//!
//! match audit.status() {
//!     CleanlinessStatus::Clean => println!("OK: {}", audit.reason()),
//!     CleanlinessStatus::NotClean => println!("FAIL: {}", audit.reason()),
//!     _ => println!("REVIEW: {}", audit.reason()),
//! }
//! ```

pub mod audit;
pub mod error;
pub mod evaluator;
pub mod rules;
pub mod value_objects;
pub mod vision;

// Re-export main types at crate root
pub use audit::{AuditLifecycle, AuditResult, AuditResultBuilder, DetectedLabel};
pub use error::DomainError;
pub use evaluator::CleanlinessEvaluator;
pub use rules::{CleanlinessRules, RulesError, ViolationCategory};
pub use value_objects::{CleanlinessStatus, ConfidenceScore, ImageMetadata};
pub use vision::{VisionAnalysisResult, VisionLabel, VisionProviderKind};

/// Evaluate one vision result under the given rules.
///
/// Convenience for one-off evaluations; long-lived callers should keep a
/// [`CleanlinessEvaluator`] so the rule terms are compiled once.
pub fn evaluate(
    rules: &CleanlinessRules,
    vision_result: &VisionAnalysisResult,
    image_metadata: ImageMetadata,
) -> Result<AuditResult, DomainError> {
    let evaluator = CleanlinessEvaluator::new(rules.clone())?;
    Ok(evaluator.evaluate(vision_result, image_metadata, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ImageMetadata {
        ImageMetadata::builder("dealer-042", "restroom", "user-1")
            .location("hygiene-audits", "dealer-042/restroom/a.jpg")
            .size_bytes(2048)
            .dimensions(1280, 960)
            .build()
    }

    #[test]
    fn test_basic_evaluation() {
        let rules_yaml = r#"
negative_labels:
  - Puddle
  - Trash
confidence_threshold: 75
"#;

        let rules = CleanlinessRules::from_yaml(rules_yaml).unwrap();
        let vision_result = VisionAnalysisResult::new(
            vec![
                VisionLabel::new("Sink", ConfidenceScore::new(97.0).unwrap()),
                VisionLabel::new("Mirror", ConfidenceScore::new(90.0).unwrap()),
            ],
            VisionProviderKind::Rekognition,
            "3.0",
        );
        let audit = evaluate(&rules, &vision_result, metadata()).unwrap();

        // Should pass since nothing matches and confidence is high
        assert_eq!(audit.status(), CleanlinessStatus::Clean);
        assert!(audit.passes_compliance());
    }

    #[test]
    fn test_puddle_fails() {
        let rules = CleanlinessRules::from_yaml("negative_labels: [Puddle]\n").unwrap();
        let vision_result = VisionAnalysisResult::new(
            vec![VisionLabel::new("Water puddle", ConfidenceScore::new(88.0).unwrap())],
            VisionProviderKind::OnDevice,
            "mobilenet-v2",
        );
        let audit = evaluate(&rules, &vision_result, metadata()).unwrap();

        // Should fail on the custom term
        assert_eq!(audit.status(), CleanlinessStatus::NotClean);
        assert_eq!(audit.reason(), "Issues detected: Water puddle");
    }
}
