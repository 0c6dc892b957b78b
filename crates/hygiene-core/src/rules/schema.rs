//! JSON Schema validation for rules documents.
//!
//! Rules files are checked against `schema/cleanliness_rules.schema.json`
//! before they are deserialized, so typos in field names and out-of-range
//! numbers are reported with their location.

use std::sync::OnceLock;

/// Embedded rules schema (loaded at compile time).
const RULES_SCHEMA_JSON: &str = include_str!("../../schema/cleanliness_rules.schema.json");

/// Compiled validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    COMPILED_SCHEMA
        .get_or_init(|| {
            let schema: serde_json::Value = serde_json::from_str(RULES_SCHEMA_JSON)
                .map_err(|e| format!("Invalid schema JSON: {}", e))?;

            jsonschema::options()
                .build(&schema)
                .map_err(|e| format!("Failed to compile schema: {}", e))
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Validate a rules document.
///
/// Returns every violation found, each with its instance path.
pub fn validate_rules_schema(rules_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(rules_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
