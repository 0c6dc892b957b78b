//! Built-in negative label terms.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Grouping of the built-in violation terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    Debris,
    StainsDamage,
    Pests,
    Disorganization,
    Hazards,
}

impl fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationCategory::Debris => "debris",
            ViolationCategory::StainsDamage => "stains/damage",
            ViolationCategory::Pests => "pests",
            ViolationCategory::Disorganization => "disorganization",
            ViolationCategory::Hazards => "hazards",
        };
        f.write_str(name)
    }
}

lazy_static! {
    /// Default terms with their category.
    pub static ref DEFAULT_NEGATIVE_TERMS: Vec<(ViolationCategory, &'static str)> = {
        use ViolationCategory::*;
        vec![
            (Debris, "Dirt"), (Debris, "Mud"), (Debris, "Debris"), (Debris, "Trash"),
            (Debris, "Garbage"), (Debris, "Litter"), (Debris, "Waste"), (Debris, "Rubbish"),
            (Debris, "Clutter"), (Debris, "Mess"),
            (StainsDamage, "Stain"), (StainsDamage, "Graffiti"), (StainsDamage, "Rust"),
            (StainsDamage, "Corrosion"), (StainsDamage, "Mold"), (StainsDamage, "Mildew"),
            (StainsDamage, "Decay"), (StainsDamage, "Deterioration"),
            (Pests, "Insect"), (Pests, "Bug"), (Pests, "Rodent"), (Pests, "Pest"),
            (Pests, "Spider Web"),
            (Disorganization, "Disorder"), (Disorganization, "Disorganized"),
            (Disorganization, "Untidy"), (Disorganization, "Unkempt"),
            (Hazards, "Spill"), (Hazards, "Leak"), (Hazards, "Broken Glass"),
            (Hazards, "Sharp Object"),
        ]
    };
}

/// A fresh set of the default terms.
///
/// Each call allocates a new set so independently configured rules never
/// share one.
pub fn default_negative_labels() -> BTreeSet<String> {
    DEFAULT_NEGATIVE_TERMS
        .iter()
        .map(|(_, term)| term.to_string())
        .collect()
}

/// Category of a built-in term, compared case-insensitively.
pub fn category_of(term: &str) -> Option<ViolationCategory> {
    DEFAULT_NEGATIVE_TERMS
        .iter()
        .find(|(_, t)| t.eq_ignore_ascii_case(term))
        .map(|(category, _)| *category)
}

/// Default terms belonging to one category.
pub fn terms_in(category: ViolationCategory) -> Vec<&'static str> {
    DEFAULT_NEGATIVE_TERMS
        .iter()
        .filter(|(c, _)| *c == category)
        .map(|(_, term)| *term)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_terms_cover_every_category() {
        for category in [
            ViolationCategory::Debris,
            ViolationCategory::StainsDamage,
            ViolationCategory::Pests,
            ViolationCategory::Disorganization,
            ViolationCategory::Hazards,
        ] {
            assert!(!terms_in(category).is_empty(), "{} has no terms", category);
        }
    }

    #[test]
    fn test_default_sets_are_independent() {
        let mut first = default_negative_labels();
        let second = default_negative_labels();
        first.insert("Oil".to_string());
        assert!(!second.contains("Oil"));
        assert_eq!(second.len(), DEFAULT_NEGATIVE_TERMS.len());
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(category_of("trash"), Some(ViolationCategory::Debris));
        assert_eq!(category_of("Spider Web"), Some(ViolationCategory::Pests));
        assert_eq!(category_of("Car"), None);
    }
}
