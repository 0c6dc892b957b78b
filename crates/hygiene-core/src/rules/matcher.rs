//! Compiled negative-term matching.

use regex::RegexSet;
use std::collections::BTreeSet;

use crate::error::DomainError;

/// Case-insensitive substring matcher over a fixed set of terms.
///
/// Terms are escaped, so they always match literally. A label that contains
/// several terms is attributed to the first one in sorted order.
#[derive(Debug, Clone)]
pub struct NegativeLabelMatcher {
    terms: Vec<String>,
    set: RegexSet,
}

impl NegativeLabelMatcher {
    pub fn new(terms: &BTreeSet<String>) -> Result<Self, DomainError> {
        let terms: Vec<String> = terms.iter().cloned().collect();
        let patterns = terms
            .iter()
            .map(|term| format!("(?i){}", regex::escape(term)));

        let set = RegexSet::new(patterns)
            .map_err(|e| DomainError::InvalidRules(format!("Failed to compile terms: {}", e)))?;

        Ok(Self { terms, set })
    }

    /// The term a label name matches, if any.
    pub fn matched_term(&self, label_name: &str) -> Option<&str> {
        self.set
            .matches(label_name)
            .into_iter()
            .next()
            .map(|index| self.terms[index].as_str())
    }

    pub fn is_negative(&self, label_name: &str) -> bool {
        self.set.is_match(label_name)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(terms: &[&str]) -> NegativeLabelMatcher {
        let set = terms.iter().map(|t| t.to_string()).collect();
        NegativeLabelMatcher::new(&set).unwrap()
    }

    #[test]
    fn test_case_insensitive_substring() {
        let m = matcher(&["Stain", "Trash"]);
        assert!(m.is_negative("Oil Stain"));
        assert!(m.is_negative("TRASH CAN"));
        assert!(m.is_negative("stained carpet"));
        assert!(!m.is_negative("Car"));
    }

    #[test]
    fn test_terms_are_literal() {
        let m = matcher(&["a.b"]);
        assert!(m.is_negative("A.B sign"));
        assert!(!m.is_negative("axb"));
    }

    #[test]
    fn test_overlapping_terms_attribute_first_sorted() {
        let m = matcher(&["Mess", "Garbage", "Garbage Mess"]);
        assert_eq!(m.matched_term("garbage mess on floor"), Some("Garbage"));
    }

    #[test]
    fn test_empty_matcher_never_matches() {
        let m = NegativeLabelMatcher::new(&BTreeSet::new()).unwrap();
        assert!(m.is_empty());
        assert!(!m.is_negative("Trash"));
        assert_eq!(m.matched_term("Trash"), None);
    }
}
