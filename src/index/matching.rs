//! Constraint matching against extracted field values.
//!
//! A dispatch row is selected when every one of its `(field, pattern)`
//! constraints holds for the values extracted from the instruction
//! word. This module answers only "does this constraint hold"; the
//! first-match-wins policy across rows lives in the traversal.

use std::collections::HashMap;

use super::types::{Pattern, RowKey};

/// Position-wise comparison where pattern character `x` matches any
/// value character.
///
/// Pattern and value must have the same width; the builder only pairs
/// patterns with fields of the declared width, so a mismatch means the
/// index document is inconsistent and there is no safe recovery.
#[inline]
pub fn wildcard_eq(pattern: &str, value: &str) -> bool {
    assert_eq!(
        pattern.len(),
        value.len(),
        "pattern {:?} and value {:?} differ in width",
        pattern,
        value
    );
    pattern
        .bytes()
        .zip(value.bytes())
        .all(|(p, v)| p == b'x' || p == v)
}

impl Pattern {
    /// Whether this pattern accepts the given extracted value.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Bits(pattern) => wildcard_eq(pattern, value),
            Pattern::Not { prefix, exclusion } => {
                if prefix.is_empty() {
                    !wildcard_eq(exclusion, value)
                } else {
                    assert!(
                        prefix.len() <= value.len(),
                        "negated prefix {:?} is wider than value {:?}",
                        prefix,
                        value
                    );
                    let (head, tail) = value.split_at(prefix.len());
                    wildcard_eq(prefix, head) && !wildcard_eq(exclusion, tail)
                }
            }
        }
    }
}

impl RowKey {
    /// Whether every constraint in this row holds.
    ///
    /// A constraint naming a field the node's layout never declared
    /// fails the row outright, wildcard or not: the value lookup comes
    /// before any pattern logic.
    pub fn matches(&self, values: &HashMap<String, String>) -> bool {
        self.iter().all(|(field, pattern)| match values.get(field) {
            Some(value) => pattern.matches(value),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_wildcard_exact_match() {
        assert!(wildcard_eq("0110", "0110"));
        assert!(!wildcard_eq("0110", "0111"));
    }

    #[test]
    fn test_wildcard_x_matches_any_bit() {
        assert!(wildcard_eq("0x1x", "0010"));
        assert!(wildcard_eq("0x1x", "0111"));
        assert!(!wildcard_eq("0x1x", "1010"));
    }

    #[test]
    fn test_all_x_pattern_matches_any_value() {
        for value in ["0000", "1111", "1010"] {
            assert!(wildcard_eq("xxxx", value));
        }
    }

    #[test]
    #[should_panic(expected = "differ in width")]
    fn test_width_mismatch_is_fatal() {
        wildcard_eq("01", "011");
    }

    #[test]
    fn test_any_pattern_matches_regardless_of_value() {
        for value in ["00", "01", "10", "11"] {
            assert!(Pattern::Any.matches(value));
        }
    }

    #[test]
    fn test_negation_without_prefix() {
        // "!=1x" rejects exactly the values matching 1x
        let pattern = Pattern::parse(Some("!=1x"));
        assert!(!pattern.matches("10"));
        assert!(!pattern.matches("11"));
        assert!(pattern.matches("00"));
        assert!(pattern.matches("01"));
    }

    #[test]
    fn test_negation_with_prefix() {
        // "01!=1x": head must equal 01, tail must not match 1x
        let pattern = Pattern::parse(Some("01!=1x"));
        assert!(!pattern.matches("0110")); // tail 10 matches 1x
        assert!(!pattern.matches("0111")); // tail 11 matches 1x
        assert!(pattern.matches("0100")); // tail 00 escapes the exclusion
        assert!(pattern.matches("0101"));
        assert!(!pattern.matches("1000")); // head 10 fails the prefix
    }

    #[test]
    fn test_negation_prefix_is_wildcard_aware() {
        let pattern = Pattern::parse(Some("0x!=11"));
        assert!(pattern.matches("0010"));
        assert!(pattern.matches("0110"));
        assert!(!pattern.matches("0011"));
    }

    #[test]
    fn test_row_requires_every_constraint() {
        let key: RowKey = [
            ("op", Pattern::parse(Some("1x"))),
            ("size", Pattern::parse(Some("00"))),
        ]
        .into_iter()
        .collect();

        assert!(key.matches(&values(&[("op", "10"), ("size", "00")])));
        assert!(!key.matches(&values(&[("op", "10"), ("size", "01")])));
        assert!(!key.matches(&values(&[("op", "01"), ("size", "00")])));
    }

    #[test]
    fn test_undeclared_field_fails_even_for_wildcard() {
        let key: RowKey = [("missing", Pattern::Any)].into_iter().collect();
        assert!(!key.matches(&values(&[("op", "10")])));
    }

    #[test]
    fn test_empty_row_key_matches() {
        let key = RowKey::new();
        assert!(key.matches(&values(&[])));
    }
}
