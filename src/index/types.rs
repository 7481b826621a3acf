//! Type definitions for the decode tree.
//!
//! These types represent the classification structure built from the
//! encoding index: a tree of dispatch tables keyed by bitfield-value
//! patterns, terminating in instruction-form references or bare names.
//!
//! The whole model is immutable after construction and serializable, so
//! a built tree can be cached (see [`crate::cache`]) and shared freely
//! across threads.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::disasm::{DecodedForm, FormPage};

/// One named bitfield within an instruction word.
///
/// Example: `<box hibit="28" width="4" name="cond"/>` becomes
/// `FieldSpec { hibit: 28, width: 4 }` under the name `cond`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Most-significant-bit position (bit 31 is the top of a 32-bit word).
    pub hibit: u32,
    /// Width in bits. The index omits the attribute for 1-wide fields.
    pub width: u32,
}

/// Named, positioned bitfields declared by one decode node.
///
/// Field names are unique within a layout; inserting a name again
/// replaces the earlier entry. Declaration order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitLayout {
    fields: Vec<(String, FieldSpec)>,
}

impl BitLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any earlier field of the same name.
    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        let name = name.into();
        if let Some(existing) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = spec;
        } else {
            self.fields.push((name, spec));
        }
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<FieldSpec> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| *spec)
    }

    /// Iterate fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldSpec)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), *s))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the layout declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A dispatch-row pattern, parsed once at build time from the index's
/// textual value forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    /// No constraint: matches any extracted value.
    /// Produced by an absent table cell.
    Any,
    /// Fixed-width pattern over `{0, 1, x}`, compared position by
    /// position with `x` as a per-bit don't-care.
    Bits(String),
    /// Negated pattern, textual form `prefix!=exclusion`.
    ///
    /// With an empty prefix the value must simply *not* match the
    /// exclusion. With a non-empty prefix the value's head must match
    /// the prefix and its tail must not match the exclusion ("these
    /// high bits, but not this value in the low bits").
    Not {
        prefix: String,
        exclusion: String,
    },
}

impl Pattern {
    /// Parse a table-cell or decode-constraint value.
    ///
    /// `None` (an empty cell) is the wildcard. Whitespace inside a
    /// negated value is insignificant and stripped before splitting.
    pub fn parse(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Pattern::Any;
        };
        if text.contains("!=") {
            let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            // contains() above guarantees the split succeeds
            let (prefix, exclusion) = stripped.split_once("!=").unwrap_or(("", ""));
            Pattern::Not {
                prefix: prefix.to_string(),
                exclusion: exclusion.to_string(),
            }
        } else {
            Pattern::Bits(text.to_string())
        }
    }
}

/// Ordered field constraints identifying one dispatch-table row.
///
/// Every constraint must hold for the row to be selected; the order of
/// constraints within a row does not affect matching, but row order
/// across the table does (first match wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowKey {
    constraints: SmallVec<[(String, Pattern); 4]>,
}

impl RowKey {
    /// Create an empty row key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint.
    pub fn push(&mut self, field: impl Into<String>, pattern: Pattern) {
        self.constraints.push((field.into(), pattern));
    }

    /// Iterate constraints in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Pattern)> {
        self.constraints.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the row key carries no constraints.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Pattern)> for RowKey {
    fn from_iter<T: IntoIterator<Item = (S, Pattern)>>(iter: T) -> Self {
        Self {
            constraints: iter.into_iter().map(|(n, p)| (n.into(), p)).collect(),
        }
    }
}

/// Where a matched dispatch row leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// A nested dispatch table.
    Table(Box<DecodeNode>),
    /// An instruction-form page, rendered at decode time.
    Form(FormPage),
    /// A bare name with no backing form page (named-only table rows and
    /// unresolved iclass references).
    Name(String),
}

/// One node of the decode tree.
///
/// Holds the bit layout used to extract field values from an
/// instruction word, plus either an insertion-ordered dispatch table or
/// a direct target for the single-outcome degenerate case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeNode {
    pub(crate) layout: BitLayout,
    pub(crate) dispatch: Vec<(RowKey, Target)>,
    pub(crate) direct: Option<Target>,
}

impl DecodeNode {
    /// The node's declared bit layout.
    pub fn layout(&self) -> &BitLayout {
        &self.layout
    }

    /// The dispatch rows in document order.
    pub fn dispatch(&self) -> &[(RowKey, Target)] {
        &self.dispatch
    }

    /// The direct target, if this node collapsed to a single outcome.
    pub fn direct(&self) -> Option<&Target> {
        self.direct.as_ref()
    }

    /// Total number of dispatch rows in this subtree.
    pub fn total_rows(&self) -> usize {
        let nested: usize = self
            .dispatch
            .iter()
            .map(|(_, t)| match t {
                Target::Table(node) => node.total_rows(),
                _ => 0,
            })
            .sum();
        self.dispatch.len() + nested
    }
}

/// Result of decoding one instruction word.
///
/// "Undecodable" is represented by the surrounding `Option`, not by a
/// variant here: many real words hit reserved or unallocated encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A fully rendered instruction form.
    Form(DecodedForm),
    /// A name with no renderable form.
    Name(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_cell_is_wildcard() {
        assert_eq!(Pattern::parse(None), Pattern::Any);
    }

    #[test]
    fn test_parse_plain_bits() {
        assert_eq!(
            Pattern::parse(Some("101x")),
            Pattern::Bits("101x".to_string())
        );
    }

    #[test]
    fn test_parse_negation_without_prefix() {
        assert_eq!(
            Pattern::parse(Some("!= 111x")),
            Pattern::Not {
                prefix: String::new(),
                exclusion: "111x".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_negation_with_prefix_strips_whitespace() {
        assert_eq!(
            Pattern::parse(Some("01 != 1x")),
            Pattern::Not {
                prefix: "01".to_string(),
                exclusion: "1x".to_string(),
            }
        );
    }

    #[test]
    fn test_layout_insert_replaces_duplicate_name() {
        let mut layout = BitLayout::new();
        layout.insert("op", FieldSpec { hibit: 31, width: 2 });
        layout.insert("op", FieldSpec { hibit: 27, width: 4 });

        assert_eq!(layout.len(), 1);
        assert_eq!(layout.get("op"), Some(FieldSpec { hibit: 27, width: 4 }));
    }

    #[test]
    fn test_layout_preserves_declaration_order() {
        let mut layout = BitLayout::new();
        layout.insert("a", FieldSpec { hibit: 31, width: 1 });
        layout.insert("b", FieldSpec { hibit: 30, width: 1 });
        layout.insert("c", FieldSpec { hibit: 29, width: 1 });

        let names: Vec<&str> = layout.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
