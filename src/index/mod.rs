//! Decode-tree core: encoding index in, classification tree out.
//!
//! This module turns the Arm Machine Readable Architecture encoding
//! index (`encodingindex.xml`) into an in-memory decision tree and
//! answers lookups against it.
//!
//! # Overview
//!
//! The index is a hierarchy of grouping nodes that partition the
//! instruction space by bitfield values, bottoming out in flat
//! instruction tables whose rows name individual instruction forms.
//! [`DecodeTree`] mirrors that hierarchy: each [`DecodeNode`] carries
//! the bit layout for its level and an ordered dispatch table; decoding
//! extracts the layout's fields from the word and takes the first
//! matching row, recursing until it reaches a form page or bare name.
//!
//! Built once, queried many times: the tree is immutable after
//! construction and decode is a read-only query.
//!
//! # Example
//!
//! ```ignore
//! use mra_decode::index::{Decoded, DecodeTree};
//!
//! let tree = DecodeTree::load("../arm-spec")?;
//! match tree.decode(0x9100_0421) {
//!     Some(Decoded::Form(form)) => println!("{}", form),
//!     Some(Decoded::Name(name)) => println!("{} (no form page)", name),
//!     None => println!("undecodable"),
//! }
//! ```

mod builder;
mod decode;
mod matching;
mod types;

pub use builder::BuildError;
pub use matching::wildcard_eq;
pub use types::{BitLayout, Decoded, DecodeNode, FieldSpec, Pattern, RowKey, Target};

use std::path::Path;

use serde::{Deserialize, Serialize};

/// File name of the encoding index within the spec directory.
pub const ENCODING_INDEX_FILE: &str = "encodingindex.xml";

/// A built decode tree, rooted at the index's `<hierarchy>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeTree {
    root: DecodeNode,
}

impl DecodeTree {
    /// Load and build the tree from a spec directory containing
    /// `encodingindex.xml`. Form-page references in the index resolve
    /// against the same directory.
    pub fn load(spec_dir: impl AsRef<Path>) -> Result<Self, BuildError> {
        let spec_dir = spec_dir.as_ref();
        let xml = std::fs::read_to_string(spec_dir.join(ENCODING_INDEX_FILE))?;
        Self::from_xml(&xml, spec_dir)
    }

    /// Build the tree from already-read index XML. `spec_dir` is the
    /// directory form-page paths are resolved against.
    pub fn from_xml(xml: &str, spec_dir: &Path) -> Result<Self, BuildError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = builder::build_root(&doc, spec_dir)?;
        log::info!(
            "built decode tree: {} top-level rows, {} rows total",
            root.dispatch().len(),
            root.total_rows()
        );
        Ok(Self { root })
    }

    /// Construct a tree around an already-built root node (used when
    /// loading from a cache).
    pub fn from_root(root: DecodeNode) -> Self {
        Self { root }
    }

    /// Classify one instruction word. `None` means undecodable.
    pub fn decode(&self, word: u32) -> Option<Decoded> {
        self.root.decode(word)
    }

    /// The root node.
    pub fn root(&self) -> &DecodeNode {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_INDEX: &str = r#"
<encodingindex>
  <hierarchy>
    <regdiagram><box hibit="31" width="2" name="opc"/></regdiagram>
    <node iclass="alu">
      <decode><box name="opc"><c>1x</c></box></decode>
    </node>
    <node iclass="orphan">
      <decode><box name="opc"><c>00</c></box></decode>
    </node>
  </hierarchy>
  <iclass_sect id="alu">
    <regdiagram><box hibit="29" width="2" name="subop"/></regdiagram>
    <instructiontable>
      <thead>
        <tr><th>banner</th></tr>
        <tr><th>subop</th></tr>
      </thead>
      <tbody>
        <tr encname="form_a"><td>00</td></tr>
        <tr encname="form_b"><td>x1</td></tr>
      </tbody>
    </instructiontable>
  </iclass_sect>
</encodingindex>
"#;

    #[test]
    fn test_end_to_end_decode() {
        let tree = DecodeTree::from_xml(TEST_INDEX, Path::new("spec")).unwrap();

        // opc = 10, subop = 01 -> form_b
        assert_eq!(
            tree.decode(0b1001 << 28),
            Some(Decoded::Name("form_b".to_string()))
        );
        // opc = 00 routes to the orphan reference, kept as a bare name
        assert_eq!(tree.decode(0), Some(Decoded::Name("orphan".to_string())));
        // opc = 01 matches no row at the root
        assert_eq!(tree.decode(0b01 << 30), None);
    }

    #[test]
    fn test_build_is_idempotent() {
        let a = DecodeTree::from_xml(TEST_INDEX, Path::new("spec")).unwrap();
        let b = DecodeTree::from_xml(TEST_INDEX, Path::new("spec")).unwrap();

        assert_eq!(a, b);
        for word in [0u32, 0b1001 << 28, 0b01 << 30, 0xFFFF_FFFF] {
            assert_eq!(a.decode(word), b.decode(word));
        }
    }

    #[test]
    fn test_missing_hierarchy_fails() {
        let result = DecodeTree::from_xml("<encodingindex/>", Path::new("spec"));
        assert!(matches!(result, Err(BuildError::MissingHierarchy)));
    }

    #[test]
    fn test_load_missing_directory_is_io_error() {
        let result = DecodeTree::load("/nonexistent/spec-dir");
        assert!(matches!(result, Err(BuildError::Io(_))));
    }
}
