//! Read-only decode traversal.
//!
//! Classifies one instruction word against a built tree: extract the
//! node's field values once, then either resolve the direct target or
//! walk the dispatch rows in document order and take the first row
//! whose every constraint matches. There is no best-match or
//! most-specific policy: the index orders rows so first-match is
//! unambiguous.

use super::types::{Decoded, DecodeNode, Target};
use crate::extract;

impl DecodeNode {
    /// Classify `word` at this node, recursing through nested tables.
    ///
    /// Returns `None` when no dispatch row matches: the word does not
    /// correspond to any known form here. That is an expected outcome
    /// (reserved and unallocated encodings), never an error.
    ///
    /// Pure query: `&self` only, no mutation of node or word, safe to
    /// call concurrently against a shared tree.
    pub fn decode(&self, word: u32) -> Option<Decoded> {
        let values = extract::extract(&self.layout, word);

        if let Some(target) = &self.direct {
            return resolve(target, word);
        }

        for (key, target) in &self.dispatch {
            if key.matches(&values) {
                log::trace!("word {:#010x} matched row {:?}", word, key);
                return resolve(target, word);
            }
        }
        None
    }
}

/// Resolve a selected target.
///
/// The exhaustive match also covers a `Table` in the direct slot: the
/// builder never produces that shape, but the traversal handles it the
/// same way as any nested table.
fn resolve(target: &Target, word: u32) -> Option<Decoded> {
    match target {
        Target::Table(node) => node.decode(word),
        Target::Form(page) => page.disassemble(word).map(Decoded::Form),
        Target::Name(name) => Some(Decoded::Name(name.clone())),
    }
}
