//! Field extraction from raw instruction words.
//!
//! Given a node's bit layout, produces the concrete value of every
//! named field as an MSB-first binary string of exactly the declared
//! width, the representation the dispatch patterns are written
//! against.

use std::collections::HashMap;

use crate::index::{BitLayout, FieldSpec};

/// Extract every field declared by `layout` from `word`.
///
/// Deterministic and total: bit positions outside the word read as
/// zero, so any layout the builder can produce yields a value for every
/// field.
pub fn extract(layout: &BitLayout, word: u32) -> HashMap<String, String> {
    let mut values = HashMap::with_capacity(layout.len());
    for (name, spec) in layout.iter() {
        values.insert(name.to_string(), field_bits(spec, word));
    }
    values
}

/// Render one field as its MSB-first bit string.
#[inline]
fn field_bits(spec: FieldSpec, word: u32) -> String {
    let mut bits = String::with_capacity(spec.width as usize);
    for i in 0..spec.width {
        let set = match spec.hibit.checked_sub(i) {
            Some(pos) if pos < u32::BITS => (word >> pos) & 1 == 1,
            _ => false,
        };
        bits.push(if set { '1' } else { '0' });
    }
    bits
}
