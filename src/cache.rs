//! Caching of built decode trees.
//!
//! Building the tree walks the whole encoding index; for repeated runs
//! the result can be saved and reloaded instead. The on-disk format is
//! explicit and versioned: a wrapper object carrying
//! [`FORMAT_VERSION`] around the serialized root node. Loading a cache
//! written by a different version fails with
//! [`CacheError::VersionMismatch`] rather than deserializing a stale
//! layout into the current types.
//!
//! Form pages serialize as their file path only and re-load lazily
//! after deserialization.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::index::DecodeTree;

/// Cache format version; bump whenever the tree representation changes.
pub const FORMAT_VERSION: u32 = 1;

/// Error type for cache failures.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("cache format version {found} does not match expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

#[derive(Serialize, Deserialize)]
struct CachedTree {
    version: u32,
    root: DecodeTree,
}

/// Save a built tree to `path`.
pub fn save(tree: &DecodeTree, path: &Path) -> Result<(), CacheError> {
    let wrapper = CachedTree {
        version: FORMAT_VERSION,
        root: tree.clone(),
    };
    let json = serde_json::to_string(&wrapper)?;
    std::fs::write(path, json)?;
    log::info!("saved decode tree cache to {}", path.display());
    Ok(())
}

/// Load a tree previously written by [`save`].
pub fn load(path: &Path) -> Result<DecodeTree, CacheError> {
    let json = std::fs::read_to_string(path)?;
    let wrapper: CachedTree = serde_json::from_str(&json)?;
    if wrapper.version != FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            found: wrapper.version,
            expected: FORMAT_VERSION,
        });
    }
    log::info!("loaded decode tree cache from {}", path.display());
    Ok(wrapper.root)
}
