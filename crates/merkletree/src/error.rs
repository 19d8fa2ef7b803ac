//! The closed set of failure reasons for tree and storage operations.

use thiserror::Error;

/// Errors that can occur while reading or mutating the tree.
///
/// Every error surfaces to the caller unchanged; the library attempts no
/// internal recovery. A lookup of an absent key is not an error: `get`
/// returns zeros for it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerkleTreeError {
    /// Descent ended at an empty slot, or at a leaf holding a different key.
    #[error("key not found in the tree")]
    KeyNotFound,
    /// `add` found a leaf already indexed by the same key.
    #[error("the entry index already exists in the tree")]
    EntryIndexAlreadyExists,
    /// The operation would place a node below the maximum depth.
    #[error("reached maximum level of the tree")]
    ReachedMaxLevel,
    /// A persisted node carries an unrecognized type tag or a corrupt payload.
    #[error("found an invalid node in the storage")]
    InvalidNodeFound,
    /// Storage has no entry for a node key reachable from the root.
    #[error("node key not found in the storage")]
    NotFound,
    /// Mutating call on a read-only tree.
    #[error("the tree is not writable")]
    NotWritable,
    /// A key or value lies outside the scalar field.
    #[error("element is over the maximum field range")]
    FieldOverflow,
}
