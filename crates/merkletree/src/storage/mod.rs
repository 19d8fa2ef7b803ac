//! Content-addressed node persistence.

mod memory;

pub use memory::MemoryStorage;

use crate::error::MerkleTreeError;
use crate::hash::Hash;
use crate::node::Node;

/// Key-value backend the tree persists nodes into, plus the single mutable
/// root cell.
///
/// Nodes are content-addressed, so `put` is idempotent: repeated writes of
/// the same key carry the same bytes. The tree persists every intermediate
/// node before it moves the root pointer; the root write is the commit point,
/// and a backend must be durable across that boundary. One tree instance
/// assumes exclusive write access.
pub trait Storage {
    /// Content-addressed lookup. `Ok(None)` means the key is absent.
    fn get(&self, key: &Hash) -> Result<Option<Node>, MerkleTreeError>;

    /// Persists a node under its content address.
    fn put(&mut self, key: &Hash, node: &Node) -> Result<(), MerkleTreeError>;

    /// Current root pointer; `ZERO_HASH` for a fresh store.
    fn get_root(&self) -> Result<Hash, MerkleTreeError>;

    /// Replaces the root pointer.
    fn set_root(&mut self, root: &Hash) -> Result<(), MerkleTreeError>;
}
