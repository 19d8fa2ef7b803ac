//! In-memory storage backend.

use std::collections::HashMap;

use super::Storage;
use crate::error::MerkleTreeError;
use crate::hash::Hash;
use crate::node::Node;

/// HashMap-backed storage holding serialized nodes, for tests and
/// short-lived trees.
///
/// Superseded nodes accumulate: nothing is ever evicted, so any historical
/// root a caller retains remains navigable.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    kv: HashMap<Hash, Vec<u8>>,
    root: Hash,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted nodes, superseded ones included.
    pub fn len(&self) -> usize {
        self.kv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kv.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &Hash) -> Result<Option<Node>, MerkleTreeError> {
        self.kv
            .get(key)
            .map(|bytes| Node::from_bytes(bytes))
            .transpose()
    }

    fn put(&mut self, key: &Hash, node: &Node) -> Result<(), MerkleTreeError> {
        self.kv.insert(*key, node.to_bytes());
        Ok(())
    }

    fn get_root(&self) -> Result<Hash, MerkleTreeError> {
        Ok(self.root)
    }

    fn set_root(&mut self, root: &Hash) -> Result<(), MerkleTreeError> {
        self.root = *root;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ZERO_HASH;
    use num_bigint::BigUint;

    fn hash(n: u64) -> Hash {
        Hash::from_biguint(&BigUint::from(n)).unwrap()
    }

    #[test]
    fn test_fresh_store_root_is_zero() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_root().unwrap(), ZERO_HASH);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_put_get_round_trip() {
        let mut storage = MemoryStorage::new();
        let node = Node::Leaf { k: hash(1), v: hash(2) };
        storage.put(&hash(99), &node).unwrap();

        assert_eq!(storage.get(&hash(99)).unwrap(), Some(node));
        assert_eq!(storage.get(&hash(100)).unwrap(), None);
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut storage = MemoryStorage::new();
        let node = Node::Internal { child_l: hash(1), child_r: hash(2) };
        storage.put(&hash(7), &node).unwrap();
        storage.put(&hash(7), &node).unwrap();
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_root_cell() {
        let mut storage = MemoryStorage::new();
        storage.set_root(&hash(5)).unwrap();
        assert_eq!(storage.get_root().unwrap(), hash(5));
    }
}
