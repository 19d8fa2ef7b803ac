//! The three node variants and their key-derivation rules.

use ark_bn254::Fr;
use ark_ff::One;

use crate::error::MerkleTreeError;
use crate::hash::{FieldHasher, Hash, HASH_LEN, ZERO_HASH};

const TAG_INTERNAL: u8 = 0;
const TAG_LEAF: u8 = 1;
const TAG_EMPTY: u8 = 2;

const NODE_BYTES: usize = 1 + 2 * HASH_LEN;

/// A node of the tree.
///
/// `Empty` is a sentinel: it is never persisted and `ZERO_HASH` stands in for
/// it wherever a child or sibling slot is vacant. Persisted nodes are
/// immutable; mutations write new nodes along the modified path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Empty,
    /// Terminal node holding an entry. A leaf sits at the first depth where
    /// its key's path no longer collides with any other stored key.
    Leaf { k: Hash, v: Hash },
    /// Binary branch holding the keys of its two children.
    Internal { child_l: Hash, child_r: Hash },
}

impl Node {
    /// Content address of this node.
    ///
    /// Leaves hash as `H(k, v, 1)`; the constant third input separates them
    /// from internal nodes, so an entry can never collide with a branch.
    pub fn key<H: FieldHasher>(&self, hasher: &H) -> Hash {
        match self {
            Node::Empty => ZERO_HASH,
            Node::Leaf { k, v } => {
                Hash::from_fr(&hasher.hash(&[k.to_fr(), v.to_fr(), Fr::one()]))
            }
            Node::Internal { child_l, child_r } => {
                Hash::from_fr(&hasher.hash(&[child_l.to_fr(), child_r.to_fr()]))
            }
        }
    }

    /// Storage representation: a type tag followed by the two 32-byte words.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Node::Empty => vec![TAG_EMPTY],
            Node::Leaf { k, v } => {
                let mut out = Vec::with_capacity(NODE_BYTES);
                out.push(TAG_LEAF);
                out.extend_from_slice(k.as_bytes());
                out.extend_from_slice(v.as_bytes());
                out
            }
            Node::Internal { child_l, child_r } => {
                let mut out = Vec::with_capacity(NODE_BYTES);
                out.push(TAG_INTERNAL);
                out.extend_from_slice(child_l.as_bytes());
                out.extend_from_slice(child_r.as_bytes());
                out
            }
        }
    }

    /// Decodes the storage representation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MerkleTreeError> {
        match bytes.first() {
            Some(&TAG_EMPTY) if bytes.len() == 1 => Ok(Node::Empty),
            Some(&TAG_LEAF) if bytes.len() == NODE_BYTES => Ok(Node::Leaf {
                k: read_word(&bytes[1..1 + HASH_LEN])?,
                v: read_word(&bytes[1 + HASH_LEN..])?,
            }),
            Some(&TAG_INTERNAL) if bytes.len() == NODE_BYTES => Ok(Node::Internal {
                child_l: read_word(&bytes[1..1 + HASH_LEN])?,
                child_r: read_word(&bytes[1 + HASH_LEN..])?,
            }),
            _ => Err(MerkleTreeError::InvalidNodeFound),
        }
    }
}

fn read_word(bytes: &[u8]) -> Result<Hash, MerkleTreeError> {
    let mut word = [0u8; HASH_LEN];
    word.copy_from_slice(bytes);
    Hash::from_bytes(word).map_err(|_| MerkleTreeError::InvalidNodeFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poseidon::PoseidonHasher;
    use num_bigint::BigUint;

    fn hash(n: u64) -> Hash {
        Hash::from_biguint(&BigUint::from(n)).unwrap()
    }

    #[test]
    fn test_empty_key_is_zero() {
        let hasher = PoseidonHasher::new();
        assert_eq!(Node::Empty.key(&hasher), ZERO_HASH);
    }

    #[test]
    fn test_leaf_domain_separation() {
        // a leaf over (a, b) must not collide with an internal over (a, b)
        let hasher = PoseidonHasher::new();
        let leaf = Node::Leaf { k: hash(7), v: hash(8) };
        let internal = Node::Internal { child_l: hash(7), child_r: hash(8) };
        assert_ne!(leaf.key(&hasher), internal.key(&hasher));
    }

    #[test]
    fn test_key_depends_on_both_words() {
        let hasher = PoseidonHasher::new();
        let a = Node::Leaf { k: hash(1), v: hash(2) };
        let b = Node::Leaf { k: hash(1), v: hash(3) };
        let c = Node::Leaf { k: hash(2), v: hash(2) };
        assert_ne!(a.key(&hasher), b.key(&hasher));
        assert_ne!(a.key(&hasher), c.key(&hasher));
    }

    #[test]
    fn test_round_trip() {
        for node in [
            Node::Empty,
            Node::Leaf { k: hash(42), v: hash(1000) },
            Node::Internal { child_l: hash(5), child_r: ZERO_HASH },
        ] {
            assert_eq!(Node::from_bytes(&node.to_bytes()).unwrap(), node);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut bytes = Node::Leaf { k: hash(1), v: hash(2) }.to_bytes();
        bytes[0] = 9;
        assert_eq!(
            Node::from_bytes(&bytes),
            Err(MerkleTreeError::InvalidNodeFound)
        );
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let bytes = Node::Leaf { k: hash(1), v: hash(2) }.to_bytes();
        assert_eq!(
            Node::from_bytes(&bytes[..NODE_BYTES - 1]),
            Err(MerkleTreeError::InvalidNodeFound)
        );
    }
}
