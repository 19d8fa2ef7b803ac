//! Membership and non-membership proofs with compressed sibling lists.

use num_bigint::BigUint;

use super::MerkleTree;
use crate::error::MerkleTreeError;
use crate::hash::{FieldHasher, Hash, ZERO_HASH};
use crate::node::Node;
use crate::storage::Storage;

/// The leaf found occupying the queried slot in a non-membership proof.
///
/// A verifier re-derives this leaf's key and checks that it sits at the
/// position reached by descending the queried key's path; since the two keys
/// differ, the queried key cannot be in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeAux {
    pub key: Hash,
    pub value: Hash,
}

/// A witness for the presence or absence of a key under a given root.
///
/// Only non-empty siblings are carried; `not_empties` is a bitmap with bit
/// `i` set iff the sibling at depth `i` is one of them, letting a verifier
/// re-inflate the list to `depth` entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    existence: bool,
    depth: usize,
    not_empties: Vec<u8>,
    siblings: Vec<Hash>,
    node_aux: Option<NodeAux>,
}

impl Proof {
    /// Whether a leaf holding the queried key was reached.
    pub fn existence(&self) -> bool {
        self.existence
    }

    /// Number of internal nodes traversed.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The compressed sibling list (non-empty siblings only).
    pub fn siblings(&self) -> &[Hash] {
        &self.siblings
    }

    /// Bitmap marking the depths the compressed siblings belong to.
    pub fn not_empties(&self) -> &[u8] {
        &self.not_empties
    }

    /// The occupying leaf of a non-membership proof, when the descent ended
    /// at a leaf holding a different key.
    pub fn node_aux(&self) -> Option<&NodeAux> {
        self.node_aux.as_ref()
    }

    /// Re-inflates the compressed sibling list to `depth` entries.
    pub fn all_siblings(&self) -> Vec<Hash> {
        let mut out = Vec::with_capacity(self.depth);
        let mut used = 0;
        for lvl in 0..self.depth {
            if bitmap_get(&self.not_empties, lvl) {
                out.push(self.siblings[used]);
                used += 1;
            } else {
                out.push(ZERO_HASH);
            }
        }
        out
    }

    /// Checks this proof against `root` for the entry `(k, v)`.
    ///
    /// An existence proof verifies iff `(k, v)` is the stored entry. A
    /// non-existence proof ignores `v` and reconstructs from the auxiliary
    /// leaf (or from the empty slot); it never verifies when the auxiliary
    /// leaf holds the queried key itself.
    pub fn verify<H: FieldHasher>(&self, hasher: &H, root: &Hash, k: &BigUint, v: &BigUint) -> bool {
        match self.root_from_proof(hasher, k, v) {
            Some(computed) => computed == *root,
            None => false,
        }
    }

    fn root_from_proof<H: FieldHasher>(&self, hasher: &H, k: &BigUint, v: &BigUint) -> Option<Hash> {
        let k_hash = Hash::from_biguint(k).ok()?;
        let mut key = if self.existence {
            let v_hash = Hash::from_biguint(v).ok()?;
            Node::Leaf { k: k_hash, v: v_hash }.key(hasher)
        } else {
            match &self.node_aux {
                None => ZERO_HASH,
                Some(aux) => {
                    if aux.key == k_hash {
                        return None;
                    }
                    Node::Leaf { k: aux.key, v: aux.value }.key(hasher)
                }
            }
        };

        let path = k_hash.path(self.depth);
        let mut used = self.siblings.len();
        for lvl in (0..self.depth).rev() {
            let sibling = if bitmap_get(&self.not_empties, lvl) {
                used -= 1;
                self.siblings[used]
            } else {
                ZERO_HASH
            };
            key = if path[lvl] {
                Node::Internal { child_l: sibling, child_r: key }.key(hasher)
            } else {
                Node::Internal { child_l: key, child_r: sibling }.key(hasher)
            };
        }
        Some(key)
    }
}

fn bitmap_get(bitmap: &[u8], i: usize) -> bool {
    bitmap[i / 8] >> (i % 8) & 1 == 1
}

fn bitmap_set(bitmap: &mut [u8], i: usize) {
    bitmap[i / 8] |= 1 << (i % 8);
}

impl<S: Storage, H: FieldHasher> MerkleTree<S, H> {
    /// Builds the witness for `k` against `root`, or against the current
    /// root when `None`.
    ///
    /// Returns the proof together with the value stored at the reached leaf
    /// (zero when the descent ends at an empty slot). The descent is
    /// read-only, so proofs can be generated against any retained historical
    /// root.
    pub fn generate_proof(
        &self,
        k: &BigUint,
        root: Option<&Hash>,
    ) -> Result<(Proof, BigUint), MerkleTreeError> {
        let k_hash = Hash::from_biguint(k)?;
        let root_key = root.copied().unwrap_or(self.root);
        let path = k_hash.path(self.max_levels);

        let mut siblings = Vec::new();
        let mut not_empties = vec![0u8; (self.max_levels + 7) / 8];
        let mut next_key = root_key;
        let mut existence = false;
        let mut node_aux = None;
        let mut value = ZERO_HASH;
        let mut terminal_depth = None;

        for lvl in 0..self.max_levels {
            match self.get_node(&next_key)? {
                Node::Empty => {
                    terminal_depth = Some(lvl);
                    break;
                }
                Node::Leaf { k: leaf_k, v: leaf_v } => {
                    value = leaf_v;
                    if leaf_k == k_hash {
                        existence = true;
                    } else {
                        node_aux = Some(NodeAux { key: leaf_k, value: leaf_v });
                    }
                    terminal_depth = Some(lvl);
                    break;
                }
                Node::Internal { child_l, child_r } => {
                    let sibling = if path[lvl] {
                        next_key = child_r;
                        child_l
                    } else {
                        next_key = child_l;
                        child_r
                    };
                    if !sibling.is_zero() {
                        bitmap_set(&mut not_empties, lvl);
                        siblings.push(sibling);
                    }
                }
            }
        }

        let depth = terminal_depth.ok_or(MerkleTreeError::ReachedMaxLevel)?;
        Ok((
            Proof {
                existence,
                depth,
                not_empties,
                siblings,
                node_aux,
            },
            value.to_biguint(),
        ))
    }
}
