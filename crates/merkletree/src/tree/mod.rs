//! Tree engine: insertion with on-demand subtree splitting, updates,
//! deletion with leaf collapse, and the read paths feeding the proof
//! generator.

mod circom;
mod gadgets;
mod proof;


pub use circom::{
    circom_siblings_from_siblings, CircomProcessorProof, CircomVerifierProof, ProcessorFn,
    VerifierFn,
};
pub use gadgets::{
    compute_root_var, leaf_key_var, verify_membership_var, verify_non_membership_var,
};
pub use proof::{NodeAux, Proof};

use num_bigint::BigUint;

use crate::error::MerkleTreeError;
use crate::hash::{FieldHasher, Hash, ZERO_HASH};
use crate::node::Node;
use crate::poseidon::PoseidonHasher;
use crate::storage::Storage;

/// A sparse Merkle tree over the BN254 scalar field.
///
/// Entries are `(key, value)` pairs of field elements; a leaf lives on the
/// path selected by the little-endian bits of its key and sits at the first
/// depth where that path stops colliding with other stored keys. Nodes are
/// immutable and content-addressed in `storage`; the cached root is the only
/// mutable datum and moves exactly once per committed mutation, after every
/// node of the new path has been persisted. Superseded nodes are never
/// collected, so retained historical roots stay navigable.
pub struct MerkleTree<S: Storage, H: FieldHasher = PoseidonHasher> {
    storage: S,
    hasher: H,
    root: Hash,
    writable: bool,
    max_levels: usize,
}

impl<S: Storage> MerkleTree<S, PoseidonHasher> {
    /// Opens a tree with the default Poseidon hasher, resuming from the
    /// root recorded in `storage`.
    pub fn new(storage: S, writable: bool, max_levels: usize) -> Result<Self, MerkleTreeError> {
        Self::with_hasher(storage, PoseidonHasher::new(), writable, max_levels)
    }
}

impl<S: Storage, H: FieldHasher> MerkleTree<S, H> {
    /// Opens a tree over an injected hasher.
    ///
    /// The hasher must be the one every prior write of this storage used.
    /// `max_levels` is fixed for the tree's lifetime: it bounds leaf depth
    /// and determines the fixed width of circuit-shaped proofs.
    pub fn with_hasher(
        storage: S,
        hasher: H,
        writable: bool,
        max_levels: usize,
    ) -> Result<Self, MerkleTreeError> {
        let root = storage.get_root()?;
        Ok(Self {
            storage,
            hasher,
            root,
            writable,
            max_levels,
        })
    }

    pub fn root(&self) -> &Hash {
        &self.root
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Inserts a new entry.
    ///
    /// Fails with [`MerkleTreeError::EntryIndexAlreadyExists`] if a leaf with
    /// the same key is present (use [`MerkleTree::update`] to change a
    /// value), and with [`MerkleTreeError::ReachedMaxLevel`] if separating
    /// the new leaf from an existing one would need a node below
    /// `max_levels`.
    pub fn add(&mut self, k: &BigUint, v: &BigUint) -> Result<(), MerkleTreeError> {
        self.ensure_writable()?;
        let k_hash = Hash::from_biguint(k)?;
        let v_hash = Hash::from_biguint(v)?;

        let new_leaf = Node::Leaf { k: k_hash, v: v_hash };
        let path = k_hash.path(self.max_levels);
        let root = self.root;
        let new_root = self.add_leaf(&new_leaf, &k_hash, &root, 0, &path)?;
        self.set_root(new_root)
    }

    /// Replaces the value of an existing entry and rebuilds its path.
    ///
    /// Returns the mutation witness shaped for the circuit processor
    /// (`fnc = Update`), carrying the old and new roots and the siblings
    /// observed on the way down.
    pub fn update(
        &mut self,
        k: &BigUint,
        v: &BigUint,
    ) -> Result<CircomProcessorProof, MerkleTreeError> {
        self.ensure_writable()?;
        let k_hash = Hash::from_biguint(k)?;
        let v_hash = Hash::from_biguint(v)?;

        let path = k_hash.path(self.max_levels);
        let mut next_key = self.root;
        let mut siblings = Vec::new();
        for lvl in 0..self.max_levels {
            match self.get_node(&next_key)? {
                Node::Empty => return Err(MerkleTreeError::KeyNotFound),
                Node::Leaf { k: leaf_k, v: leaf_v } => {
                    if leaf_k != k_hash {
                        return Err(MerkleTreeError::KeyNotFound);
                    }
                    let old_root = self.root;
                    let new_leaf = Node::Leaf { k: k_hash, v: v_hash };
                    self.add_node(&new_leaf)?;
                    let new_root =
                        self.recalculate_path_until_root(&path, &new_leaf, &siblings)?;
                    self.set_root(new_root)?;
                    return Ok(CircomProcessorProof {
                        old_root,
                        new_root,
                        old_key: k_hash,
                        old_value: leaf_v,
                        new_key: k_hash,
                        new_value: v_hash,
                        siblings: circom_siblings_from_siblings(siblings, self.max_levels),
                        is_old_0: false,
                        fnc: ProcessorFn::Update,
                    });
                }
                Node::Internal { child_l, child_r } => {
                    if path[lvl] {
                        next_key = child_r;
                        siblings.push(child_l);
                    } else {
                        next_key = child_l;
                        siblings.push(child_r);
                    }
                }
            }
        }
        Err(MerkleTreeError::KeyNotFound)
    }

    /// Walks `path(k)` to its terminal node.
    ///
    /// Returns the entry found there together with the siblings passed on
    /// the way down: `(0, 0, siblings)` for an empty slot, and the occupying
    /// leaf's entry otherwise, whether or not that leaf holds `k`. Callers
    /// distinguish presence from a non-membership witness by comparing the
    /// returned key against `k`; an absent key is not an error.
    pub fn get(&self, k: &BigUint) -> Result<(BigUint, BigUint, Vec<Hash>), MerkleTreeError> {
        let k_hash = Hash::from_biguint(k)?;
        let (found_k, found_v, siblings) = self.walk_to_terminal(&k_hash)?;
        Ok((found_k.to_biguint(), found_v.to_biguint(), siblings))
    }

    /// Removes the entry at `k`.
    ///
    /// Collapses lone leaves upward so that no internal node is left holding
    /// a leaf next to an empty slot. Fails with
    /// [`MerkleTreeError::KeyNotFound`] when the path ends at an empty slot
    /// or at a leaf holding a different key.
    pub fn delete(&mut self, k: &BigUint) -> Result<(), MerkleTreeError> {
        self.ensure_writable()?;
        let k_hash = Hash::from_biguint(k)?;

        let path = k_hash.path(self.max_levels);
        let mut next_key = self.root;
        let mut siblings = Vec::new();
        for lvl in 0..self.max_levels {
            match self.get_node(&next_key)? {
                Node::Empty => return Err(MerkleTreeError::KeyNotFound),
                Node::Leaf { k: leaf_k, .. } => {
                    if leaf_k != k_hash {
                        return Err(MerkleTreeError::KeyNotFound);
                    }
                    return self.rm_and_upload(&path, &siblings);
                }
                Node::Internal { child_l, child_r } => {
                    if path[lvl] {
                        next_key = child_r;
                        siblings.push(child_l);
                    } else {
                        next_key = child_l;
                        siblings.push(child_r);
                    }
                }
            }
        }
        Err(MerkleTreeError::KeyNotFound)
    }

    fn ensure_writable(&self) -> Result<(), MerkleTreeError> {
        if self.writable {
            Ok(())
        } else {
            Err(MerkleTreeError::NotWritable)
        }
    }

    fn set_root(&mut self, root: Hash) -> Result<(), MerkleTreeError> {
        self.storage.set_root(&root)?;
        self.root = root;
        Ok(())
    }

    /// Resolves a node key, treating `ZERO_HASH` as the empty subtree.
    fn get_node(&self, key: &Hash) -> Result<Node, MerkleTreeError> {
        if key.is_zero() {
            return Ok(Node::Empty);
        }
        self.storage.get(key)?.ok_or(MerkleTreeError::NotFound)
    }

    /// Persists a node under its content address and returns the address.
    fn add_node(&mut self, node: &Node) -> Result<Hash, MerkleTreeError> {
        let key = node.key(&self.hasher);
        if !matches!(node, Node::Empty) {
            self.storage.put(&key, node)?;
        }
        Ok(key)
    }

    /// Recursive descent for `add`: rebuilds the path from the insertion
    /// point back up, retaining the untouched sibling at every level.
    fn add_leaf(
        &mut self,
        new_leaf: &Node,
        k_new: &Hash,
        key: &Hash,
        lvl: usize,
        path: &[bool],
    ) -> Result<Hash, MerkleTreeError> {
        if lvl >= self.max_levels {
            return Err(MerkleTreeError::ReachedMaxLevel);
        }
        match self.get_node(key)? {
            Node::Empty => self.add_node(new_leaf),
            Node::Leaf { k: old_k, v: old_v } => {
                if old_k == *k_new {
                    return Err(MerkleTreeError::EntryIndexAlreadyExists);
                }
                let path_old = old_k.path(self.max_levels);
                let old_leaf = Node::Leaf { k: old_k, v: old_v };
                self.push_leaf(new_leaf, &old_leaf, lvl, path, &path_old)
            }
            Node::Internal { child_l, child_r } => {
                let rebuilt = if path[lvl] {
                    let next_key = self.add_leaf(new_leaf, k_new, &child_r, lvl + 1, path)?;
                    Node::Internal { child_l, child_r: next_key }
                } else {
                    let next_key = self.add_leaf(new_leaf, k_new, &child_l, lvl + 1, path)?;
                    Node::Internal { child_l: next_key, child_r }
                };
                self.add_node(&rebuilt)
            }
        }
    }

    /// Splits the slot shared by two leaves.
    ///
    /// Descends while the two paths agree, creating one internal node per
    /// level with an empty co-child, and places both leaves once the bits
    /// diverge: the new leaf in the slot its own path bit selects, the old
    /// leaf in the complement.
    fn push_leaf(
        &mut self,
        new_leaf: &Node,
        old_leaf: &Node,
        lvl: usize,
        path_new: &[bool],
        path_old: &[bool],
    ) -> Result<Hash, MerkleTreeError> {
        if lvl + 2 > self.max_levels {
            return Err(MerkleTreeError::ReachedMaxLevel);
        }
        if path_new[lvl] == path_old[lvl] {
            let next_key = self.push_leaf(new_leaf, old_leaf, lvl + 1, path_new, path_old)?;
            let node = if path_new[lvl] {
                Node::Internal { child_l: ZERO_HASH, child_r: next_key }
            } else {
                Node::Internal { child_l: next_key, child_r: ZERO_HASH }
            };
            return self.add_node(&node);
        }
        let old_key = old_leaf.key(&self.hasher);
        let new_key = self.add_node(new_leaf)?;
        let node = if path_new[lvl] {
            Node::Internal { child_l: old_key, child_r: new_key }
        } else {
            Node::Internal { child_l: new_key, child_r: old_key }
        };
        self.add_node(&node)
    }

    /// Rebuilds the trunk after a leaf removal.
    ///
    /// The removed leaf's sibling is lifted through every empty slot above
    /// it only when that sibling is itself a leaf. An internal sibling stays
    /// at its depth (moving it would shift every entry beneath it onto the
    /// wrong path prefix) and the deleted slot simply becomes empty.
    fn rm_and_upload(&mut self, path: &[bool], siblings: &[Hash]) -> Result<(), MerkleTreeError> {
        if siblings.is_empty() {
            return self.set_root(ZERO_HASH);
        }
        let leaf_lvl = siblings.len() - 1;
        let to_upload = siblings[leaf_lvl];

        if !matches!(self.get_node(&to_upload)?, Node::Leaf { .. }) {
            let node = if path[leaf_lvl] {
                Node::Internal { child_l: to_upload, child_r: ZERO_HASH }
            } else {
                Node::Internal { child_l: ZERO_HASH, child_r: to_upload }
            };
            self.add_node(&node)?;
            let new_root =
                self.recalculate_path_until_root(path, &node, &siblings[..leaf_lvl])?;
            return self.set_root(new_root);
        }

        if siblings.len() == 1 {
            return self.set_root(to_upload);
        }
        for lvl in (0..leaf_lvl).rev() {
            if !siblings[lvl].is_zero() {
                let node = if path[lvl] {
                    Node::Internal { child_l: siblings[lvl], child_r: to_upload }
                } else {
                    Node::Internal { child_l: to_upload, child_r: siblings[lvl] }
                };
                self.add_node(&node)?;
                let new_root =
                    self.recalculate_path_until_root(path, &node, &siblings[..lvl])?;
                return self.set_root(new_root);
            }
        }
        // every slot above the lifted leaf is empty: it becomes the root
        self.set_root(to_upload)
    }

    /// Walks a freshly built node at depth `siblings.len()` back to the
    /// root, pairing it with each sibling in reverse and persisting the
    /// chain of internal nodes as it goes.
    fn recalculate_path_until_root(
        &mut self,
        path: &[bool],
        node: &Node,
        siblings: &[Hash],
    ) -> Result<Hash, MerkleTreeError> {
        let mut key = node.key(&self.hasher);
        for lvl in (0..siblings.len()).rev() {
            let internal = if path[lvl] {
                Node::Internal { child_l: siblings[lvl], child_r: key }
            } else {
                Node::Internal { child_l: key, child_r: siblings[lvl] }
            };
            key = self.add_node(&internal)?;
        }
        Ok(key)
    }

    /// Shared read-only descent: terminal entry plus gathered siblings.
    fn walk_to_terminal(
        &self,
        k_hash: &Hash,
    ) -> Result<(Hash, Hash, Vec<Hash>), MerkleTreeError> {
        let path = k_hash.path(self.max_levels);
        let mut next_key = self.root;
        let mut siblings = Vec::new();
        for lvl in 0..self.max_levels {
            match self.get_node(&next_key)? {
                Node::Empty => return Ok((ZERO_HASH, ZERO_HASH, siblings)),
                Node::Leaf { k, v } => return Ok((k, v, siblings)),
                Node::Internal { child_l, child_r } => {
                    if path[lvl] {
                        next_key = child_r;
                        siblings.push(child_l);
                    } else {
                        next_key = child_l;
                        siblings.push(child_r);
                    }
                }
            }
        }
        Err(MerkleTreeError::ReachedMaxLevel)
    }
}
