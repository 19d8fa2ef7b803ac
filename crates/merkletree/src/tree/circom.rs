//! Fixed-width proof shapes for arithmetic-circuit verifiers.
//!
//! Circuits consume fixed-length signal arrays, so the compressed proofs of
//! [`super::proof`] are re-inflated and padded here, and mutations record
//! the pre-state the circuit replays.

use num_bigint::BigUint;

use super::MerkleTree;
use crate::error::MerkleTreeError;
use crate::hash::{FieldHasher, Hash, ZERO_HASH};
use crate::storage::Storage;

/// Operation selector of a processor proof.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessorFn {
    #[default]
    Noop = 0,
    Update = 1,
    Insert = 2,
    Delete = 3,
}

/// Operation selector of a verifier proof.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum VerifierFn {
    #[default]
    Membership = 0,
    NonMembership = 1,
}

/// Pads a sibling vector with `ZERO_HASH` to `levels + 1` entries; the extra
/// trailing slot is the terminator the circuit's level scanner expects.
pub fn circom_siblings_from_siblings(mut siblings: Vec<Hash>, levels: usize) -> Vec<Hash> {
    siblings.resize(levels + 1, ZERO_HASH);
    siblings
}

/// Read-only witness for a key, shaped for the in-circuit verifier.
///
/// `(old_key, old_value)` carry the auxiliary leaf of a non-membership
/// proof; `is_old_0` marks the empty-slot form where no such leaf exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircomVerifierProof {
    pub root: Hash,
    pub siblings: Vec<Hash>,
    pub old_key: Hash,
    pub old_value: Hash,
    pub is_old_0: bool,
    pub key: Hash,
    pub value: Hash,
    pub fnc: VerifierFn,
}

/// Before/after witness of a mutation, shaped for the in-circuit processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircomProcessorProof {
    pub old_root: Hash,
    pub new_root: Hash,
    pub old_key: Hash,
    pub old_value: Hash,
    pub new_key: Hash,
    pub new_value: Hash,
    pub siblings: Vec<Hash>,
    pub is_old_0: bool,
    pub fnc: ProcessorFn,
}

impl<S: Storage, H: FieldHasher> MerkleTree<S, H> {
    /// Builds a verifier-shaped proof for `k` against `root`, or against the
    /// current root when `None`.
    pub fn generate_circom_verifier_proof(
        &self,
        k: &BigUint,
        root: Option<&Hash>,
    ) -> Result<CircomVerifierProof, MerkleTreeError> {
        let root_key = root.copied().unwrap_or(*self.root());
        let (proof, value) = self.generate_proof(k, Some(&root_key))?;

        let (old_key, old_value) = match proof.node_aux() {
            Some(aux) => (aux.key, aux.value),
            None => (ZERO_HASH, ZERO_HASH),
        };
        Ok(CircomVerifierProof {
            root: root_key,
            siblings: circom_siblings_from_siblings(proof.all_siblings(), self.max_levels()),
            old_key,
            old_value,
            is_old_0: !proof.existence() && proof.node_aux().is_none(),
            key: Hash::from_biguint(k)?,
            value: Hash::from_biguint(&value)?,
            fnc: if proof.existence() {
                VerifierFn::Membership
            } else {
                VerifierFn::NonMembership
            },
        })
    }

    /// Inserts `(k, v)` and returns the processor witness for the mutation.
    ///
    /// The slot is looked up before the insert so the recorded siblings and
    /// `(old_key, old_value)` describe the pre-insert state the circuit
    /// replays; `new_root` is captured after the insert commits.
    pub fn add_and_get_circom_proof(
        &mut self,
        k: &BigUint,
        v: &BigUint,
    ) -> Result<CircomProcessorProof, MerkleTreeError> {
        let old_root = *self.root();
        let (old_k, old_v, siblings) = self.get(k)?;
        let old_key = Hash::from_biguint(&old_k)?;
        let old_value = Hash::from_biguint(&old_v)?;

        self.add(k, v)?;

        Ok(CircomProcessorProof {
            old_root,
            new_root: *self.root(),
            old_key,
            old_value,
            new_key: Hash::from_biguint(k)?,
            new_value: Hash::from_biguint(v)?,
            siblings: circom_siblings_from_siblings(siblings, self.max_levels()),
            is_old_0: old_key.is_zero(),
            fnc: ProcessorFn::Insert,
        })
    }
}
