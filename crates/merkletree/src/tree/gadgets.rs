//! In-circuit verification of tree proofs.
//!
//! The gadgets consume the re-inflated sibling vector
//! ([`Proof::all_siblings`](super::Proof::all_siblings)) and take the path
//! bits from the key's in-circuit bit decomposition, so the circuit shape is
//! fixed by the proof depth. The padded `max_levels + 1` vectors of
//! [`super::circom`] remain the transport shape; strip trailing zero slots
//! down to the proof depth before allocation.

use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_ff::PrimeField;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

/// Hash a list of field variables with Poseidon in-circuit.
fn hash_var<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    inputs: &[FpVar<F>],
    config: &PoseidonConfig<F>,
) -> Result<FpVar<F>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, config);
    sponge.absorb(&inputs.to_vec())?;
    let out = sponge.squeeze_field_elements(1)?;
    Ok(out[0].clone())
}

/// Leaf key `H(k, v, 1)`; the constant third input keeps leaves
/// domain-separated from internal nodes.
pub fn leaf_key_var<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    key: &FpVar<F>,
    value: &FpVar<F>,
    config: &PoseidonConfig<F>,
) -> Result<FpVar<F>, SynthesisError> {
    hash_var(cs, &[key.clone(), value.clone(), FpVar::one()], config)
}

/// Walks from a terminal node key up to the root, pairing it with
/// `siblings` in the order selected by the low bits of `key`.
pub fn compute_root_var<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    terminal: &FpVar<F>,
    key: &FpVar<F>,
    siblings: &[FpVar<F>],
    config: &PoseidonConfig<F>,
) -> Result<FpVar<F>, SynthesisError> {
    let bits = key.to_bits_le()?;
    let mut current = terminal.clone();

    for lvl in (0..siblings.len()).rev() {
        // bit set: current node is the right child at this depth
        let left = bits[lvl].select(&siblings[lvl], &current)?;
        let right = bits[lvl].select(&current, &siblings[lvl])?;
        current = hash_var(cs.clone(), &[left, right], config)?;
    }

    Ok(current)
}

/// Constrains `(key, value)` to be present in the tree with `root`.
pub fn verify_membership_var<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    root: &FpVar<F>,
    key: &FpVar<F>,
    value: &FpVar<F>,
    siblings: &[FpVar<F>],
    config: &PoseidonConfig<F>,
) -> Result<(), SynthesisError> {
    let leaf = leaf_key_var(cs.clone(), key, value, config)?;
    let computed = compute_root_var(cs, &leaf, key, siblings, config)?;
    computed.enforce_equal(root)
}

/// Constrains `key` to be absent from the tree with `root`.
///
/// `(aux_key, aux_value)` is the leaf occupying the reached slot and
/// `is_old0` selects the empty-slot form, mirroring the auxiliary leaf
/// carried by native non-membership proofs. When the auxiliary leaf is
/// present it must hold a different key.
pub fn verify_non_membership_var<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    root: &FpVar<F>,
    key: &FpVar<F>,
    aux_key: &FpVar<F>,
    aux_value: &FpVar<F>,
    is_old0: &Boolean<F>,
    siblings: &[FpVar<F>],
    config: &PoseidonConfig<F>,
) -> Result<(), SynthesisError> {
    let same_key = aux_key.is_eq(key)?;
    same_key.conditional_enforce_equal(&Boolean::constant(false), &is_old0.not())?;

    let aux_leaf = leaf_key_var(cs.clone(), aux_key, aux_value, config)?;
    let zero = FpVar::zero();
    let terminal = is_old0.select(&zero, &aux_leaf)?;
    let computed = compute_root_var(cs, &terminal, key, siblings, config)?;
    computed.enforce_equal(root)
}

#[cfg(test)]
mod gadget_tests {
    use super::*;
    use crate::poseidon::poseidon_config;
    use crate::storage::MemoryStorage;
    use crate::tree::MerkleTree;
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;
    use num_bigint::BigUint;

    const MAX_LEVELS: usize = 40;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn test_tree() -> MerkleTree<MemoryStorage> {
        let mut tree = MerkleTree::new(MemoryStorage::new(), true, MAX_LEVELS).unwrap();
        tree.add(&big(1), &big(2)).unwrap();
        tree.add(&big(3), &big(4)).unwrap();
        tree.add(&big(8), &big(9)).unwrap();
        tree
    }

    fn alloc_siblings(
        cs: ConstraintSystemRef<Fr>,
        siblings: &[crate::hash::Hash],
    ) -> Vec<FpVar<Fr>> {
        siblings
            .iter()
            .map(|s| FpVar::new_witness(cs.clone(), || Ok(s.to_fr())).unwrap())
            .collect()
    }

    #[test]
    fn test_membership_satisfied() {
        let tree = test_tree();
        let (proof, _) = tree.generate_proof(&big(1), None).unwrap();
        assert!(proof.existence());

        let cs = ConstraintSystem::<Fr>::new_ref();
        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root().to_fr())).unwrap();
        let key_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64))).unwrap();
        let value_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(2u64))).unwrap();
        let sibling_vars = alloc_siblings(cs.clone(), &proof.all_siblings());

        verify_membership_var(
            cs.clone(),
            &root_var,
            &key_var,
            &value_var,
            &sibling_vars,
            &poseidon_config(),
        )
        .unwrap();

        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_membership_wrong_value_unsatisfied() {
        let tree = test_tree();
        let (proof, _) = tree.generate_proof(&big(1), None).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root().to_fr())).unwrap();
        let key_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64))).unwrap();
        // wrong value
        let value_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(99u64))).unwrap();
        let sibling_vars = alloc_siblings(cs.clone(), &proof.all_siblings());

        verify_membership_var(
            cs.clone(),
            &root_var,
            &key_var,
            &value_var,
            &sibling_vars,
            &poseidon_config(),
        )
        .unwrap();

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_non_membership_aux_leaf_satisfied() {
        let tree = test_tree();
        // key 5 shares path prefix with the leaf at key 1
        let (proof, _) = tree.generate_proof(&big(5), None).unwrap();
        assert!(!proof.existence());
        let aux = proof.node_aux().copied().unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root().to_fr())).unwrap();
        let key_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(5u64))).unwrap();
        let aux_key_var = FpVar::new_witness(cs.clone(), || Ok(aux.key.to_fr())).unwrap();
        let aux_value_var = FpVar::new_witness(cs.clone(), || Ok(aux.value.to_fr())).unwrap();
        let is_old0 = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        let sibling_vars = alloc_siblings(cs.clone(), &proof.all_siblings());

        verify_non_membership_var(
            cs.clone(),
            &root_var,
            &key_var,
            &aux_key_var,
            &aux_value_var,
            &is_old0,
            &sibling_vars,
            &poseidon_config(),
        )
        .unwrap();

        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_non_membership_empty_slot_satisfied() {
        let mut tree = MerkleTree::new(MemoryStorage::new(), true, MAX_LEVELS).unwrap();
        tree.add(&big(1), &big(2)).unwrap();
        tree.add(&big(3), &big(4)).unwrap();
        // path(2) leaves the occupied subtree at depth 1: empty terminal
        let (proof, _) = tree.generate_proof(&big(2), None).unwrap();
        assert!(!proof.existence());
        assert!(proof.node_aux().is_none());

        let cs = ConstraintSystem::<Fr>::new_ref();
        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root().to_fr())).unwrap();
        let key_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(2u64))).unwrap();
        let aux_key_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(0u64))).unwrap();
        let aux_value_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(0u64))).unwrap();
        let is_old0 = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let sibling_vars = alloc_siblings(cs.clone(), &proof.all_siblings());

        verify_non_membership_var(
            cs.clone(),
            &root_var,
            &key_var,
            &aux_key_var,
            &aux_value_var,
            &is_old0,
            &sibling_vars,
            &poseidon_config(),
        )
        .unwrap();

        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_non_membership_same_key_unsatisfied() {
        let tree = test_tree();
        let (proof, _) = tree.generate_proof(&big(5), None).unwrap();
        let aux = proof.node_aux().copied().unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root().to_fr())).unwrap();
        // claim absence of the key the auxiliary leaf itself holds
        let key_var = FpVar::new_witness(cs.clone(), || Ok(aux.key.to_fr())).unwrap();
        let aux_key_var = FpVar::new_witness(cs.clone(), || Ok(aux.key.to_fr())).unwrap();
        let aux_value_var = FpVar::new_witness(cs.clone(), || Ok(aux.value.to_fr())).unwrap();
        let is_old0 = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        let sibling_vars = alloc_siblings(cs.clone(), &proof.all_siblings());

        verify_non_membership_var(
            cs.clone(),
            &root_var,
            &key_var,
            &aux_key_var,
            &aux_value_var,
            &is_old0,
            &sibling_vars,
            &poseidon_config(),
        )
        .unwrap();

        assert!(!cs.is_satisfied().unwrap());
    }
}
