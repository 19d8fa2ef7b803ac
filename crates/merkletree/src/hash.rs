//! Field-element node keys, path encoding and the injected hashing contract.

use core::fmt;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

use crate::error::MerkleTreeError;

/// Number of bytes in a node key.
pub const HASH_LEN: usize = 32;

/// The key of the empty subtree, doubling as the unset-sibling sentinel.
pub const ZERO_HASH: Hash = Hash([0u8; HASH_LEN]);

/// A 32-byte little-endian field element used as a content-addressed node
/// identifier.
///
/// Construction from untrusted bytes or big integers validates that the
/// encoding stays below the BN254 scalar field modulus, so every `Hash` in
/// circulation is a canonical field element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    /// Wraps a raw little-endian encoding, rejecting values outside the field.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Result<Self, MerkleTreeError> {
        let h = Hash(bytes);
        check_in_field(&h.to_biguint())?;
        Ok(h)
    }

    /// Encodes a field element.
    pub fn from_fr(e: &Fr) -> Self {
        let le = e.into_bigint().to_bytes_le();
        let mut bytes = [0u8; HASH_LEN];
        bytes[..le.len()].copy_from_slice(&le);
        Hash(bytes)
    }

    /// Encodes a big integer, rejecting values outside the field.
    pub fn from_biguint(v: &BigUint) -> Result<Self, MerkleTreeError> {
        check_in_field(v)?;
        let le = v.to_bytes_le();
        let mut bytes = [0u8; HASH_LEN];
        bytes[..le.len()].copy_from_slice(&le);
        Ok(Hash(bytes))
    }

    pub fn to_fr(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.0)
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_le(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == ZERO_HASH
    }

    /// The bit at position `i`, least-significant first.
    pub fn bit(&self, i: usize) -> bool {
        self.0[i / 8] >> (i % 8) & 1 == 1
    }

    /// The descent path selected by this key: bit `i` picks the right child
    /// at depth `i`. Two keys share a prefix of length `l` iff their low `l`
    /// bits are equal.
    pub fn path(&self, levels: usize) -> Vec<bool> {
        (0..levels).map(|i| self.bit(i)).collect()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter().rev() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// The BN254 scalar field modulus.
pub fn field_size() -> BigUint {
    BigUint::from_bytes_le(&Fr::MODULUS.to_bytes_le())
}

/// Rejects values outside `[0, field_size)`.
pub fn check_in_field(v: &BigUint) -> Result<(), MerkleTreeError> {
    if *v < field_size() {
        Ok(())
    } else {
        Err(MerkleTreeError::FieldOverflow)
    }
}

/// The two- and three-input field hash the tree is parameterized over.
///
/// Implementations must be deterministic. The same hasher must be used for
/// every read and write of a given tree; mixing hashers invalidates every
/// structural invariant. The tree only ever hashes field elements, never raw
/// bytes.
pub trait FieldHasher {
    fn hash(&self, inputs: &[Fr]) -> Fr;
}
