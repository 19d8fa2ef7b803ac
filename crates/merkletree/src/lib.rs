//! Sparse Merkle tree over the BN254 scalar field.
//!
//! Entries are `(key, value)` pairs of field elements, addressed by the
//! little-endian bit path of the key. Leaves hash as `H(k, v, 1)`, internal
//! nodes as `H(left, right)`, with Poseidon as the default combining
//! function. The tree produces membership and non-membership proofs, plus
//! the fixed-width shapes arithmetic-circuit verifiers consume.
//!
//! Nodes are immutable and content-addressed in an injected [`Storage`]
//! backend with a single mutable root cell; superseded nodes are never
//! collected, so any historical root a caller retains stays navigable.

pub mod error;
pub mod hash;
pub mod node;
pub mod poseidon;
pub mod storage;
pub mod tree;

pub use error::MerkleTreeError;
pub use hash::{FieldHasher, Hash, ZERO_HASH};
pub use node::Node;
pub use poseidon::{poseidon_config, PoseidonHasher};
pub use storage::{MemoryStorage, Storage};
pub use tree::{
    circom_siblings_from_siblings, CircomProcessorProof, CircomVerifierProof, MerkleTree,
    NodeAux, ProcessorFn, Proof, VerifierFn,
};

use ark_bn254::Fr;

/// Common field type for all operations
pub type ConstraintF = Fr;
