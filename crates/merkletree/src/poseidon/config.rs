//! Poseidon configuration for BN254.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;

/// Number of full rounds (beginning + end).
const FULL_ROUNDS: usize = 8;

/// Number of partial rounds.
const PARTIAL_ROUNDS: usize = 57;

/// S-box exponent.
const ALPHA: u64 = 5;

/// Field elements absorbed per permutation.
const RATE: usize = 2;

const CAPACITY: usize = 1;

/// The standard Poseidon configuration for the BN254 scalar field.
///
/// Parameters:
/// - Rate: 2, capacity: 1
/// - Full rounds: 8 (4 at start, 4 at end)
/// - Partial rounds: 57
/// - Alpha: 5 (x^5 S-box)
///
/// Round constants and the MDS matrix are derived deterministically from the
/// field via the Grain LFSR, so every caller sees the same function.
pub fn poseidon_config() -> PoseidonConfig<Fr> {
    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        Fr::MODULUS_BIT_SIZE as u64,
        RATE,
        FULL_ROUNDS as u64,
        PARTIAL_ROUNDS as u64,
        0,
    );

    PoseidonConfig::new(FULL_ROUNDS, PARTIAL_ROUNDS, ALPHA, mds, ark, RATE, CAPACITY)
}
