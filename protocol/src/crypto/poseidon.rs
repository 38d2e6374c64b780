//! # Poseidon Hashing
//!
//! Every value that the spend circuit recomputes (addresses, commitments,
//! nullifiers, Merkle nodes) is a Poseidon hash over the BN254 scalar field,
//! so the native computation here and the R1CS gadget in
//! [`crate::zkp::gadgets`] must agree bit for bit. Both read the same
//! [`poseidon_config`].
//!
//! Parameters: width 3 (rate 2, capacity 1), 8 full rounds, 57 partial
//! rounds, S-box x^5. Round constants are derived with domain-separated
//! BLAKE3 so they are reproducible without a parameter file; the MDS matrix
//! is a Cauchy matrix, which is always invertible.
//!
//! Each use of the hash is prefixed with a [`HashDomain`] tag so that, for
//! example, a Merkle node can never be confused with a coin commitment.

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use ark_ff::{Field, PrimeField};

use super::hash::domain_separated_hash;

/// Number of full S-box rounds.
pub const FULL_ROUNDS: usize = 8;
/// Number of partial S-box rounds.
pub const PARTIAL_ROUNDS: usize = 57;
/// S-box exponent.
pub const ALPHA: u64 = 5;
/// Field elements absorbed per permutation.
pub const RATE: usize = 2;
/// Hidden capacity elements.
pub const CAPACITY: usize = 1;

const ROUND_CONSTANT_CONTEXT: &str = "tessera 2026-01 poseidon round constants";

/// Domain tags mixed in as the first absorbed element of every hash.
///
/// The values start at 16 so they can never collide with a
/// [`PrfRole`](super::prf::PrfRole) tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum HashDomain {
    /// `k = H(a_pk, rho)`.
    InnerCommitment = 16,
    /// `cm = H(v, k, s)`.
    Commitment = 17,
    /// `H(left, right)` for ledger tree nodes.
    MerkleNode = 18,
}

impl HashDomain {
    /// The tag as a field element.
    pub fn tag(self) -> Fr {
        Fr::from(self as u64)
    }
}

/// The process-wide Poseidon configuration.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    CONFIG.get_or_init(build_config)
}

fn build_config() -> PoseidonConfig<Fr> {
    let width = RATE + CAPACITY;

    let ark = (0..FULL_ROUNDS + PARTIAL_ROUNDS)
        .map(|round| {
            (0..width)
                .map(|i| {
                    let mut seed = [0u8; 16];
                    seed[..8].copy_from_slice(&(round as u64).to_le_bytes());
                    seed[8..].copy_from_slice(&(i as u64).to_le_bytes());
                    Fr::from_le_bytes_mod_order(&domain_separated_hash(
                        ROUND_CONSTANT_CONTEXT,
                        &seed,
                    ))
                })
                .collect()
        })
        .collect();

    // Cauchy matrix M[i][j] = 1 / (x_i + y_j) with x_i = i, y_j = width + j.
    // Every x_i + y_j lies in [width, 3 * width), so none is zero.
    let mds = (0..width)
        .map(|i| {
            (0..width)
                .map(|j| {
                    let sum = Fr::from(i as u64) + Fr::from((width + j) as u64);
                    sum.inverse().unwrap_or(Fr::from(1u64))
                })
                .collect()
        })
        .collect();

    PoseidonConfig {
        full_rounds: FULL_ROUNDS,
        partial_rounds: PARTIAL_ROUNDS,
        alpha: ALPHA,
        ark,
        mds,
        rate: RATE,
        capacity: CAPACITY,
    }
}

/// Hash a sequence of field elements with a fresh sponge.
pub fn poseidon_hash(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(poseidon_config());
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// Hash `inputs` under a domain tag.
pub fn hash_with_domain(domain: HashDomain, inputs: &[Fr]) -> Fr {
    let mut tagged = Vec::with_capacity(inputs.len() + 1);
    tagged.push(domain.tag());
    tagged.extend_from_slice(inputs);
    poseidon_hash(&tagged)
}
