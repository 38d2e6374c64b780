//! # Zero-Knowledge Spend Proofs
//!
//! Implements the shielded-coin proof system using Groth16 over BN254 with
//! Poseidon as the in-circuit hash.
//!
//! ## Architecture
//!
//! ```text
//! commitment.rs   coin commitments k = H(a_pk, rho), cm = H(v, k, s)
//! nullifier.rs    serial numbers sn = PRF_sn(a_sk, rho)
//! merkle.rs       fixed-depth Poseidon tree over the commitment ledger
//! gadgets.rs      R1CS twins of the native hashes
//! circuit.rs      SpendCircuit, SpendWitness, SpendPublicInputs
//! prover.rs       SpendProver trait, Groth16SpendProver, CircuitCheckProver
//! verifier.rs     SpendVerifier
//! ```
//!
//! ## Security Model
//!
//! - **Commitment hiding**: `s` and `rho` are uniform scalars.
//! - **Commitment binding**: collision resistance of Poseidon.
//! - **Unlinkability**: the spent coin is identified only by membership under
//!   the anchor, never by its commitment.
//! - **Soundness**: Groth16 knowledge soundness in the generic group model.
//! - **No inflation**: 64-bit range checks on every value, so `v = v1 + v2`
//!   cannot wrap the field.
//!
//! The setup is per circuit and per tree depth.

pub mod circuit;
pub mod commitment;
pub mod gadgets;
pub mod merkle;
pub mod nullifier;
pub mod prover;
pub mod verifier;

pub use circuit::{OutputOpening, SpendCircuit, SpendPublicInputs, SpendWitness};
pub use commitment::{CoinCommitment, CommitmentError};
pub use merkle::{MerkleError, MerklePath, MerkleTree};
pub use nullifier::Nullifier;
pub use prover::{CircuitCheckProver, Groth16SpendProver, SpendProof, SpendProver};
pub use verifier::SpendVerifier;
