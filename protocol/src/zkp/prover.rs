//! # Spend Proof Generation
//!
//! Wallets produce spend proofs through the [`SpendProver`] trait so the
//! client never depends on a particular proving system. Two implementations
//! ship with the crate:
//!
//! - [`Groth16SpendProver`]: the real thing. `setup(rng, depth)` runs a
//!   circuit-specific Groth16 setup over BN254 and returns the prover together
//!   with its [`SpendVerifier`]. In production the keys come from an MPC
//!   ceremony instead.
//!
//! - [`CircuitCheckProver`]: synthesizes the circuit and checks the witness
//!   without producing a SNARK. Setup for a depth-20 tree takes a while, so
//!   devnets and most tests use this one. Its "proof" is a digest of the
//!   public inputs and does not verify.
//!
//! Both reject an unsatisfiable witness with an error before any expensive
//! work is done. ark-groth16 0.4 panics rather than erroring on such
//! witnesses, so the check is not optional.

use std::fmt;

use anyhow::{anyhow, bail, Context, Result};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use super::circuit::{SpendCircuit, SpendWitness};
use super::verifier::SpendVerifier;
use crate::crypto::hash::{blake3_hash_multi, fr_to_bytes};

// ---------------------------------------------------------------------------
// SpendProver
// ---------------------------------------------------------------------------

/// Anything that can turn a spend witness into a proof.
///
/// Implementations must be callable from a blocking worker thread, hence
/// `Send + Sync`.
pub trait SpendProver: Send + Sync {
    /// Produce a proof, or fail if the witness does not satisfy the circuit.
    fn prove(&self, witness: &SpendWitness) -> Result<SpendProof>;

    /// Merkle tree depth the prover was set up for.
    fn tree_depth(&self) -> usize;
}

/// Synthesize the circuit for `witness` and check every constraint.
pub fn check_witness(depth: usize, witness: &SpendWitness) -> Result<()> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    SpendCircuit::new(depth, witness.clone())
        .generate_constraints(cs.clone())
        .map_err(|e| anyhow!("spend circuit synthesis failed: {e}"))?;

    let satisfied = cs
        .is_satisfied()
        .map_err(|e| anyhow!("constraint check failed: {e}"))?;
    if !satisfied {
        let failing = cs.which_is_unsatisfied().ok().flatten();
        bail!(
            "witness does not satisfy the spend circuit (first failing constraint: {})",
            failing.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Groth16SpendProver
// ---------------------------------------------------------------------------

/// Holds the Groth16 proving key for the spend circuit at a fixed depth.
pub struct Groth16SpendProver {
    pk: ProvingKey<Bn254>,
    depth: usize,
}

impl Groth16SpendProver {
    /// Run the circuit-specific setup. Returns the prover and the matching
    /// verifier; the verifier goes to validators, the prover stays with the
    /// wallet.
    pub fn setup<R: Rng + CryptoRng>(rng: &mut R, depth: usize) -> Result<(Self, SpendVerifier)> {
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(SpendCircuit::blank(depth), rng)
            .context("Groth16 setup failed for the spend circuit")?;

        Ok((Self { pk, depth }, SpendVerifier::from_vk(vk)))
    }
}

impl SpendProver for Groth16SpendProver {
    fn prove(&self, witness: &SpendWitness) -> Result<SpendProof> {
        check_witness(self.depth, witness)?;

        let circuit = SpendCircuit::new(self.depth, witness.clone());
        let mut rng = ark_std::rand::thread_rng();

        let proof = Groth16::<Bn254>::prove(&self.pk, circuit, &mut rng)
            .context("Groth16 proof generation failed")?;

        let mut bytes = Vec::new();
        proof
            .serialize_compressed(&mut bytes)
            .context("proof serialization failed")?;

        Ok(SpendProof { bytes })
    }

    fn tree_depth(&self) -> usize {
        self.depth
    }
}

// ---------------------------------------------------------------------------
// CircuitCheckProver
// ---------------------------------------------------------------------------

/// Checks witnesses against the circuit and emits a public-input digest in
/// place of a SNARK.
#[derive(Debug, Clone, Copy)]
pub struct CircuitCheckProver {
    depth: usize,
}

impl CircuitCheckProver {
    /// A checker for trees of the given depth.
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }
}

impl SpendProver for CircuitCheckProver {
    fn prove(&self, witness: &SpendWitness) -> Result<SpendProof> {
        check_witness(self.depth, witness)?;

        let encoded: Vec<[u8; 32]> = witness.public.to_vec().iter().map(fr_to_bytes).collect();
        let parts: Vec<&[u8]> = encoded.iter().map(|b| b.as_slice()).collect();
        Ok(SpendProof {
            bytes: blake3_hash_multi(&parts).to_vec(),
        })
    }

    fn tree_depth(&self) -> usize {
        self.depth
    }
}

// ---------------------------------------------------------------------------
// SpendProof
// ---------------------------------------------------------------------------

/// An opaque serialized proof attached to a spend transaction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendProof {
    bytes: Vec<u8>,
}

impl SpendProof {
    /// Wrap raw proof bytes received from the network.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            bytes: data.to_vec(),
        }
    }

    /// Raw proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the proof in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Decode as a Groth16 proof (used by the verifier).
    pub(crate) fn to_ark_proof(&self) -> Result<ark_groth16::Proof<Bn254>> {
        ark_groth16::Proof::<Bn254>::deserialize_compressed(&self.bytes[..])
            .map_err(|e| anyhow!("proof deserialization failed: {}", e))
    }
}

impl fmt::Debug for SpendProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpendProof({} bytes)", self.bytes.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{hash_to_field, prf, PrfRole, SpendingKey};
    use crate::zkp::circuit::{OutputOpening, SpendPublicInputs};
    use crate::zkp::commitment::{commit, commitment_from_inner, inner_commitment};
    use crate::zkp::merkle::MerkleTree;
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    const DEPTH: usize = 3;

    fn witness(rng: &mut StdRng) -> SpendWitness {
        let sk = SpendingKey::from_field(Fr::rand(rng));
        let a_pk = sk.public_address().to_field();
        let old_rho = Fr::rand(rng);
        let old_s = Fr::rand(rng);
        let (_, cm) = commit(&a_pk, 50, &old_rho, &old_s);
        let tree = MerkleTree::new(DEPTH, &[cm.to_field()]).unwrap();

        let new1 = OutputOpening {
            value: 20,
            k: inner_commitment(&Fr::rand(rng), &Fr::rand(rng)),
            s: Fr::rand(rng),
        };
        let new2 = OutputOpening {
            value: 30,
            k: inner_commitment(&a_pk, &Fr::rand(rng)),
            s: Fr::rand(rng),
        };
        let h_sig = hash_to_field(b"pk");

        SpendWitness {
            public: SpendPublicInputs {
                anchor: tree.root(),
                nullifier: prf(PrfRole::SerialNumber, sk.as_field(), &old_rho),
                cm_new1: commitment_from_inner(20, &new1.k, &new1.s),
                cm_new2: commitment_from_inner(30, &new2.k, &new2.s),
                h_sig,
                h_: prf(PrfRole::PublicKey, sk.as_field(), &h_sig),
            },
            spending_key: *sk.as_field(),
            old_rho,
            old_value: 50,
            old_s,
            path: tree.path(0).unwrap(),
            new1,
            new2,
        }
    }

    #[test]
    fn check_prover_accepts_valid_witness() {
        let mut rng = StdRng::seed_from_u64(1);
        let prover = CircuitCheckProver::new(DEPTH);
        let proof = prover.prove(&witness(&mut rng)).unwrap();
        assert_eq!(proof.size(), 32);
    }

    #[test]
    fn check_prover_rejects_invalid_witness() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut w = witness(&mut rng);
        w.old_value = 51;
        let err = CircuitCheckProver::new(DEPTH).prove(&w).unwrap_err();
        assert!(err.to_string().contains("does not satisfy"));
    }

    #[test]
    fn groth16_prove_valid_witness() {
        let mut rng = StdRng::seed_from_u64(42);
        let (prover, _verifier) = Groth16SpendProver::setup(&mut rng, DEPTH).unwrap();
        assert_eq!(prover.tree_depth(), DEPTH);

        let proof = prover.prove(&witness(&mut rng)).unwrap();
        // Compressed Groth16 proofs on BN254 are 128 bytes.
        assert!(proof.size() > 100 && proof.size() < 400);
        assert!(proof.to_ark_proof().is_ok());
    }

    #[test]
    fn groth16_rejects_invalid_witness_without_panicking() {
        let mut rng = StdRng::seed_from_u64(42);
        let (prover, _verifier) = Groth16SpendProver::setup(&mut rng, DEPTH).unwrap();
        let mut w = witness(&mut rng);
        w.public.h_ = Fr::from(0u64);
        assert!(prover.prove(&w).is_err());
    }

    #[test]
    fn proof_serde_round_trip() {
        let proof = SpendProof::from_bytes(&[1, 2, 3]);
        let encoded = bincode::serialize(&proof).unwrap();
        let decoded: SpendProof = bincode::deserialize(&encoded).unwrap();
        assert_eq!(proof, decoded);
        assert_eq!(format!("{:?}", decoded), "SpendProof(3 bytes)");
    }
}
