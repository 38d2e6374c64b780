//! # Spend Proof Verification
//!
//! The validator side of the spend proof. Whether a consensus node actually
//! refuses blocks with bad proofs is policy outside this crate; the verifier
//! only answers "does this proof check against these public inputs".
//!
//! Groth16 verification is three pairings plus a small multi-scalar
//! multiplication, constant time regardless of tree depth.

use anyhow::{Context, Result};
use ark_bn254::Bn254;
use ark_groth16::{Groth16, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;

use super::circuit::SpendPublicInputs;
use super::prover::SpendProof;

/// Holds the Groth16 verification key for the spend circuit.
#[derive(Clone)]
pub struct SpendVerifier {
    vk: VerifyingKey<Bn254>,
}

impl SpendVerifier {
    pub(crate) fn from_vk(vk: VerifyingKey<Bn254>) -> Self {
        Self { vk }
    }

    /// Verify `proof` against `inputs`.
    ///
    /// `Ok(false)` means the proof is well formed but wrong; `Err` means it
    /// could not even be decoded.
    pub fn verify(&self, inputs: &SpendPublicInputs, proof: &SpendProof) -> Result<bool> {
        let ark_proof = proof.to_ark_proof().context("failed to deserialize proof")?;

        let valid = Groth16::<Bn254>::verify(&self.vk, &inputs.to_vec(), &ark_proof)
            .context("Groth16 verification algorithm failed")?;

        Ok(valid)
    }

    /// Serialize the verification key for distribution to validators.
    pub fn vk_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.vk
            .serialize_compressed(&mut buf)
            .context("verification key serialization failed")?;
        Ok(buf)
    }

    /// Load a verification key from bytes.
    pub fn vk_from_bytes(data: &[u8]) -> Result<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(data)
            .context("failed to deserialize verification key")?;
        Ok(Self { vk })
    }
}

impl std::fmt::Debug for SpendVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SpendVerifier(inputs={})", self.vk.gamma_abc_g1.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{hash_to_field, prf, PrfRole, SpendingKey};
    use crate::zkp::circuit::{OutputOpening, SpendWitness};
    use crate::zkp::commitment::{commit, commitment_from_inner, inner_commitment};
    use crate::zkp::merkle::MerkleTree;
    use crate::zkp::prover::{Groth16SpendProver, SpendProver};
    use ark_bn254::Fr;
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    const DEPTH: usize = 2;

    fn witness(rng: &mut StdRng) -> SpendWitness {
        let sk = SpendingKey::from_field(Fr::rand(rng));
        let a_pk = sk.public_address().to_field();
        let old_rho = Fr::rand(rng);
        let old_s = Fr::rand(rng);
        let (_, cm) = commit(&a_pk, 9, &old_rho, &old_s);
        let tree = MerkleTree::new(DEPTH, &[Fr::from(1u64), cm.to_field()]).unwrap();
        let new1 = OutputOpening {
            value: 9,
            k: inner_commitment(&Fr::rand(rng), &Fr::rand(rng)),
            s: Fr::rand(rng),
        };
        let new2 = OutputOpening {
            value: 0,
            k: inner_commitment(&a_pk, &Fr::rand(rng)),
            s: Fr::rand(rng),
        };
        let h_sig = hash_to_field(b"verifier test key");
        SpendWitness {
            public: SpendPublicInputs {
                anchor: tree.root(),
                nullifier: prf(PrfRole::SerialNumber, sk.as_field(), &old_rho),
                cm_new1: commitment_from_inner(9, &new1.k, &new1.s),
                cm_new2: commitment_from_inner(0, &new2.k, &new2.s),
                h_sig,
                h_: prf(PrfRole::PublicKey, sk.as_field(), &h_sig),
            },
            spending_key: *sk.as_field(),
            old_rho,
            old_value: 9,
            old_s,
            path: tree.path(1).unwrap(),
            new1,
            new2,
        }
    }

    #[test]
    fn end_to_end_spend_proof() {
        let mut rng = StdRng::seed_from_u64(42);
        let (prover, verifier) = Groth16SpendProver::setup(&mut rng, DEPTH).unwrap();
        let w = witness(&mut rng);

        let proof = prover.prove(&w).unwrap();
        assert!(verifier.verify(&w.public, &proof).unwrap());

        // Any change to the public inputs breaks the proof.
        let mut tampered = w.public;
        tampered.nullifier = Fr::from(7u64);
        assert!(!verifier.verify(&tampered, &proof).unwrap());

        let mut swapped = w.public;
        std::mem::swap(&mut swapped.cm_new1, &mut swapped.cm_new2);
        assert!(!verifier.verify(&swapped, &proof).unwrap());
    }

    #[test]
    fn garbage_proof_is_an_error() {
        let mut rng = StdRng::seed_from_u64(42);
        let (_prover, verifier) = Groth16SpendProver::setup(&mut rng, DEPTH).unwrap();
        let w = witness(&mut rng);
        assert!(verifier
            .verify(&w.public, &SpendProof::from_bytes(&[0u8; 5]))
            .is_err());
    }

    #[test]
    fn vk_serialization_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        let (prover, verifier) = Groth16SpendProver::setup(&mut rng, DEPTH).unwrap();
        let restored = SpendVerifier::vk_from_bytes(&verifier.vk_to_bytes().unwrap()).unwrap();

        let w = witness(&mut rng);
        let proof = prover.prove(&w).unwrap();
        assert!(restored.verify(&w.public, &proof).unwrap());
        assert_eq!(format!("{:?}", restored), "SpendVerifier(inputs=6)");
    }
}
