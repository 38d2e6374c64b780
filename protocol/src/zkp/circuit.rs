//! # Spend R1CS Circuit
//!
//! The statement proved by every spend:
//!
//! ```text
//! "I know a_sk and an opening (rho, v, s) of some coin commitment cm_old,
//!  and openings (v1, k1, s1), (v2, k2, s2) of cm_new1 and cm_new2, such that:
//!     1. a_pk  = PRF_addr(a_sk, 0)
//!     2. cm_old = H_commit(v, H_inner(a_pk, rho), s)
//!     3. cm_old is a leaf of the ledger tree with root `anchor`
//!     4. nullifier = PRF_sn(a_sk, rho)
//!     5. h_ = PRF_pk(a_sk, hSig)
//!     6. cm_new1 = H_commit(v1, k1, s1), cm_new2 = H_commit(v2, k2, s2)
//!     7. v = v1 + v2, with v, v1, v2 each in [0, 2^64)"
//! ```
//!
//! Item 5 ties the proof to the one-time signature key whose hash is `hSig`:
//! a proof lifted from one transaction cannot be replayed with another key.
//! The range checks in item 7 stop a prover from paying out a "negative"
//! change coin that wraps around the field.
//!
//! ## Public inputs (in order)
//!
//! | index | value |
//! |-------|-------|
//! | 0     | anchor |
//! | 1     | nullifier |
//! | 2     | cm_new1 |
//! | 3     | cm_new2 |
//! | 4     | hSig |
//! | 5     | h_ |

use ark_bn254::Fr;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use super::gadgets::{
    address_var, enforce_value_range, hash_with_domain_var, merkle_root_var, prf_var,
};
use super::merkle::MerklePath;
use crate::crypto::poseidon::HashDomain;
use crate::crypto::prf::PrfRole;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The values a verifier sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendPublicInputs {
    /// Root of the ledger tree the consumed coin is proven against.
    pub anchor: Fr,
    /// Serial number of the consumed coin.
    pub nullifier: Fr,
    /// Commitment of the payment output.
    pub cm_new1: Fr,
    /// Commitment of the change output.
    pub cm_new2: Fr,
    /// Hash of the one-time signature verifying key.
    pub h_sig: Fr,
    /// `PRF_pk(a_sk, hSig)`.
    pub h_: Fr,
}

impl SpendPublicInputs {
    /// Field elements in the order the circuit allocates them.
    pub fn to_vec(&self) -> Vec<Fr> {
        vec![
            self.anchor,
            self.nullifier,
            self.cm_new1,
            self.cm_new2,
            self.h_sig,
            self.h_,
        ]
    }
}

/// Opening of a freshly created output coin as seen by the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOpening {
    /// Coin value.
    pub value: u64,
    /// Inner commitment `H_inner(a_pk, rho)`.
    pub k: Fr,
    /// Commitment randomness.
    pub s: Fr,
}

/// Everything the prover needs: the public inputs plus the private witness.
#[derive(Debug, Clone)]
pub struct SpendWitness {
    /// Public inputs.
    pub public: SpendPublicInputs,
    /// Spending key of the consumed coin's owner.
    pub spending_key: Fr,
    /// Seed of the consumed coin.
    pub old_rho: Fr,
    /// Value of the consumed coin.
    pub old_value: u64,
    /// Randomness of the consumed coin.
    pub old_s: Fr,
    /// Path from the consumed coin's commitment to `anchor`.
    pub path: MerklePath,
    /// Payment output.
    pub new1: OutputOpening,
    /// Change output.
    pub new2: OutputOpening,
}

// ---------------------------------------------------------------------------
// Circuit definition
// ---------------------------------------------------------------------------

/// Groth16 R1CS circuit for a single-input, two-output spend.
///
/// `witness` is `None` during key generation, where only the constraint
/// topology matters. The tree depth is fixed per circuit, so the proving key
/// only accepts paths of exactly `depth` levels.
#[derive(Debug, Clone)]
pub struct SpendCircuit {
    depth: usize,
    witness: Option<SpendWitness>,
}

impl SpendCircuit {
    /// A fully populated circuit for proof generation.
    pub fn new(depth: usize, witness: SpendWitness) -> Self {
        Self {
            depth,
            witness: Some(witness),
        }
    }

    /// A blank circuit for CRS generation.
    pub fn blank(depth: usize) -> Self {
        Self {
            depth,
            witness: None,
        }
    }

    /// Tree depth this circuit was built for.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

// ---------------------------------------------------------------------------
// Constraint synthesizer
// ---------------------------------------------------------------------------

impl ConstraintSynthesizer<Fr> for SpendCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let w = self.witness.as_ref();

        if let Some(w) = w {
            if w.path.depth() != self.depth || w.path.is_right.len() != self.depth {
                return Err(SynthesisError::Unsatisfiable);
            }
        }

        // Reads a field out of the witness, or reports it missing in setup mode.
        let get =
            |f: &dyn Fn(&SpendWitness) -> Fr| w.map(f).ok_or(SynthesisError::AssignmentMissing);

        // ===================================================================
        // 1. Public inputs
        // ===================================================================

        let anchor = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "anchor"), || {
            get(&|w| w.public.anchor)
        })?;
        let nullifier = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "nullifier"), || {
            get(&|w| w.public.nullifier)
        })?;
        let cm_new1 = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "cm_new1"), || {
            get(&|w| w.public.cm_new1)
        })?;
        let cm_new2 = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "cm_new2"), || {
            get(&|w| w.public.cm_new2)
        })?;
        let h_sig = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "h_sig"), || {
            get(&|w| w.public.h_sig)
        })?;
        let h_ = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "h_"), || get(&|w| w.public.h_))?;

        // ===================================================================
        // 2. Private witnesses
        // ===================================================================

        let a_sk = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "a_sk"), || {
            get(&|w| w.spending_key)
        })?;
        let old_rho =
            FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "old_rho"), || get(&|w| w.old_rho))?;
        let old_value = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "old_value"), || {
            get(&|w| Fr::from(w.old_value))
        })?;
        let old_s =
            FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "old_s"), || get(&|w| w.old_s))?;

        let mut siblings = Vec::with_capacity(self.depth);
        let mut is_right = Vec::with_capacity(self.depth);
        for level in 0..self.depth {
            siblings.push(FpVar::<Fr>::new_witness(
                ark_relations::ns!(cs, "path_sibling"),
                || get(&|w| w.path.siblings[level]),
            )?);
            is_right.push(Boolean::<Fr>::new_witness(
                ark_relations::ns!(cs, "path_bit"),
                || {
                    w.map(|w| w.path.is_right[level])
                        .ok_or(SynthesisError::AssignmentMissing)
                },
            )?);
        }

        let pickers: [fn(&SpendWitness) -> OutputOpening; 2] = [|w| w.new1, |w| w.new2];
        let mut outputs = Vec::with_capacity(2);
        for pick in pickers {
            let value = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "new_value"), || {
                get(&|w| Fr::from(pick(w).value))
            })?;
            let k = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "new_k"), || {
                get(&|w| pick(w).k)
            })?;
            let s = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "new_s"), || {
                get(&|w| pick(w).s)
            })?;
            outputs.push((value, k, s, w.map(|w| pick(w).value)));
        }

        // ===================================================================
        // 3. Ownership: a_pk = PRF_addr(a_sk, 0)
        // ===================================================================

        let a_pk = address_var(cs.clone(), &a_sk)?;

        // ===================================================================
        // 4. Old commitment and ledger membership
        // ===================================================================

        let old_k = hash_with_domain_var(
            cs.clone(),
            HashDomain::InnerCommitment,
            &[a_pk, old_rho.clone()],
        )?;
        let old_cm = hash_with_domain_var(
            cs.clone(),
            HashDomain::Commitment,
            &[old_value.clone(), old_k, old_s],
        )?;
        let root = merkle_root_var(cs.clone(), &old_cm, &siblings, &is_right)?;
        root.enforce_equal(&anchor)?;

        // ===================================================================
        // 5. Nullifier and signature binding
        // ===================================================================

        prf_var(cs.clone(), PrfRole::SerialNumber, &a_sk, &old_rho)?.enforce_equal(&nullifier)?;
        prf_var(cs.clone(), PrfRole::PublicKey, &a_sk, &h_sig)?.enforce_equal(&h_)?;

        // ===================================================================
        // 6. New commitments
        // ===================================================================

        let mut output_sum = FpVar::<Fr>::zero();
        for ((value, k, s, native), expected) in outputs.into_iter().zip([&cm_new1, &cm_new2]) {
            let cm = hash_with_domain_var(
                cs.clone(),
                HashDomain::Commitment,
                &[value.clone(), k, s],
            )?;
            cm.enforce_equal(expected)?;
            enforce_value_range(cs.clone(), &value, native)?;
            output_sum += &value;
        }

        // ===================================================================
        // 7. Value conservation
        // ===================================================================

        enforce_value_range(cs.clone(), &old_value, w.map(|w| w.old_value))?;
        output_sum.enforce_equal(&old_value)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{hash_to_field, prf, SpendingKey};
    use crate::zkp::commitment::{commit, commitment_from_inner, inner_commitment};
    use crate::zkp::merkle::MerkleTree;
    use ark_ff::UniformRand;
    use ark_relations::r1cs::ConstraintSystem;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    const DEPTH: usize = 4;

    /// Builds a satisfying witness for spending a coin of `old_value` into
    /// `pay` and `old_value - pay`, with the coin sitting at index 2 of a
    /// five-leaf ledger.
    fn valid_witness(old_value: u64, pay: u64) -> SpendWitness {
        let mut rng = StdRng::seed_from_u64(42);
        let sk = SpendingKey::from_field(Fr::rand(&mut rng));
        let a_pk = sk.public_address().to_field();

        let old_rho = Fr::rand(&mut rng);
        let old_s = Fr::rand(&mut rng);
        let (_, old_cm) = commit(&a_pk, old_value, &old_rho, &old_s);

        let mut leaves: Vec<Fr> = (0..5).map(|_| Fr::rand(&mut rng)).collect();
        leaves[2] = old_cm.to_field();
        let tree = MerkleTree::new(DEPTH, &leaves).unwrap();

        let receiver = Fr::rand(&mut rng);
        let new1 = OutputOpening {
            value: pay,
            k: inner_commitment(&receiver, &Fr::rand(&mut rng)),
            s: Fr::rand(&mut rng),
        };
        let new2 = OutputOpening {
            value: old_value - pay,
            k: inner_commitment(&a_pk, &Fr::rand(&mut rng)),
            s: Fr::rand(&mut rng),
        };

        let h_sig = hash_to_field(b"one-time verifying key");
        let public = SpendPublicInputs {
            anchor: tree.root(),
            nullifier: prf(PrfRole::SerialNumber, sk.as_field(), &old_rho),
            cm_new1: commitment_from_inner(new1.value, &new1.k, &new1.s),
            cm_new2: commitment_from_inner(new2.value, &new2.k, &new2.s),
            h_sig,
            h_: prf(PrfRole::PublicKey, sk.as_field(), &h_sig),
        };

        SpendWitness {
            public,
            spending_key: *sk.as_field(),
            old_rho,
            old_value,
            old_s,
            path: tree.path(2).unwrap(),
            new1,
            new2,
        }
    }

    fn is_satisfied(witness: SpendWitness) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        SpendCircuit::new(DEPTH, witness)
            .generate_constraints(cs.clone())
            .unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn circuit_satisfiable_valid_witness() {
        assert!(is_satisfied(valid_witness(100, 30)));
    }

    #[test]
    fn circuit_satisfiable_zero_change() {
        assert!(is_satisfied(valid_witness(100, 100)));
    }

    #[test]
    fn circuit_unsatisfied_wrong_spending_key() {
        let mut w = valid_witness(100, 30);
        w.spending_key += Fr::from(1u64);
        assert!(!is_satisfied(w));
    }

    #[test]
    fn circuit_unsatisfied_wrong_anchor() {
        let mut w = valid_witness(100, 30);
        w.public.anchor += Fr::from(1u64);
        assert!(!is_satisfied(w));
    }

    #[test]
    fn circuit_unsatisfied_tampered_path() {
        let mut w = valid_witness(100, 30);
        w.path.is_right[0] = !w.path.is_right[0];
        assert!(!is_satisfied(w));
    }

    #[test]
    fn circuit_unsatisfied_wrong_nullifier() {
        let mut w = valid_witness(100, 30);
        w.public.nullifier = Fr::from(12345u64);
        assert!(!is_satisfied(w));
    }

    #[test]
    fn circuit_unsatisfied_wrong_h() {
        let mut w = valid_witness(100, 30);
        w.public.h_sig = hash_to_field(b"a different key");
        assert!(!is_satisfied(w));
    }

    #[test]
    fn circuit_unsatisfied_value_inflation() {
        let mut w = valid_witness(100, 30);
        w.new2.value += 1;
        w.public.cm_new2 = commitment_from_inner(w.new2.value, &w.new2.k, &w.new2.s);
        assert!(!is_satisfied(w), "outputs may not exceed the input");
    }

    #[test]
    fn circuit_unsatisfied_output_commitment_mismatch() {
        let mut w = valid_witness(100, 30);
        w.new1.s += Fr::from(1u64);
        assert!(!is_satisfied(w));
    }

    #[test]
    fn short_path_is_rejected_at_synthesis() {
        let mut w = valid_witness(100, 30);
        w.path.siblings.pop();
        w.path.is_right.pop();
        let cs = ConstraintSystem::<Fr>::new_ref();
        let result = SpendCircuit::new(DEPTH, w).generate_constraints(cs);
        assert!(matches!(result, Err(SynthesisError::Unsatisfiable)));
    }

    #[test]
    fn public_inputs_match_allocation_order() {
        let w = valid_witness(100, 30);
        let cs = ConstraintSystem::<Fr>::new_ref();
        SpendCircuit::new(DEPTH, w.clone())
            .generate_constraints(cs.clone())
            .unwrap();

        // Instance assignment slot 0 is the constant one.
        let borrowed = cs.borrow().unwrap();
        assert_eq!(&borrowed.instance_assignment[1..], w.public.to_vec().as_slice());
    }

    #[test]
    fn blank_circuit_has_same_shape() {
        let cs_full = ConstraintSystem::<Fr>::new_ref();
        SpendCircuit::new(DEPTH, valid_witness(100, 30))
            .generate_constraints(cs_full.clone())
            .unwrap();

        let cs_blank = ConstraintSystem::<Fr>::new_ref();
        cs_blank.set_mode(ark_relations::r1cs::SynthesisMode::Setup);
        SpendCircuit::blank(DEPTH)
            .generate_constraints(cs_blank.clone())
            .unwrap();

        assert_eq!(cs_full.num_constraints(), cs_blank.num_constraints());
        assert_eq!(cs_full.num_instance_variables(), 7);
    }
}
