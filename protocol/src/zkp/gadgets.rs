//! R1CS gadgets mirroring the native hashes in [`crate::crypto`].
//!
//! Each gadget here has a native twin, and the circuit tests check that both
//! produce the same value for the same inputs. If you change one, change the
//! other.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar, poseidon::constraints::PoseidonSpongeVar,
};
use ark_ff::Zero;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
    select::CondSelectGadget,
};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::config::VALUE_BITS;
use crate::crypto::poseidon::{poseidon_config, HashDomain};
use crate::crypto::prf::PrfRole;

/// Poseidon over field variables. Twin of [`crate::crypto::poseidon_hash`].
pub fn poseidon_var(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, poseidon_config());
    sponge.absorb(&inputs.to_vec())?;
    let mut out = sponge.squeeze_field_elements(1)?;
    Ok(out.remove(0))
}

/// Domain-tagged Poseidon. Twin of [`crate::crypto::hash_with_domain`].
pub fn hash_with_domain_var(
    cs: ConstraintSystemRef<Fr>,
    domain: HashDomain,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut tagged = Vec::with_capacity(inputs.len() + 1);
    tagged.push(FpVar::constant(domain.tag()));
    tagged.extend_from_slice(inputs);
    poseidon_var(cs, &tagged)
}

/// Role-tagged PRF. Twin of [`crate::crypto::prf`].
pub fn prf_var(
    cs: ConstraintSystemRef<Fr>,
    role: PrfRole,
    key: &FpVar<Fr>,
    input: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    poseidon_var(
        cs,
        &[FpVar::constant(role.tag()), key.clone(), input.clone()],
    )
}

/// `a_pk = PRF_addr(a_sk, 0)` in-circuit.
pub fn address_var(
    cs: ConstraintSystemRef<Fr>,
    spending_key: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    prf_var(
        cs,
        PrfRole::Address,
        spending_key,
        &FpVar::constant(Fr::zero()),
    )
}

/// Constrain `value` to `[0, 2^VALUE_BITS)`.
///
/// `native` is the witness value when proving and `None` during setup. Each
/// bit is allocated as a private boolean and the recomposition is enforced
/// equal to `value`. Since `2^VALUE_BITS` is far below the field modulus, the
/// decomposition is unique.
pub fn enforce_value_range(
    cs: ConstraintSystemRef<Fr>,
    value: &FpVar<Fr>,
    native: Option<u64>,
) -> Result<(), SynthesisError> {
    let mut reconstructed = FpVar::<Fr>::zero();
    let mut power_of_two = FpVar::<Fr>::one();
    let two = FpVar::<Fr>::constant(Fr::from(2u64));

    for i in 0..VALUE_BITS {
        let bit = Boolean::<Fr>::new_witness(ark_relations::ns!(cs, "value_bit"), || {
            native
                .map(|v| (v >> i) & 1 == 1)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        reconstructed += FpVar::<Fr>::from(bit) * &power_of_two;
        power_of_two *= &two;
    }

    reconstructed.enforce_equal(value)
}

/// Hash `leaf` up an authentication path and return the root.
///
/// `is_right[i]` set means the running node is the right child at height `i`.
pub fn merkle_root_var(
    cs: ConstraintSystemRef<Fr>,
    leaf: &FpVar<Fr>,
    siblings: &[FpVar<Fr>],
    is_right: &[Boolean<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut current = leaf.clone();
    for (sibling, bit) in siblings.iter().zip(is_right) {
        let left = FpVar::conditionally_select(bit, sibling, &current)?;
        let right = FpVar::conditionally_select(bit, &current, sibling)?;
        current = hash_with_domain_var(cs.clone(), HashDomain::MerkleNode, &[left, right])?;
    }
    Ok(current)
}
