//! # Coin Commitments
//!
//! A coin `(a_pk, v, rho, s)` is committed to in two layers:
//!
//! ```text
//! k  = H_inner(a_pk, rho)     inner commitment, hides owner and seed
//! cm = H_commit(v, k, s)      coin commitment, what goes on the ledger
//! ```
//!
//! Both are domain-tagged Poseidon hashes, so the spend circuit recomputes
//! them in a few hundred constraints each. A mint publishes `(v, k, s)`: any
//! validator can check that `cm` really commits to `v` without learning who
//! owns the coin or what its nullifier will be.
//!
//! Hiding comes from `s` (and `rho`) being uniformly random scalars; binding
//! reduces to collision resistance of Poseidon.

use std::fmt;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::{fr_from_bytes, fr_to_bytes};
use crate::crypto::poseidon::{hash_with_domain, HashDomain};

/// Errors from decoding or checking a commitment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitmentError {
    /// The bytes do not encode a canonical field element.
    #[error("commitment bytes are not a canonical field element")]
    NonCanonical,

    /// The opening does not hash to the claimed commitment.
    #[error("opening does not match commitment {0}")]
    Mismatch(CoinCommitment),
}

/// A coin commitment as it appears on the ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoinCommitment([u8; 32]);

impl CoinCommitment {
    /// Encode a field element.
    pub fn from_field(fe: &Fr) -> Self {
        Self(fr_to_bytes(fe))
    }

    /// Decode raw bytes, rejecting non-canonical encodings.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CommitmentError> {
        fr_from_bytes(&bytes)
            .map(|_| Self(bytes))
            .ok_or(CommitmentError::NonCanonical)
    }

    /// The commitment as a field element (a Merkle leaf).
    pub fn to_field(&self) -> Fr {
        use ark_ff::PrimeField;
        Fr::from_le_bytes_mod_order(&self.0)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CoinCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for CoinCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cm({})", &self.to_hex()[..16])
    }
}

/// `k = H_inner(a_pk, rho)`.
pub fn inner_commitment(owner: &Fr, rho: &Fr) -> Fr {
    hash_with_domain(HashDomain::InnerCommitment, &[*owner, *rho])
}

/// `cm = H_commit(v, k, s)`, as a field element.
pub fn commitment_from_inner(value: u64, k: &Fr, s: &Fr) -> Fr {
    hash_with_domain(HashDomain::Commitment, &[Fr::from(value), *k, *s])
}

/// Commit to a full coin opening. Returns `(k, cm)`.
pub fn commit(owner: &Fr, value: u64, rho: &Fr, s: &Fr) -> (Fr, CoinCommitment) {
    let k = inner_commitment(owner, rho);
    let cm = commitment_from_inner(value, &k, s);
    (k, CoinCommitment::from_field(&cm))
}

/// Check a published `(v, k, s)` against a commitment.
pub fn verify_commitment(cm: &CoinCommitment, value: u64, k: &Fr, s: &Fr) -> bool {
    CoinCommitment::from_field(&commitment_from_inner(value, k, s)) == *cm
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn commitment_open_verify() {
        let mut rng = StdRng::seed_from_u64(42);
        let owner = Fr::rand(&mut rng);
        let rho = Fr::rand(&mut rng);
        let s = Fr::rand(&mut rng);

        let (k, cm) = commit(&owner, 42, &rho, &s);
        assert!(verify_commitment(&cm, 42, &k, &s), "valid opening must verify");
        assert!(!verify_commitment(&cm, 43, &k, &s), "wrong value must fail");
        assert!(
            !verify_commitment(&cm, 42, &k, &Fr::rand(&mut rng)),
            "wrong randomness must fail"
        );
    }

    #[test]
    fn commitment_binds_owner_and_seed() {
        let mut rng = StdRng::seed_from_u64(7);
        let owner = Fr::rand(&mut rng);
        let rho = Fr::rand(&mut rng);
        let s = Fr::rand(&mut rng);
        let (_, base) = commit(&owner, 10, &rho, &s);

        let (_, other_owner) = commit(&Fr::rand(&mut rng), 10, &rho, &s);
        let (_, other_rho) = commit(&owner, 10, &Fr::rand(&mut rng), &s);
        assert_ne!(base, other_owner);
        assert_ne!(base, other_rho);
    }

    #[test]
    fn same_opening_same_commitment() {
        let owner = Fr::from(1u64);
        let rho = Fr::from(2u64);
        let s = Fr::from(3u64);
        assert_eq!(commit(&owner, 5, &rho, &s), commit(&owner, 5, &rho, &s));
    }

    #[test]
    fn commitment_bytes_validation() {
        let cm = commit(&Fr::from(1u64), 1, &Fr::from(2u64), &Fr::from(3u64)).1;
        assert_eq!(CoinCommitment::from_bytes(*cm.as_bytes()), Ok(cm));
        assert_eq!(
            CoinCommitment::from_bytes([0xFF; 32]),
            Err(CommitmentError::NonCanonical)
        );
        assert_eq!(CoinCommitment::from_field(&cm.to_field()), cm);
    }
}
