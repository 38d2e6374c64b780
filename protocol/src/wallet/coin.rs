//! # Coins
//!
//! A [`Coin`] is the full opening of one ledger commitment: owner address,
//! value, seed `rho` and randomness `s`, plus everything derived from them.
//! The derived fields are computed once at construction and a coin handed
//! in from outside must recompute to the commitment it claims, so a `Coin`
//! value is always self-consistent.
//!
//! [`CoinOpening`] is the serializable form a payer hands to a payee out of
//! band after a spend.

use std::fmt;

use ark_bn254::Fr;
use ark_ff::UniformRand;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::{fr_from_bytes, fr_to_bytes, value_digest};
use crate::crypto::keys::{PublicAddress, SpendingKey};
use crate::zkp::circuit::OutputOpening;
use crate::zkp::commitment::{commit, CoinCommitment};
use crate::zkp::nullifier::Nullifier;

/// Errors from building a coin out of an untrusted opening.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoinError {
    /// The opening recomputes to a different commitment.
    #[error("opening does not match commitment {claimed}")]
    CommitmentMismatch {
        /// Commitment the opening was delivered with.
        claimed: CoinCommitment,
    },

    /// A scalar is not canonically encoded.
    #[error("field '{0}' is not a canonical scalar")]
    NonCanonical(&'static str),
}

/// A fully opened shielded coin.
#[derive(Clone, PartialEq, Eq)]
pub struct Coin {
    owner: PublicAddress,
    value: u64,
    rho: Fr,
    s: Fr,
    k: Fr,
    cm: CoinCommitment,
    hashed_value: [u8; 32],
}

impl Coin {
    /// Build a coin from its opening.
    pub fn new(owner: PublicAddress, value: u64, rho: Fr, s: Fr) -> Self {
        let (k, cm) = commit(&owner.to_field(), value, &rho, &s);
        Self {
            owner,
            value,
            rho,
            s,
            k,
            cm,
            hashed_value: value_digest(value),
        }
    }

    /// A coin with fresh random seed and randomness.
    pub fn random(owner: PublicAddress, value: u64) -> Self {
        let mut rng = OsRng;
        Self::new(owner, value, Fr::rand(&mut rng), Fr::rand(&mut rng))
    }

    /// Build a coin from an opening and check it against `claimed`.
    pub fn from_opening(
        owner: PublicAddress,
        value: u64,
        rho: Fr,
        s: Fr,
        claimed: CoinCommitment,
    ) -> Result<Self, CoinError> {
        let coin = Self::new(owner, value, rho, s);
        if coin.cm != claimed {
            return Err(CoinError::CommitmentMismatch { claimed });
        }
        Ok(coin)
    }

    /// Owner address.
    pub fn owner(&self) -> PublicAddress {
        self.owner
    }

    /// Value.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Seed.
    pub fn rho(&self) -> &Fr {
        &self.rho
    }

    /// Commitment randomness.
    pub fn s(&self) -> &Fr {
        &self.s
    }

    /// Inner commitment `H_inner(a_pk, rho)`.
    pub fn k(&self) -> &Fr {
        &self.k
    }

    /// Ledger commitment.
    pub fn cm(&self) -> CoinCommitment {
        self.cm
    }

    /// `SHA-256(v)`, as published in mints.
    pub fn hashed_value(&self) -> &[u8; 32] {
        &self.hashed_value
    }

    /// Nullifier this coin reveals when spent with `key`.
    pub fn nullifier(&self, key: &SpendingKey) -> Nullifier {
        Nullifier::derive(key.as_field(), &self.rho)
    }

    /// The part of the opening the spend circuit sees for an output.
    pub fn output_opening(&self) -> OutputOpening {
        OutputOpening {
            value: self.value,
            k: self.k,
            s: self.s,
        }
    }

    /// Serializable opening.
    pub fn to_opening(&self) -> CoinOpening {
        CoinOpening {
            owner: self.owner,
            value: self.value,
            rho: fr_to_bytes(&self.rho),
            s: fr_to_bytes(&self.s),
            cm: self.cm,
        }
    }
}

impl fmt::Debug for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coin")
            .field("value", &self.value)
            .field("cm", &self.cm)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Wire form of a coin opening.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinOpening {
    /// Owner address.
    pub owner: PublicAddress,
    /// Value.
    pub value: u64,
    /// Seed, canonical little-endian.
    pub rho: [u8; 32],
    /// Randomness, canonical little-endian.
    pub s: [u8; 32],
    /// The commitment the opening claims to open.
    pub cm: CoinCommitment,
}

impl CoinOpening {
    /// Decode and validate.
    pub fn into_coin(self) -> Result<Coin, CoinError> {
        let rho = fr_from_bytes(&self.rho).ok_or(CoinError::NonCanonical("rho"))?;
        let s = fr_from_bytes(&self.s).ok_or(CoinError::NonCanonical("s"))?;
        Coin::from_opening(self.owner, self.value, rho, s, self.cm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zkp::commitment::verify_commitment;

    fn owner() -> (SpendingKey, PublicAddress) {
        let key = SpendingKey::from_field(Fr::from(77u64));
        let addr = key.public_address();
        (key, addr)
    }

    #[test]
    fn stored_commitment_recomputes() {
        let (_, addr) = owner();
        let coin = Coin::random(addr, 100);
        let (_, cm) = commit(&addr.to_field(), coin.value(), coin.rho(), coin.s());
        assert_eq!(cm, coin.cm());
        assert!(verify_commitment(&coin.cm(), 100, coin.k(), coin.s()));
        assert_eq!(coin.hashed_value(), &value_digest(100));
    }

    #[test]
    fn nullifier_is_stable_and_distinct() {
        let (key, addr) = owner();
        let a = Coin::random(addr, 10);
        let b = Coin::random(addr, 10);
        assert_eq!(a.nullifier(&key), a.nullifier(&key));
        assert_ne!(a.nullifier(&key), b.nullifier(&key));
    }

    #[test]
    fn opening_round_trips_through_json() {
        let (_, addr) = owner();
        let coin = Coin::random(addr, 5);
        let json = serde_json::to_string(&coin.to_opening()).unwrap();
        let back: CoinOpening = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_coin().unwrap(), coin);
    }

    #[test]
    fn tampered_opening_is_rejected() {
        let (_, addr) = owner();
        let coin = Coin::random(addr, 5);
        let mut opening = coin.to_opening();
        opening.value = 6;
        assert_eq!(
            opening.into_coin(),
            Err(CoinError::CommitmentMismatch { claimed: coin.cm() })
        );

        let mut opening = coin.to_opening();
        opening.s = [0xFF; 32];
        assert_eq!(opening.into_coin(), Err(CoinError::NonCanonical("s")));
    }

    #[test]
    fn debug_hides_the_opening() {
        let (_, addr) = owner();
        let dbg = format!("{:?}", Coin::random(addr, 1));
        assert!(dbg.contains("value: 1"));
        assert!(!dbg.contains("rho"));
    }
}
