//! Mint transactions: value entering the shielded pool.
//!
//! A mint reveals the value and everything needed to check the commitment
//! against it, `(v, k, s)`, but not the owner or the seed `rho`, both of
//! which stay hidden inside `k`. There is no proof of funds: a mint is
//! accepted or rejected by the consensus layer on its own rules.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use super::types::{TransactionError, TxId};
use crate::crypto::hash::{blake3_hash_multi, fr_from_bytes, fr_to_bytes, value_digest};
use crate::zkp::commitment::{verify_commitment, CoinCommitment};

/// `{cm, v, hashv, k, s}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintTransaction {
    /// The new coin's commitment.
    pub cm: CoinCommitment,
    /// The minted value.
    pub value: u64,
    /// `H(v)`.
    pub hashed_value: [u8; 32],
    /// Inner commitment `H_inner(a_pk, rho)`, canonical scalar bytes.
    pub k: [u8; 32],
    /// Commitment randomness, canonical scalar bytes.
    pub s: [u8; 32],
}

impl MintTransaction {
    /// Assemble a mint from the coin's public opening.
    pub fn new(cm: CoinCommitment, value: u64, k: &Fr, s: &Fr) -> Self {
        Self {
            cm,
            value,
            hashed_value: value_digest(value),
            k: fr_to_bytes(k),
            s: fr_to_bytes(s),
        }
    }

    /// Transaction id: BLAKE3 over every field.
    pub fn id(&self) -> TxId {
        TxId(blake3_hash_multi(&[
            b"mint",
            self.cm.as_bytes(),
            &self.value.to_le_bytes(),
            &self.hashed_value,
            &self.k,
            &self.s,
        ]))
    }

    /// Check the value digest and that `(v, k, s)` opens `cm`.
    pub fn verify(&self) -> Result<(), TransactionError> {
        if self.value == 0 {
            return Err(TransactionError::ZeroValue);
        }
        if self.hashed_value != value_digest(self.value) {
            return Err(TransactionError::ValueDigestMismatch);
        }
        let k = fr_from_bytes(&self.k).ok_or(TransactionError::NonCanonicalField("k"))?;
        let s = fr_from_bytes(&self.s).ok_or(TransactionError::NonCanonicalField("s"))?;
        if !verify_commitment(&self.cm, self.value, &k, &s) {
            return Err(TransactionError::CommitmentMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zkp::commitment::commit;

    fn sample(value: u64) -> MintTransaction {
        let owner = Fr::from(5u64);
        let rho = Fr::from(6u64);
        let s = Fr::from(7u64);
        let (k, cm) = commit(&owner, value, &rho, &s);
        MintTransaction::new(cm, value, &k, &s)
    }

    #[test]
    fn honest_mint_verifies() {
        assert!(sample(100).verify().is_ok());
    }

    #[test]
    fn inflated_value_is_rejected() {
        let mut tx = sample(100);
        tx.value = 1_000;
        tx.hashed_value = value_digest(1_000);
        assert_eq!(tx.verify(), Err(TransactionError::CommitmentMismatch));
    }

    #[test]
    fn stale_digest_is_rejected() {
        let mut tx = sample(100);
        tx.hashed_value = value_digest(99);
        assert_eq!(tx.verify(), Err(TransactionError::ValueDigestMismatch));
    }

    #[test]
    fn non_canonical_scalar_is_rejected() {
        let mut tx = sample(100);
        tx.s = [0xFF; 32];
        assert_eq!(tx.verify(), Err(TransactionError::NonCanonicalField("s")));
    }

    #[test]
    fn id_changes_with_content() {
        let a = sample(100);
        let b = sample(101);
        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), b.id());
    }
}
