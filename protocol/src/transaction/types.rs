//! Transaction envelope, identifiers and validation errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mint::MintTransaction;
use super::spend::SpendTransaction;
use crate::zkp::commitment::CoinCommitment;
use crate::zkp::nullifier::Nullifier;

/// 32-byte transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.to_hex()[..16])
    }
}

/// Reasons a transaction fails structural or cryptographic validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// Mints must create value.
    #[error("mint value must be greater than zero")]
    ZeroValue,

    /// `hashv` does not match `H(v)`.
    #[error("value digest does not match value")]
    ValueDigestMismatch,

    /// `(v, k, s)` does not open `cm`.
    #[error("published opening does not match commitment")]
    CommitmentMismatch,

    /// A scalar field carries a non-canonical encoding.
    #[error("field '{0}' is not a canonical scalar")]
    NonCanonicalField(&'static str),

    /// The one-time verifying key does not decode.
    #[error("invalid one-time signing key")]
    InvalidSigningKey,

    /// `hSig` is not the hash of the one-time verifying key.
    #[error("hSig does not match the one-time signing key")]
    HSigMismatch,

    /// The one-time signature is malformed or does not verify.
    #[error("invalid one-time signature")]
    InvalidSignature,

    /// The zero-knowledge proof is malformed or does not verify.
    #[error("invalid spend proof: {0}")]
    InvalidProof(String),
}

/// Any transaction that can appear in a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShieldedTransaction {
    /// New value entering the pool.
    Mint(MintTransaction),
    /// A coin being consumed into two new ones.
    Spend(SpendTransaction),
}

impl ShieldedTransaction {
    /// Transaction id.
    pub fn id(&self) -> TxId {
        match self {
            Self::Mint(tx) => tx.id(),
            Self::Spend(tx) => tx.id(),
        }
    }

    /// Commitments this transaction appends to the ledger, in order.
    pub fn new_commitments(&self) -> Vec<CoinCommitment> {
        match self {
            Self::Mint(tx) => vec![tx.cm],
            Self::Spend(tx) => tx.new_commitments().to_vec(),
        }
    }

    /// The nullifier revealed, if this is a spend.
    pub fn nullifier(&self) -> Option<Nullifier> {
        match self {
            Self::Mint(_) => None,
            Self::Spend(tx) => Some(tx.nullifier),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mint(_) => "mint",
            Self::Spend(_) => "spend",
        }
    }
}

impl From<MintTransaction> for ShieldedTransaction {
    fn from(tx: MintTransaction) -> Self {
        Self::Mint(tx)
    }
}

impl From<SpendTransaction> for ShieldedTransaction {
    fn from(tx: SpendTransaction) -> Self {
        Self::Spend(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use crate::zkp::commitment::commit;

    fn mint() -> MintTransaction {
        let s = Fr::from(3u64);
        let (k, cm) = commit(&Fr::from(1u64), 10, &Fr::from(2u64), &s);
        MintTransaction::new(cm, 10, &k, &s)
    }

    #[test]
    fn mint_envelope_exposes_one_commitment() {
        let m = mint();
        let tx = ShieldedTransaction::from(m.clone());
        assert_eq!(tx.new_commitments(), vec![m.cm]);
        assert_eq!(tx.nullifier(), None);
        assert_eq!(tx.id(), m.id());
        assert_eq!(tx.kind(), "mint");
    }

    #[test]
    fn envelope_json_names_the_kind() {
        let tx = ShieldedTransaction::from(mint());
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.starts_with(r#"{"mint":"#));
        let back: ShieldedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn tx_id_display_is_hex() {
        let id = TxId([0xAB; 32]);
        assert_eq!(id.to_string().len(), 64);
        assert!(format!("{:?}", id).starts_with("TxId(abab"));
    }
}
