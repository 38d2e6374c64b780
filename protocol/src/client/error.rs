//! Errors surfaced by [`ShieldedClient`](super::ShieldedClient) operations.

use thiserror::Error;

use crate::crypto::keys::PublicAddress;
use crate::wallet::coin::CoinError;
use crate::wallet::store::StoreError;

/// Why a mint was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MintError {
    /// Mints must create value.
    #[error("mint value must be greater than zero")]
    ZeroValue,
}

/// Why a spend did not go out. In every case the wallet is left as it was.
#[derive(Debug, Error)]
pub enum SpendError {
    /// Nothing to pay.
    #[error("spend amount must be greater than zero")]
    ZeroAmount,

    /// Confirmed balance is below the amount.
    #[error("insufficient funds: balance {balance}, requested {amount}")]
    InsufficientFunds {
        /// Confirmed balance after reconciliation.
        balance: u64,
        /// Amount requested.
        amount: u64,
    },

    /// The balance suffices but no single coin does.
    #[error("no single confirmed coin covers {amount}")]
    NoSpendableCoin {
        /// Amount requested.
        amount: u64,
    },

    /// The selected coin's owner address has no bound spending key.
    #[error("no spending key bound to address {0}")]
    UnboundAddress(PublicAddress),

    /// The prover failed or the witness did not satisfy the circuit.
    #[error("proof generation failed: {0}")]
    ProofGenerationFailure(String),
}

impl From<StoreError> for SpendError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NoSpendableCoin { amount } => Self::NoSpendableCoin { amount },
        }
    }
}

/// Why an out-of-band coin was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiveError {
    /// The opening is malformed or does not match its commitment.
    #[error(transparent)]
    InvalidCoin(#[from] CoinError),

    /// The coin is addressed to someone else.
    #[error("no spending key bound to address {0}")]
    UnboundAddress(PublicAddress),

    /// The coin is already in the wallet.
    #[error("coin already held")]
    AlreadyHeld,
}
