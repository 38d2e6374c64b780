//! Nullifiers (serial numbers) for double-spend prevention.
//!
//! `sn = PRF_sn(a_sk, rho)`. Only the owner can compute it, it is the same
//! every time the same coin is spent, and it reveals nothing about which
//! commitment was consumed.

use std::fmt;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::crypto::hash::fr_to_bytes;
use crate::crypto::prf::serial_number;

/// The serial number revealed when a coin is spent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier([u8; 32]);

impl Nullifier {
    /// Derive the nullifier of the coin with seed `rho` owned by `spending_key`.
    pub fn derive(spending_key: &Fr, rho: &Fr) -> Self {
        Self::from_field(&serial_number(spending_key, rho))
    }

    /// Encode a field element.
    pub fn from_field(fe: &Fr) -> Self {
        Self(fr_to_bytes(fe))
    }

    /// Convert to a field element for circuit use.
    pub fn to_field(&self) -> Fr {
        use ark_ff::PrimeField;
        Fr::from_le_bytes_mod_order(&self.0)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sn({})", &self.to_hex()[..16])
    }
}
