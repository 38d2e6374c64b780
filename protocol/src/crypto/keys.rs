//! # Shielded Keys
//!
//! A shielded address is a pair:
//!
//! ```text
//! a_sk  random BN254 scalar, never leaves the wallet
//! a_pk  PRF_addr(a_sk, 0), published and used as the coin owner
//! ```
//!
//! `a_pk` is what the circuit calls the hash of the owner's private key. It is
//! carried around as [`PublicAddress`], a canonical 32-byte encoding that also
//! renders as hex or Bech32 (`tsr1...`).
//!
//! Spends additionally use a one-time Ed25519 key pair (see
//! [`generate_one_time_signing_key`]) whose public half is bound into the proof
//! through `hSig`.

use std::fmt;

use ark_bn254::Fr;
use ark_ff::UniformRand;
use bech32::{Bech32, Hrp};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::{fr_from_bytes, fr_to_bytes};
use super::prf::address_of;
use crate::config::ADDRESS_HRP;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from parsing or decoding key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The hex string could not be decoded.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    /// The Bech32 string could not be decoded.
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    /// The decoded address has an unexpected human-readable prefix.
    #[error("invalid HRP: expected '{expected}', got '{got}'")]
    InvalidHrp {
        /// The expected HRP.
        expected: String,
        /// The HRP that was actually found.
        got: String,
    },

    /// The decoded data has an unexpected length.
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        got: usize,
    },

    /// The bytes do not encode a canonical field element.
    #[error("key bytes are not a canonical field element")]
    NonCanonical,
}

fn to_array(bytes: &[u8]) -> Result<[u8; 32], KeyError> {
    bytes.try_into().map_err(|_| KeyError::InvalidLength {
        expected: 32,
        got: bytes.len(),
    })
}

// ---------------------------------------------------------------------------
// SpendingKey
// ---------------------------------------------------------------------------

/// The secret half of a shielded address.
#[derive(Clone, PartialEq, Eq)]
pub struct SpendingKey(Fr);

impl SpendingKey {
    /// Sample a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        Self(Fr::rand(&mut OsRng))
    }

    /// Wrap an existing scalar. Used by tests and deterministic tooling.
    pub fn from_field(fe: Fr) -> Self {
        Self(fe)
    }

    /// Decode from the canonical 32-byte encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr = to_array(bytes)?;
        fr_from_bytes(&arr).map(Self).ok_or(KeyError::NonCanonical)
    }

    /// Canonical 32-byte encoding. Handle with care.
    pub fn to_bytes(&self) -> [u8; 32] {
        fr_to_bytes(&self.0)
    }

    /// The underlying scalar, for PRF evaluation and witness assembly.
    pub fn as_field(&self) -> &Fr {
        &self.0
    }

    /// Derive the public address `PRF_addr(a_sk, 0)`.
    pub fn public_address(&self) -> PublicAddress {
        PublicAddress::from_field(&address_of(&self.0))
    }
}

impl fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material, not even a prefix.
        write!(f, "SpendingKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// PublicAddress
// ---------------------------------------------------------------------------

/// The public half of a shielded address: canonical bytes of `a_pk`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicAddress([u8; 32]);

impl PublicAddress {
    /// Encode a field element as an address.
    pub fn from_field(fe: &Fr) -> Self {
        Self(fr_to_bytes(fe))
    }

    /// Decode raw bytes, rejecting anything that is not a canonical scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr = to_array(bytes)?;
        if fr_from_bytes(&arr).is_none() {
            return Err(KeyError::NonCanonical);
        }
        Ok(Self(arr))
    }

    /// The address as a field element.
    ///
    /// Addresses built through this module are always canonical; a
    /// hand-crafted non-canonical one reduces to a different scalar and
    /// simply owns nothing.
    pub fn to_field(&self) -> Fr {
        use ark_ff::PrimeField;
        Fr::from_le_bytes_mod_order(&self.0)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Bech32 form, `tsr1...`.
    pub fn to_bech32(&self) -> String {
        let hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        bech32::encode::<Bech32>(hrp, &self.0)
            .expect("encoding a 32-byte payload should never fail")
    }

    /// Parse the Bech32 form, checking HRP, checksum and length.
    pub fn from_bech32(s: &str) -> Result<Self, KeyError> {
        let (hrp, data) = bech32::decode(s).map_err(|e| KeyError::Bech32Decode(e.to_string()))?;

        let expected_hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        if hrp != expected_hrp {
            return Err(KeyError::InvalidHrp {
                expected: ADDRESS_HRP.to_string(),
                got: hrp.to_string(),
            });
        }

        Self::from_bytes(&data)
    }
}

impl fmt::Display for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bech32())
    }
}

impl fmt::Debug for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicAddress({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// ShieldedKeypair
// ---------------------------------------------------------------------------

/// A spending key together with its derived address.
#[derive(Clone)]
pub struct ShieldedKeypair {
    spending_key: SpendingKey,
    address: PublicAddress,
}

impl ShieldedKeypair {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        Self::from_spending_key(SpendingKey::generate())
    }

    /// Rebuild the pair from a known spending key.
    pub fn from_spending_key(spending_key: SpendingKey) -> Self {
        let address = spending_key.public_address();
        Self {
            spending_key,
            address,
        }
    }

    /// The secret half.
    pub fn spending_key(&self) -> &SpendingKey {
        &self.spending_key
    }

    /// The public half.
    pub fn address(&self) -> PublicAddress {
        self.address
    }
}

impl fmt::Debug for ShieldedKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShieldedKeypair(addr={})", self.address.to_hex())
    }
}

/// Fresh Ed25519 key for a single spend. Its verifying key becomes `hSig`.
pub fn generate_one_time_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_deterministic_for_a_key() {
        let sk = SpendingKey::from_field(Fr::from(99u64));
        assert_eq!(sk.public_address(), sk.public_address());
        let kp = ShieldedKeypair::from_spending_key(sk.clone());
        assert_eq!(kp.address(), sk.public_address());
    }

    #[test]
    fn fresh_keypairs_differ() {
        let a = ShieldedKeypair::generate();
        let b = ShieldedKeypair::generate();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn spending_key_bytes_round_trip() {
        let sk = SpendingKey::generate();
        let restored = SpendingKey::from_bytes(&sk.to_bytes()).unwrap();
        assert_eq!(sk, restored);
    }

    #[test]
    fn debug_never_leaks_spending_key() {
        let sk = SpendingKey::generate();
        let rendered = format!("{:?}", sk);
        assert!(!rendered.contains(&hex::encode(sk.to_bytes())));
        let kp = ShieldedKeypair::from_spending_key(sk.clone());
        assert!(!format!("{:?}", kp).contains(&hex::encode(sk.to_bytes())));
    }

    #[test]
    fn address_hex_round_trip() {
        let addr = ShieldedKeypair::generate().address();
        assert_eq!(PublicAddress::from_hex(&addr.to_hex()).unwrap(), addr);
    }

    #[test]
    fn address_bech32_round_trip() {
        let addr = ShieldedKeypair::generate().address();
        let encoded = addr.to_bech32();
        assert!(encoded.starts_with("tsr1"));
        assert_eq!(PublicAddress::from_bech32(&encoded).unwrap(), addr);
        assert_eq!(addr.to_string(), encoded);
    }

    #[test]
    fn bech32_wrong_hrp_rejected() {
        let addr = ShieldedKeypair::generate().address();
        let hrp = Hrp::parse("nope").unwrap();
        let foreign = bech32::encode::<Bech32>(hrp, addr.as_bytes()).unwrap();
        assert!(matches!(
            PublicAddress::from_bech32(&foreign),
            Err(KeyError::InvalidHrp { .. })
        ));
    }

    #[test]
    fn non_canonical_address_rejected() {
        assert_eq!(
            PublicAddress::from_bytes(&[0xFF; 32]),
            Err(KeyError::NonCanonical)
        );
        assert!(matches!(
            PublicAddress::from_bytes(&[0u8; 31]),
            Err(KeyError::InvalidLength { expected: 32, got: 31 })
        ));
    }

    #[test]
    fn one_time_keys_are_fresh() {
        let a = generate_one_time_signing_key();
        let b = generate_one_time_signing_key();
        assert_ne!(a.verifying_key(), b.verifying_key());
    }
}
