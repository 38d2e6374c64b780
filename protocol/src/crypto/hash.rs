//! # Hashing Utilities
//!
//! Byte-oriented hash functions used outside the circuit. Everything that has
//! to be recomputed inside the spend proof goes through Poseidon instead (see
//! [`super::poseidon`]); these are for block ids, value digests and the
//! occasional field-element derivation.
//!
//! - **BLAKE3** is the default. Block ids, transaction ids and Poseidon
//!   constant derivation all use it.
//! - **SHA-256** backs the `hashedV` digest published in mint transactions,
//!   so that a validator written against any stack can recompute it.
//!
//! ## hash_to_field
//!
//! [`hash_to_field`] maps arbitrary bytes to a BN254 scalar by hashing with
//! BLAKE3 and reducing modulo the field order. It is how the one-time
//! signature key of a spend becomes `hSig`.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_serialize::CanonicalDeserialize;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data as a fixed-size array.
///
/// # Example
///
/// ```
/// use tessera_protocol::crypto::sha256;
///
/// let hash = sha256(b"tessera");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Digest of a coin value, published as `hashedV` in mint transactions.
pub fn value_digest(value: u64) -> [u8; 32] {
    sha256(&value.to_le_bytes())
}

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use tessera_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"tessera");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices together without building a concatenated buffer.
///
/// Block headers are hashed this way: each field is fed to the hasher in
/// order, which is equivalent to hashing the concatenation.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Domain-separated BLAKE3 using the `derive_key` mode.
///
/// Two different contexts never collide, even on identical data, because
/// BLAKE3 derives a distinct IV from the context string.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Hash arbitrary data to a BN254 scalar field element.
///
/// BLAKE3 output is interpreted as a little-endian integer and reduced mod r.
/// The bias from the reduction is negligible since the digest has two more
/// bits than the field modulus.
///
/// ```
/// use tessera_protocol::crypto::hash_to_field;
///
/// assert_eq!(hash_to_field(b"pk"), hash_to_field(b"pk"));
/// ```
pub fn hash_to_field(data: &[u8]) -> Fr {
    Fr::from_le_bytes_mod_order(&blake3_hash(data))
}

/// Canonical 32-byte little-endian encoding of a field element.
pub fn fr_to_bytes(fe: &Fr) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&fe.into_bigint().to_bytes_le());
    out
}

/// Decode a field element from its canonical encoding.
///
/// Returns `None` when the bytes encode an integer >= r. Commitments and
/// nullifiers that arrive over the wire go through here, so a non-canonical
/// encoding can never alias a valid one.
pub fn fr_from_bytes(bytes: &[u8; 32]) -> Option<Fr> {
    Fr::deserialize_compressed(&bytes[..]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn value_digest_distinguishes_values() {
        assert_eq!(value_digest(100), value_digest(100));
        assert_ne!(value_digest(100), value_digest(101));
        assert_eq!(value_digest(7), sha256(&7u64.to_le_bytes()));
    }

    #[test]
    fn blake3_deterministic() {
        let a = blake3_hash(b"tessera");
        let b = blake3_hash(b"tessera");
        assert_eq!(a, b);
        assert_ne!(a, blake3_hash(b"Tessera"));
    }

    #[test]
    fn test_blake3_hash_multi_matches_concatenation() {
        let multi = blake3_hash_multi(&[b"hello".as_slice(), b" world".as_slice()]);
        assert_eq!(multi, blake3_hash(b"hello world"));
    }

    #[test]
    fn test_domain_separation() {
        let data = b"same data";
        assert_ne!(
            domain_separated_hash("context-a", data),
            domain_separated_hash("context-b", data)
        );
        assert_ne!(domain_separated_hash("context-a", data), blake3_hash(data));
    }

    #[test]
    fn test_hash_to_field_deterministic() {
        assert_eq!(hash_to_field(b"pk"), hash_to_field(b"pk"));
        assert_ne!(hash_to_field(b"input A"), hash_to_field(b"input B"));
    }

    #[test]
    fn fr_bytes_round_trip() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let fe = Fr::rand(&mut rng);
            assert_eq!(fr_from_bytes(&fr_to_bytes(&fe)), Some(fe));
        }
    }

    #[test]
    fn fr_from_bytes_rejects_non_canonical() {
        // 2^256 - 1 is far above the BN254 scalar modulus.
        assert_eq!(fr_from_bytes(&[0xFF; 32]), None);
    }
}
