//! # Cryptographic Primitives for Tessera
//!
//! Two families of primitives live here:
//!
//! - **Byte hashes** (BLAKE3, SHA-256) for block ids, value digests and
//!   anything that never enters the circuit.
//! - **Field hashes** (Poseidon over BN254, and the role-tagged PRF built on
//!   it) for everything the spend proof has to recompute: addresses,
//!   commitments, nullifiers, Merkle nodes.
//!
//! Keys are BN254 scalars for shielded addresses and Ed25519 for the one-time
//! signature that binds a spend transaction to its proof. Everything is a thin
//! wrapper around arkworks, `blake3`, `sha2` and `ed25519-dalek`.

pub mod hash;
pub mod keys;
pub mod poseidon;
pub mod prf;

pub use hash::{blake3_hash, fr_from_bytes, fr_to_bytes, hash_to_field, sha256, value_digest};
pub use keys::{generate_one_time_signing_key, KeyError, PublicAddress, ShieldedKeypair, SpendingKey};
pub use poseidon::{hash_with_domain, poseidon_config, poseidon_hash, HashDomain};
pub use prf::{prf, PrfRole};
