//! # Transaction Module
//!
//! The two shielded transaction kinds and the envelope that carries them in
//! blocks.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   ShieldedTransaction envelope, TxId, TransactionError
//! mint.rs    MintTransaction {cm, v, hashv, k, s}
//! spend.rs   SpendTransaction {anchor, sn, cm1, cm2, hSig, h_, proof, pk_sig, sig}
//! ```
//!
//! ## Design Decisions
//!
//! - Transaction ids are BLAKE3 over the canonical field order, prefixed
//!   with the kind so a mint and a spend can never share an id.
//! - Scalars travel as canonical 32-byte little-endian encodings and are
//!   decoded (and rejected if non-canonical) only when verified.
//! - Mints are not signed. Spends are signed by a one-time Ed25519 key bound
//!   into the proof via `hSig`.

pub mod mint;
pub mod spend;
pub mod types;

pub use mint::MintTransaction;
pub use spend::{h_sig_of, SpendTransaction};
pub use types::{ShieldedTransaction, TransactionError, TxId};
