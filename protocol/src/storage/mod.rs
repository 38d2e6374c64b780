//! # Storage Module
//!
//! Chain data as the shielded client sees it.
//!
//! ## Architecture
//!
//! ```text
//! block.rs   Block, BlockId, proof of work, wire codecs
//! ledger.rs  LedgerSnapshot, the immutable confirmed view
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Every block carries the whole ledger.** A block's `cm_ledger` is its
//!    parent's plus its own commitments, so confirming a coin or building an
//!    anchor needs one block, not a replay.
//!
//! 2. **BLAKE3 for ids and digests.** Nothing here enters the circuit, so the
//!    fast byte hash is used throughout.
//!
//! 3. **Bincode on the wire, JSON for humans.**
//!
//! Nothing is persisted across restarts. A client rebuilds its view from the
//! blocks peers send it.

pub mod block;
pub mod ledger;

pub use block::{Block, BlockError, BlockId};
pub use ledger::LedgerSnapshot;
