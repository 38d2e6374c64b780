//! # Protocol Configuration & Constants
//!
//! Every magic number in Tessera lives here, together with [`ClientConfig`],
//! the per-client knobs a wallet can tune without forking the network.
//!
//! Consensus-level values (difficulty, tree depth, hash domains) must be the
//! same for every participant. Client-level values only change how patient a
//! wallet is before it trusts or gives up on a coin.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol identity
// ---------------------------------------------------------------------------

/// Semantic version of the block and transaction formats.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Bech32 human-readable prefix for shielded public addresses.
pub const ADDRESS_HRP: &str = "tsr";

// ---------------------------------------------------------------------------
// Gossip topics
// ---------------------------------------------------------------------------

/// Topic carrying freshly posted mint and spend transactions.
pub const TOPIC_POST_TRANSACTION: &str = "POST_TRANSACTION";

/// Topic on which a client asks peers for a block it has never seen.
pub const TOPIC_MISSING_BLOCK: &str = "MISSING_BLOCK";

/// Topic on which miners announce a block with a valid proof of work.
pub const TOPIC_PROOF_FOUND: &str = "PROOF_FOUND";

// ---------------------------------------------------------------------------
// Consensus parameters
// ---------------------------------------------------------------------------

/// Leading zero bits a block id must have to count as a valid proof of work.
///
/// Deliberately low: the devnet miner runs in-process and tests mine blocks
/// on every run.
pub const DEFAULT_DIFFICULTY_BITS: u32 = 8;

/// Upper bound on difficulty. Above this a block id is practically unminable
/// and almost certainly the result of a corrupted header.
pub const MAX_DIFFICULTY_BITS: u32 = 64;

/// Depth of the commitment Merkle tree. 2^20 commitments per ledger.
pub const DEFAULT_TREE_DEPTH: usize = 20;

/// Number of blocks behind the head that the wallet treats as final.
pub const DEFAULT_CONFIRMED_DEPTH: u64 = 6;

/// Confirmed blocks a provisional coin may wait before it is given up on.
pub const DEFAULT_PROVISIONAL_EXPIRY_BLOCKS: u64 = 6;

/// Number of bits every coin value is range-checked to inside the circuit.
pub const VALUE_BITS: usize = 64;

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for a single shielded client.
///
/// `tree_depth` and `difficulty_bits` must agree with the rest of the
/// network; the other two are local policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How many blocks behind the head the last confirmed block sits.
    pub confirmed_depth: u64,
    /// How many confirmed blocks past its creation a provisional coin (or a
    /// pending spend) may stay unconfirmed before it is evicted (or released).
    pub provisional_expiry_blocks: u64,
    /// Depth of the commitment Merkle tree the spend circuit was set up for.
    pub tree_depth: usize,
    /// Proof-of-work difficulty expected on incoming blocks.
    pub difficulty_bits: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            confirmed_depth: DEFAULT_CONFIRMED_DEPTH,
            provisional_expiry_blocks: DEFAULT_PROVISIONAL_EXPIRY_BLOCKS,
            tree_depth: DEFAULT_TREE_DEPTH,
            difficulty_bits: DEFAULT_DIFFICULTY_BITS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_client_config_uses_protocol_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.confirmed_depth, DEFAULT_CONFIRMED_DEPTH);
        assert_eq!(cfg.provisional_expiry_blocks, DEFAULT_PROVISIONAL_EXPIRY_BLOCKS);
        assert_eq!(cfg.tree_depth, DEFAULT_TREE_DEPTH);
        assert_eq!(cfg.difficulty_bits, DEFAULT_DIFFICULTY_BITS);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: ClientConfig = serde_json::from_str(r#"{"confirmed_depth": 0}"#).unwrap();
        assert_eq!(cfg.confirmed_depth, 0);
        assert_eq!(cfg.tree_depth, DEFAULT_TREE_DEPTH);
    }

    #[test]
    fn topics_are_distinct() {
        assert_ne!(TOPIC_POST_TRANSACTION, TOPIC_MISSING_BLOCK);
        assert_ne!(TOPIC_MISSING_BLOCK, TOPIC_PROOF_FOUND);
        assert_ne!(TOPIC_POST_TRANSACTION, TOPIC_PROOF_FOUND);
    }

    #[test]
    fn value_bits_fit_the_scalar_field() {
        // BN254's scalar field is ~254 bits; sums of two range-checked values
        // must never wrap.
        assert!(VALUE_BITS + 1 < 254);
    }
}
