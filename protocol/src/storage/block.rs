//! # Block Structure
//!
//! A block links to its parent by id, carries an ordered list of shielded
//! transactions, and snapshots the entire commitment ledger as of itself:
//! the parent's ledger followed by every commitment its transactions create.
//! A client can therefore answer "is this coin confirmed" from a single block
//! without replaying history.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  id: [u8; 32]          BLAKE3 of the header │
//! │  prev_block_hash: [u8; 32]                  │
//! │  chain_length: u64     genesis = 0          │
//! │  timestamp: u64        unix millis          │
//! │  nonce: u64            proof-of-work search │
//! │  difficulty_bits: u32                       │
//! │  tx_root: [u8; 32]     BLAKE3 of tx ids     │
//! │  ledger_digest: [u8; 32]                    │
//! ├─────────────────────────────────────────────┤
//! │  transactions: Vec<ShieldedTransaction>     │
//! │  cm_ledger: Vec<CoinCommitment>             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Proof of Work
//!
//! A block has a valid proof when its id has at least `difficulty_bits`
//! leading zero bits. The genesis block is exempt.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MAX_DIFFICULTY_BITS;
use crate::crypto::hash::blake3_hash_multi;
use crate::transaction::ShieldedTransaction;
use crate::zkp::commitment::CoinCommitment;

// ---------------------------------------------------------------------------
// BlockId
// ---------------------------------------------------------------------------

/// BLAKE3 hash of a block header.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub [u8; 32]);

impl BlockId {
    /// Parent id of the genesis block.
    pub const ZERO: BlockId = BlockId([0u8; 32]);

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Number of leading zero bits.
    pub fn leading_zero_bits(&self) -> u32 {
        let mut bits = 0;
        for byte in self.0 {
            if byte == 0 {
                bits += 8;
            } else {
                bits += byte.leading_zeros();
                break;
            }
        }
        bits
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", &self.to_hex()[..12])
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Structural problems with a block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// Stored id does not match the header.
    #[error("block id mismatch: stored={stored}, computed={computed}")]
    IdMismatch {
        /// Id carried by the block.
        stored: BlockId,
        /// Id recomputed from the header.
        computed: BlockId,
    },

    /// `tx_root` does not match the transactions.
    #[error("transaction root mismatch in block {0}")]
    TxRootMismatch(BlockId),

    /// `ledger_digest` does not match `cm_ledger`.
    #[error("ledger digest mismatch in block {0}")]
    LedgerDigestMismatch(BlockId),

    /// Difficulty outside the accepted range.
    #[error("difficulty of {0} bits is out of range")]
    DifficultyOutOfRange(u32),

    /// Encoding or decoding failed.
    #[error("block codec error: {0}")]
    Codec(String),
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A block with its full commitment-ledger snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// BLAKE3 of the header fields.
    pub id: BlockId,
    /// Id of the parent. [`BlockId::ZERO`] for genesis.
    pub prev_block_hash: BlockId,
    /// Number of blocks before this one.
    pub chain_length: u64,
    /// Unix timestamp (milliseconds) when the block was assembled.
    pub timestamp: u64,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Leading zero bits the id must have.
    pub difficulty_bits: u32,
    /// BLAKE3 over the transaction ids.
    pub tx_root: [u8; 32],
    /// BLAKE3 over the ledger snapshot.
    pub ledger_digest: [u8; 32],
    /// Transactions, in order.
    pub transactions: Vec<ShieldedTransaction>,
    /// Every commitment on the chain up to and including this block.
    pub cm_ledger: Vec<CoinCommitment>,
}

impl Block {
    /// The genesis block: no parent, no transactions, empty ledger.
    pub fn genesis() -> Self {
        let mut block = Block {
            id: BlockId::ZERO,
            prev_block_hash: BlockId::ZERO,
            chain_length: 0,
            timestamp: 0,
            nonce: 0,
            difficulty_bits: 0,
            tx_root: compute_tx_root(&[]),
            ledger_digest: compute_ledger_digest(&[]),
            transactions: Vec::new(),
            cm_ledger: Vec::new(),
        };
        block.id = block.compute_id();
        block
    }

    /// A new, unmined block on top of `parent`, stamped with the current time.
    pub fn new(parent: &Block, transactions: Vec<ShieldedTransaction>, difficulty_bits: u32) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::new_at(parent, transactions, difficulty_bits, timestamp)
    }

    /// Like [`Block::new`] with an explicit timestamp.
    ///
    /// The ledger snapshot is the parent's followed by each transaction's
    /// new commitments in order.
    pub fn new_at(
        parent: &Block,
        transactions: Vec<ShieldedTransaction>,
        difficulty_bits: u32,
        timestamp: u64,
    ) -> Self {
        let mut cm_ledger = parent.cm_ledger.clone();
        cm_ledger.extend(transactions.iter().flat_map(|tx| tx.new_commitments()));

        let mut block = Block {
            id: BlockId::ZERO,
            prev_block_hash: parent.id,
            chain_length: parent.chain_length + 1,
            timestamp,
            nonce: 0,
            difficulty_bits,
            tx_root: compute_tx_root(&transactions),
            ledger_digest: compute_ledger_digest(&cm_ledger),
            transactions,
            cm_ledger,
        };
        block.id = block.compute_id();
        block
    }

    /// Recompute the id from the header fields.
    pub fn compute_id(&self) -> BlockId {
        BlockId(blake3_hash_multi(&[
            &self.prev_block_hash.0,
            &self.chain_length.to_le_bytes(),
            &self.timestamp.to_le_bytes(),
            &self.nonce.to_le_bytes(),
            &self.difficulty_bits.to_le_bytes(),
            &self.tx_root,
            &self.ledger_digest,
        ]))
    }

    /// True for the chain's root block.
    pub fn is_genesis(&self) -> bool {
        self.chain_length == 0 && self.prev_block_hash == BlockId::ZERO
    }

    /// True if the id meets the block's own difficulty.
    pub fn has_valid_proof(&self) -> bool {
        self.difficulty_bits <= MAX_DIFFICULTY_BITS
            && self.id.leading_zero_bits() >= self.difficulty_bits
    }

    /// True if the block claims at least `required` bits and actually has them.
    pub fn meets_difficulty(&self, required: u32) -> bool {
        self.difficulty_bits >= required && self.has_valid_proof()
    }

    /// Search nonces until the id meets `difficulty_bits`. Returns the number
    /// of attempts.
    pub fn mine(&mut self) -> Result<u64, BlockError> {
        if self.difficulty_bits > MAX_DIFFICULTY_BITS {
            return Err(BlockError::DifficultyOutOfRange(self.difficulty_bits));
        }
        let mut attempts = 1;
        self.nonce = 0;
        self.id = self.compute_id();
        while !self.has_valid_proof() {
            self.nonce = self.nonce.wrapping_add(1);
            self.id = self.compute_id();
            attempts += 1;
        }
        Ok(attempts)
    }

    /// Check the id, transaction root and ledger digest against the content.
    pub fn verify(&self) -> Result<(), BlockError> {
        let computed = self.compute_id();
        if computed != self.id {
            return Err(BlockError::IdMismatch {
                stored: self.id,
                computed,
            });
        }
        if compute_tx_root(&self.transactions) != self.tx_root {
            return Err(BlockError::TxRootMismatch(self.id));
        }
        if compute_ledger_digest(&self.cm_ledger) != self.ledger_digest {
            return Err(BlockError::LedgerDigestMismatch(self.id));
        }
        Ok(())
    }

    /// True if this block is a correct child of `parent`: right link, right
    /// length, and a ledger that is exactly the parent's plus this block's
    /// commitments.
    pub fn extends(&self, parent: &Block) -> bool {
        if self.prev_block_hash != parent.id || self.chain_length != parent.chain_length + 1 {
            return false;
        }
        let added: Vec<CoinCommitment> = self
            .transactions
            .iter()
            .flat_map(|tx| tx.new_commitments())
            .collect();
        self.cm_ledger.len() == parent.cm_ledger.len() + added.len()
            && self.cm_ledger.starts_with(&parent.cm_ledger)
            && self.cm_ledger[parent.cm_ledger.len()..] == added[..]
    }

    /// Number of transactions.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Binary wire encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BlockError> {
        bincode::serialize(self).map_err(|e| BlockError::Codec(e.to_string()))
    }

    /// Decode the binary wire encoding.
    pub fn from_bytes(data: &[u8]) -> Result<Self, BlockError> {
        bincode::deserialize(data).map_err(|e| BlockError::Codec(e.to_string()))
    }

    /// JSON encoding, for debugging and the devnet's block dumps.
    pub fn to_json(&self) -> Result<String, BlockError> {
        serde_json::to_string(self).map_err(|e| BlockError::Codec(e.to_string()))
    }

    /// Decode the JSON encoding.
    pub fn from_json(data: &str) -> Result<Self, BlockError> {
        serde_json::from_str(data).map_err(|e| BlockError::Codec(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

fn compute_tx_root(transactions: &[ShieldedTransaction]) -> [u8; 32] {
    let ids: Vec<[u8; 32]> = transactions.iter().map(|tx| tx.id().0).collect();
    let parts: Vec<&[u8]> = ids.iter().map(|id| id.as_slice()).collect();
    blake3_hash_multi(&parts)
}

fn compute_ledger_digest(cm_ledger: &[CoinCommitment]) -> [u8; 32] {
    let parts: Vec<&[u8]> = cm_ledger.iter().map(|cm| cm.as_bytes().as_slice()).collect();
    blake3_hash_multi(&parts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
