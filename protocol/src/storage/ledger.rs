//! The confirmed-ledger snapshot a wallet reconciles against.
//!
//! A [`LedgerSnapshot`] is immutable and built once per change of the last
//! confirmed block. Holders share it through an `Arc` so a reconcile or a
//! spend always sees one consistent block, never half of an update.

use std::collections::{HashMap, HashSet};

use super::block::{Block, BlockId};
use crate::zkp::commitment::CoinCommitment;
use crate::zkp::merkle::{MerkleError, MerkleTree};
use crate::zkp::nullifier::Nullifier;

/// Commitments and nullifiers as of one confirmed block.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    block_id: BlockId,
    chain_length: u64,
    commitments: Vec<CoinCommitment>,
    positions: HashMap<CoinCommitment, usize>,
    nullifiers: HashSet<Nullifier>,
}

impl LedgerSnapshot {
    /// Snapshot `block`'s ledger. `nullifiers` are all those revealed on the
    /// chain up to and including `block`.
    pub fn new(block: &Block, nullifiers: HashSet<Nullifier>) -> Self {
        let mut positions = HashMap::with_capacity(block.cm_ledger.len());
        for (i, cm) in block.cm_ledger.iter().enumerate() {
            positions.entry(*cm).or_insert(i);
        }
        Self {
            block_id: block.id,
            chain_length: block.chain_length,
            commitments: block.cm_ledger.clone(),
            positions,
            nullifiers,
        }
    }

    /// Id of the block the snapshot was taken from.
    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// Chain length of that block.
    pub fn chain_length(&self) -> u64 {
        self.chain_length
    }

    /// True if `cm` is on the confirmed ledger.
    pub fn contains(&self, cm: &CoinCommitment) -> bool {
        self.positions.contains_key(cm)
    }

    /// Index of the first occurrence of `cm`.
    pub fn position(&self, cm: &CoinCommitment) -> Option<usize> {
        self.positions.get(cm).copied()
    }

    /// True if `nullifier` has been revealed on the confirmed chain.
    pub fn is_spent(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    /// Ordered commitments.
    pub fn commitments(&self) -> &[CoinCommitment] {
        &self.commitments
    }

    /// Number of commitments.
    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    /// True if nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }

    /// Number of confirmed nullifiers.
    pub fn nullifier_count(&self) -> usize {
        self.nullifiers.len()
    }

    /// Build the Merkle tree whose root is the anchor for spends against
    /// this snapshot.
    pub fn merkle_tree(&self, depth: usize) -> Result<MerkleTree, MerkleError> {
        let leaves: Vec<_> = self.commitments.iter().map(|cm| cm.to_field()).collect();
        MerkleTree::new(depth, &leaves)
    }
}
