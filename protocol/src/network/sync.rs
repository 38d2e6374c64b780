//! # Chain Synchronization
//!
//! [`ChainSync`] takes blocks in whatever order the network delivers them
//! and keeps three things current: the set of stored blocks, the head (the
//! longest chain seen), and the last confirmed block `confirmed_depth` blocks
//! behind the head, whose ledger the wallet trusts.
//!
//! ## Block Lifecycle
//!
//! ```text
//!            parent unknown            parent arrives
//! Unseen ─────────────────> Buffered ─────────────────> Stored
//!   │                                                     │
//!   └──────────── parent known ──────────────────────────>┤
//!                                         longer chain    │
//!                                                         v
//!                                                        Head
//! ```
//!
//! ## Design Decisions
//!
//! - **Buffer, don't fail.** A block whose parent is unknown is parked under
//!   the parent's id. Only the first waiter triggers a missing-block request.
//! - **Explicit worklist.** When a block lands, its waiting children are
//!   drained through a `VecDeque`, so a long orphan chain cannot blow the stack.
//! - **Strictly longer wins.** A block of equal length never replaces the
//!   head.
//! - **Whole snapshot swap.** The confirmed view is an `Arc<LedgerSnapshot>`
//!   replaced in one assignment. Readers holding the old one keep a consistent
//!   view.
//!
//! `ChainSync` does no I/O beyond asking its [`Network`] for missing blocks.
//! Serving blocks to peers goes through [`ChainSync::process_sync_request`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::gossip::Network;
use crate::config::ClientConfig;
use crate::storage::block::{Block, BlockId};
use crate::storage::ledger::LedgerSnapshot;
use crate::zkp::nullifier::Nullifier;

// ---------------------------------------------------------------------------
// Sync Request / Response
// ---------------------------------------------------------------------------

/// Requests a peer can make of our block store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncRequest {
    /// Peer `from` lacks block `missing`.
    MissingBlock {
        /// Requesting peer.
        from: String,
        /// Block it asked for.
        missing: BlockId,
    },
}

/// Our answer to a [`SyncRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncResponse {
    /// The requested block, for peer `to`.
    Block {
        /// Peer that asked.
        to: String,
        /// The block.
        block: Box<Block>,
    },
    /// We do not have it either.
    NotFound(BlockId),
}

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

/// What happened to a delivered block. None of these are failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockStatus {
    /// Stored. `became_head` if it extended the longest chain.
    Stored {
        /// The block is now the head.
        became_head: bool,
        /// Buffered descendants stored along with it.
        unblocked: usize,
    },
    /// Already stored or already waiting. Nothing changed.
    Duplicate,
    /// Parent unknown. Parked until it arrives.
    Buffered {
        /// Id of the missing parent.
        parent: BlockId,
        /// True if this delivery issued the missing-block request.
        requested: bool,
    },
}

/// Reasons a delivered block is rejected outright.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Not genesis and the proof of work is missing or too weak.
    #[error("block {0} does not have a valid proof")]
    InvalidBlockProof(BlockId),

    /// The bytes do not decode, or the block is internally inconsistent.
    #[error("malformed block: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// ChainSync
// ---------------------------------------------------------------------------

/// Block store, orphan buffer and fork choice for one client.
///
/// Not internally synchronized. The owning client wraps it in a lock.
pub struct ChainSync {
    peer_id: String,
    config: ClientConfig,
    network: Arc<dyn Network>,
    blocks: HashMap<BlockId, Arc<Block>>,
    pending: HashMap<BlockId, Vec<Block>>,
    head: Arc<Block>,
    last_confirmed: Arc<Block>,
    snapshot: Arc<LedgerSnapshot>,
}

impl ChainSync {
    /// A store holding only the genesis block, which is both head and last
    /// confirmed.
    pub fn new(peer_id: impl Into<String>, config: ClientConfig, network: Arc<dyn Network>) -> Self {
        let genesis = Arc::new(Block::genesis());
        let snapshot = Arc::new(LedgerSnapshot::new(&genesis, HashSet::new()));
        let mut blocks = HashMap::new();
        blocks.insert(genesis.id, Arc::clone(&genesis));
        Self {
            peer_id: peer_id.into(),
            config,
            network,
            blocks,
            pending: HashMap::new(),
            head: Arc::clone(&genesis),
            last_confirmed: genesis,
            snapshot,
        }
    }

    /// Decode a wire-encoded block and process it.
    pub fn receive_block(&mut self, raw: &[u8]) -> Result<BlockStatus, SyncError> {
        let block = Block::from_bytes(raw).map_err(|e| SyncError::Malformed(e.to_string()))?;
        self.receive(block)
    }

    /// Process a decoded block, then any buffered descendants it unblocks.
    pub fn receive(&mut self, block: Block) -> Result<BlockStatus, SyncError> {
        if self.blocks.contains_key(&block.id) {
            debug!(block = %block.id, "duplicate block ignored");
            return Ok(BlockStatus::Duplicate);
        }

        self.check_block(&block)?;

        if !block.is_genesis() && !self.blocks.contains_key(&block.prev_block_hash) {
            return Ok(self.buffer(block));
        }

        let id = block.id;
        let became_head = self.store(block)?;
        let unblocked = self.drain_pending(id);

        Ok(BlockStatus::Stored {
            became_head,
            unblocked,
        })
    }

    /// Serve a peer's request for a block we may hold.
    pub fn process_sync_request(&self, request: SyncRequest) -> SyncResponse {
        match request {
            SyncRequest::MissingBlock { from, missing } => match self.blocks.get(&missing) {
                Some(block) => {
                    debug!(block = %missing, peer = %from, "serving missing block");
                    SyncResponse::Block {
                        to: from,
                        block: Box::new(Block::clone(block)),
                    }
                }
                None => SyncResponse::NotFound(missing),
            },
        }
    }

    // -- Accessors ----------------------------------------------------------

    /// Id this client uses on the network.
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// The longest-chain tip.
    pub fn head(&self) -> Arc<Block> {
        Arc::clone(&self.head)
    }

    /// The block `confirmed_depth` behind the head.
    pub fn last_confirmed(&self) -> Arc<Block> {
        Arc::clone(&self.last_confirmed)
    }

    /// The confirmed ledger view.
    pub fn snapshot(&self) -> Arc<LedgerSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// A stored block.
    pub fn block(&self, id: &BlockId) -> Option<Arc<Block>> {
        self.blocks.get(id).cloned()
    }

    /// True if `id` is stored.
    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    /// Number of stored blocks, genesis included.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of buffered orphans.
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// True if some orphan is waiting on `parent`.
    pub fn is_waiting_for(&self, parent: &BlockId) -> bool {
        self.pending.contains_key(parent)
    }

    // -- Internals ----------------------------------------------------------

    fn check_block(&self, block: &Block) -> Result<(), SyncError> {
        block
            .verify()
            .map_err(|e| SyncError::Malformed(e.to_string()))?;

        if !block.is_genesis() && !block.meets_difficulty(self.config.difficulty_bits) {
            warn!(
                block = %block.id,
                claimed = block.difficulty_bits,
                required = self.config.difficulty_bits,
                "block does not have a valid proof"
            );
            return Err(SyncError::InvalidBlockProof(block.id));
        }
        Ok(())
    }

    fn buffer(&mut self, block: Block) -> BlockStatus {
        let parent = block.prev_block_hash;
        let requested = !self.pending.contains_key(&parent);
        let waiters = self.pending.entry(parent).or_default();

        if waiters.iter().any(|b| b.id == block.id) {
            return BlockStatus::Duplicate;
        }

        debug!(block = %block.id, parent = %parent, "buffering orphan block");
        waiters.push(block);

        if requested {
            info!(parent = %parent, "requesting missing block");
            self.network.request_missing_block(&self.peer_id, parent);
        }
        BlockStatus::Buffered { parent, requested }
    }

    /// Store a block whose parent is present. Returns true if it became head.
    fn store(&mut self, block: Block) -> Result<bool, SyncError> {
        if !block.is_genesis() {
            if let Some(parent) = self.blocks.get(&block.prev_block_hash) {
                if !block.extends(parent) {
                    warn!(block = %block.id, "block ledger does not extend its parent");
                    return Err(SyncError::Malformed(format!(
                        "block {} does not extend its parent's ledger",
                        block.id
                    )));
                }
            }
        }

        let block = Arc::new(block);
        self.blocks.insert(block.id, Arc::clone(&block));
        debug!(block = %block.id, length = block.chain_length, "block stored");

        if block.chain_length > self.head.chain_length {
            info!(
                block = %block.id,
                length = block.chain_length,
                txs = block.tx_count(),
                "new head"
            );
            self.head = block;
            self.update_last_confirmed();
            return Ok(true);
        }
        Ok(false)
    }

    fn drain_pending(&mut self, root: BlockId) -> usize {
        let mut unblocked = 0;
        let mut worklist = VecDeque::from([root]);

        while let Some(parent) = worklist.pop_front() {
            let Some(children) = self.pending.remove(&parent) else {
                continue;
            };
            for child in children {
                let id = child.id;
                debug!(block = %id, "processing unstuck block");
                if self.blocks.contains_key(&id) {
                    continue;
                }
                match self.store(child) {
                    Ok(_) => {
                        unblocked += 1;
                        worklist.push_back(id);
                    }
                    Err(e) => warn!(block = %id, error = %e, "dropping buffered block"),
                }
            }
        }
        unblocked
    }

    fn update_last_confirmed(&mut self) {
        let mut current = Arc::clone(&self.head);
        for _ in 0..self.config.confirmed_depth {
            if current.is_genesis() {
                break;
            }
            let prev = current.prev_block_hash;
            match self.blocks.get(&prev) {
                Some(parent) => current = Arc::clone(parent),
                None => break,
            }
        }

        if current.id == self.last_confirmed.id {
            return;
        }

        let nullifiers = self.nullifiers_through(&current);
        self.snapshot = Arc::new(LedgerSnapshot::new(&current, nullifiers));
        info!(
            block = %current.id,
            length = current.chain_length,
            commitments = current.cm_ledger.len(),
            "last confirmed block updated"
        );
        self.last_confirmed = current;
    }

    /// Every nullifier revealed from `tip` back to genesis.
    fn nullifiers_through(&self, tip: &Block) -> HashSet<Nullifier> {
        let mut out = HashSet::new();
        let mut current = Some(tip);
        while let Some(block) = current {
            out.extend(block.transactions.iter().filter_map(|tx| tx.nullifier()));
            if block.is_genesis() {
                break;
            }
            current = self.blocks.get(&block.prev_block_hash).map(|b| b.as_ref());
        }
        out
    }
}

impl std::fmt::Debug for ChainSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSync")
            .field("peer_id", &self.peer_id)
            .field("head", &self.head.id)
            .field("last_confirmed", &self.last_confirmed.id)
            .field("blocks", &self.blocks.len())
            .field("pending", &self.pending_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
