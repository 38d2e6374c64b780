//! # Gossip Seam
//!
//! The client never talks to sockets. It hands [`GossipMessage`]s to a
//! [`Network`] and reacts to the ones the runtime delivers back. Three topics
//! exist:
//!
//! ```text
//! POST_TRANSACTION  client -> miners    new mint or spend
//! MISSING_BLOCK     client -> peers     "I need block X"
//! PROOF_FOUND       miner  -> everyone  a freshly mined block
//! ```
//!
//! ## Deduplication
//!
//! Every message is identified by the BLAKE3 hash of its bincode encoding.
//! [`LoopbackNetwork`] keeps a bounded set of hashes it has already sent and
//! drops repeats, so a client that re-broadcasts on retry does not flood the
//! simulator.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{TOPIC_MISSING_BLOCK, TOPIC_POST_TRANSACTION, TOPIC_PROOF_FOUND};
use crate::crypto::hash::blake3_hash;
use crate::storage::block::BlockId;
use crate::transaction::ShieldedTransaction;

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// The gossip topics a client publishes or listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GossipTopic {
    /// New transactions for miners to include.
    PostTransaction,
    /// Requests for blocks a client has never seen.
    MissingBlock,
    /// Newly mined blocks.
    ProofFound,
}

impl GossipTopic {
    /// Wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostTransaction => TOPIC_POST_TRANSACTION,
            Self::MissingBlock => TOPIC_MISSING_BLOCK,
            Self::ProofFound => TOPIC_PROOF_FOUND,
        }
    }
}

impl std::fmt::Display for GossipTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A message on one of the gossip topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipMessage {
    /// A transaction for miners.
    PostTransaction(ShieldedTransaction),
    /// `from` is missing block `missing` and asks any peer to resend it.
    MissingBlock {
        /// Peer id of the requester.
        from: String,
        /// Id of the block it lacks.
        missing: BlockId,
    },
    /// A mined block, bincode-encoded.
    ProofFound {
        /// The block's wire encoding.
        block: Vec<u8>,
    },
}

impl GossipMessage {
    /// The topic this message travels on.
    pub fn topic(&self) -> GossipTopic {
        match self {
            Self::PostTransaction(_) => GossipTopic::PostTransaction,
            Self::MissingBlock { .. } => GossipTopic::MissingBlock,
            Self::ProofFound { .. } => GossipTopic::ProofFound,
        }
    }

    /// BLAKE3 of the message's bincode encoding.
    pub fn content_hash(&self) -> [u8; 32] {
        let serialized = bincode::serialize(self).unwrap_or_default();
        blake3_hash(&serialized)
    }
}

// ---------------------------------------------------------------------------
// Network seam
// ---------------------------------------------------------------------------

/// Outbound side of the peer-to-peer layer.
pub trait Network: Send + Sync {
    /// Publish `message` on its topic.
    fn broadcast(&self, message: GossipMessage);

    /// Ask peers for block `missing` on behalf of peer `from`.
    fn request_missing_block(&self, from: &str, missing: BlockId) {
        self.broadcast(GossipMessage::MissingBlock {
            from: from.to_string(),
            missing,
        });
    }
}

/// Maximum number of message hashes the loopback remembers.
const SEEN_CACHE_SIZE: usize = 10_000;

#[derive(Default)]
struct Outbox {
    queue: Vec<GossipMessage>,
    seen: HashSet<[u8; 32]>,
    seen_order: VecDeque<[u8; 32]>,
}

/// An in-process [`Network`] that records every distinct outbound message.
///
/// Tests inspect what a client published; the devnet simulator drains the
/// outbox and routes messages to the other participants.
#[derive(Default)]
pub struct LoopbackNetwork {
    outbox: Mutex<Outbox>,
}

impl LoopbackNetwork {
    /// An empty loopback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message sent and not yet drained.
    pub fn sent(&self) -> Vec<GossipMessage> {
        self.outbox.lock().queue.clone()
    }

    /// Take the pending messages, leaving the outbox empty. The seen cache
    /// is kept.
    pub fn drain(&self) -> Vec<GossipMessage> {
        std::mem::take(&mut self.outbox.lock().queue)
    }

    /// Messages sent on `topic`.
    pub fn sent_on(&self, topic: GossipTopic) -> Vec<GossipMessage> {
        self.outbox
            .lock()
            .queue
            .iter()
            .filter(|m| m.topic() == topic)
            .cloned()
            .collect()
    }

    /// Ids requested through `MISSING_BLOCK`, in order.
    pub fn missing_block_requests(&self) -> Vec<BlockId> {
        self.outbox
            .lock()
            .queue
            .iter()
            .filter_map(|m| match m {
                GossipMessage::MissingBlock { missing, .. } => Some(*missing),
                _ => None,
            })
            .collect()
    }

    /// Transactions posted, in order.
    pub fn posted_transactions(&self) -> Vec<ShieldedTransaction> {
        self.outbox
            .lock()
            .queue
            .iter()
            .filter_map(|m| match m {
                GossipMessage::PostTransaction(tx) => Some(tx.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Network for LoopbackNetwork {
    fn broadcast(&self, message: GossipMessage) {
        let hash = message.content_hash();
        let mut outbox = self.outbox.lock();

        if !outbox.seen.insert(hash) {
            trace!(topic = %message.topic(), "duplicate message dropped");
            return;
        }
        outbox.seen_order.push_back(hash);
        if outbox.seen_order.len() > SEEN_CACHE_SIZE {
            if let Some(oldest) = outbox.seen_order.pop_front() {
                outbox.seen.remove(&oldest);
            }
        }

        debug!(topic = %message.topic(), "message broadcast");
        outbox.queue.push(message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
