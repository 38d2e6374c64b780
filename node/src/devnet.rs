//! # In-Process Devnet
//!
//! Wires shielded clients, each on its own [`LoopbackNetwork`], to one
//! [`ToyMiner`]. The devnet plays the role of the gossip layer: it drains
//! every client's outbox and hands each message to whoever listens on that
//! topic.
//!
//! ```text
//! POST_TRANSACTION  client ──> miner
//! MISSING_BLOCK     client ──> every other online client
//! PROOF_FOUND       miner/client ──> every other online client
//! ```
//!
//! Offline clients miss `PROOF_FOUND` traffic entirely. When they join they
//! are handed only the current head and must walk back to genesis through
//! missing-block requests answered by their peers.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use tessera_protocol::config::ClientConfig;
use tessera_protocol::network::gossip::{GossipMessage, LoopbackNetwork};
use tessera_protocol::storage::block::Block;
use tessera_protocol::wallet::store::CoinStatus;
use tessera_protocol::zkp::prover::SpendProver;
use tessera_protocol::zkp::verifier::SpendVerifier;
use tessera_protocol::ShieldedClient;

use crate::miner::ToyMiner;

/// Upper bound on routing passes per `route` call. Each pass moves one hop
/// of gossip, so this also bounds how far back a joining client can sync in
/// one call.
const MAX_ROUTING_PASSES: usize = 10_000;

struct Peer {
    client: Arc<ShieldedClient>,
    network: Arc<LoopbackNetwork>,
    online: bool,
}

/// A set of clients and a miner sharing one simulated network.
pub struct Devnet {
    config: ClientConfig,
    prover: Arc<dyn SpendProver>,
    peers: Vec<Peer>,
    miner: Mutex<ToyMiner>,
}

/// Per-client line of the final report.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub name: String,
    pub address: String,
    pub balance: u64,
    pub pending: u64,
    pub coins: usize,
    pub head_length: u64,
    pub confirmed_length: u64,
}

/// What the devnet looks like at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct DevnetSummary {
    pub head: String,
    pub chain_length: u64,
    pub ledger_size: usize,
    pub clients: Vec<ClientSummary>,
}

impl Devnet {
    /// An empty devnet. `verifier` enables proof checks in the miner.
    pub fn new(
        config: ClientConfig,
        prover: Arc<dyn SpendProver>,
        verifier: Option<SpendVerifier>,
    ) -> Self {
        let miner = ToyMiner::new(config.difficulty_bits, verifier);
        Self {
            config,
            prover,
            peers: Vec::new(),
            miner: Mutex::new(miner),
        }
    }

    /// Add a client. Offline clients see no blocks until [`Devnet::join`].
    pub fn add_client(&mut self, name: impl Into<String>, online: bool) -> usize {
        let network = Arc::new(LoopbackNetwork::new());
        let client = Arc::new(ShieldedClient::new(
            name,
            self.config.clone(),
            network.clone(),
            Arc::clone(&self.prover),
        ));
        debug!(client = client.name(), online, "client added");
        self.peers.push(Peer {
            client,
            network,
            online,
        });
        self.peers.len() - 1
    }

    /// The client at `index`.
    pub fn client(&self, index: usize) -> &Arc<ShieldedClient> {
        &self.peers[index].client
    }

    /// Number of clients, online or not.
    pub fn client_count(&self) -> usize {
        self.peers.len()
    }

    /// The miner's current head.
    pub fn head(&self) -> Block {
        self.miner.lock().head().clone()
    }

    /// Deliver queued gossip until every outbox is empty. Returns the number
    /// of messages moved.
    pub fn route(&self) -> usize {
        let mut moved = 0;
        for _ in 0..MAX_ROUTING_PASSES {
            let batch: Vec<(usize, GossipMessage)> = self
                .peers
                .iter()
                .enumerate()
                .flat_map(|(i, peer)| peer.network.drain().into_iter().map(move |m| (i, m)))
                .collect();
            if batch.is_empty() {
                return moved;
            }
            moved += batch.len();
            for (origin, message) in batch {
                self.dispatch(Some(origin), &message);
            }
        }
        warn!(moved, "routing did not settle");
        moved
    }

    fn dispatch(&self, origin: Option<usize>, message: &GossipMessage) {
        if let GossipMessage::PostTransaction(tx) = message {
            if let Err(e) = self.miner.lock().submit(tx.clone()) {
                warn!(tx = %tx.id(), error = %format!("{e:#}"), "miner rejected transaction");
            }
            return;
        }

        for (i, peer) in self.peers.iter().enumerate() {
            if Some(i) == origin || !peer.online {
                continue;
            }
            if let Err(e) = peer.client.handle_message(message) {
                warn!(client = peer.client.name(), error = %e, "message rejected");
            }
        }
    }

    /// Mine the pool into a block and announce it.
    pub fn mine(&self) -> Result<Block> {
        let block = self.miner.lock().mine_block()?;
        let raw = block.to_bytes().context("encoding mined block")?;
        self.dispatch(None, &GossipMessage::ProofFound { block: raw });
        self.route();
        Ok(block)
    }

    /// Mine the pool, then enough empty blocks to confirm it.
    pub fn settle(&self) -> Result<Block> {
        let mut head = self.mine()?;
        for _ in 0..self.config.confirmed_depth {
            head = self.mine()?;
        }
        Ok(head)
    }

    /// Bring an offline client online by handing it the head block only.
    pub fn join(&mut self, index: usize) -> Result<()> {
        let raw = self.head().to_bytes().context("encoding head")?;
        let peer = &mut self.peers[index];
        peer.online = true;
        peer.client
            .handle_message(&GossipMessage::ProofFound { block: raw })
            .context("head rejected by joining client")?;
        let moved = self.route();
        info!(
            client = self.peers[index].client.name(),
            moved,
            head = self.peers[index].client.head().chain_length,
            "client joined"
        );
        Ok(())
    }

    /// Largest confirmed coin a client holds, after reconciling.
    pub fn largest_confirmed_coin(&self, index: usize) -> u64 {
        let client = self.client(index);
        client.confirm_owned_coins();
        client
            .owned_coins()
            .iter()
            .filter(|c| c.status == CoinStatus::Confirmed)
            .map(|c| c.coin.value())
            .max()
            .unwrap_or(0)
    }

    /// Snapshot of every client for the final report.
    pub fn summary(&self) -> DevnetSummary {
        let head = self.head();
        let clients = self
            .peers
            .iter()
            .map(|peer| {
                let client = &peer.client;
                ClientSummary {
                    name: client.name().to_string(),
                    address: client.address().to_bech32(),
                    balance: client.get_balance(),
                    pending: client.pending_balance(),
                    coins: client.owned_coins().len(),
                    head_length: client.head().chain_length,
                    confirmed_length: client.last_confirmed().chain_length,
                }
            })
            .collect();
        DevnetSummary {
            head: head.id.to_hex(),
            chain_length: head.chain_length,
            ledger_size: head.cm_ledger.len(),
            clients,
        }
    }
}
