//! # Shielded Client
//!
//! [`ShieldedClient`] is one participant: an address book, a coin store and
//! a view of the chain, behind explicit locks, plus the operations that tie
//! them together.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs    ShieldedClient: construction, blocks, balances, addresses
//! mint.rs   mint(value)
//! spend.rs  spend(receiver, amount), SpendOutcome
//! error.rs  MintError, SpendError, ReceiveError
//! ```
//!
//! ## Locking
//!
//! ```text
//! chain      RwLock<ChainSync>        blocks, head, confirmed snapshot
//! coins      Mutex<CoinStore>         owned coins and their status
//! addresses  RwLock<AddressBindings>  a_pk -> a_sk
//! ```
//!
//! Locks are always taken in the order chain, coins, addresses, and none is
//! held across an `.await`. Coin selection and reservation happen under one
//! `coins` guard, so concurrent spends never pick the same coin.

pub mod error;
pub mod mint;
pub mod spend;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub use error::{MintError, ReceiveError, SpendError};
pub use spend::SpendOutcome;

use crate::config::ClientConfig;
use crate::crypto::keys::{PublicAddress, ShieldedKeypair};
use crate::network::gossip::{GossipMessage, Network};
use crate::network::sync::{BlockStatus, ChainSync, SyncError, SyncRequest, SyncResponse};
use crate::storage::block::Block;
use crate::storage::ledger::LedgerSnapshot;
use crate::wallet::bindings::AddressBindings;
use crate::wallet::coin::CoinOpening;
use crate::wallet::reconcile::BalanceReconciler;
use crate::wallet::store::{CoinStatus, CoinStore, OwnedCoin, ReconcileReport};
use crate::zkp::commitment::CoinCommitment;
use crate::zkp::prover::SpendProver;

/// A single shielded-coin participant.
pub struct ShieldedClient {
    name: String,
    config: ClientConfig,
    network: Arc<dyn Network>,
    prover: Arc<dyn SpendProver>,
    reconciler: BalanceReconciler,
    chain: RwLock<ChainSync>,
    coins: Mutex<CoinStore>,
    addresses: RwLock<AddressBindings>,
}

impl ShieldedClient {
    /// A client with one fresh address and only the genesis block.
    pub fn new(
        name: impl Into<String>,
        config: ClientConfig,
        network: Arc<dyn Network>,
        prover: Arc<dyn SpendProver>,
    ) -> Self {
        Self::with_keypair(name, config, network, prover, ShieldedKeypair::generate())
    }

    /// Like [`ShieldedClient::new`] with a known initial key.
    pub fn with_keypair(
        name: impl Into<String>,
        config: ClientConfig,
        network: Arc<dyn Network>,
        prover: Arc<dyn SpendProver>,
        keypair: ShieldedKeypair,
    ) -> Self {
        let name = name.into();
        if prover.tree_depth() != config.tree_depth {
            warn!(
                client = %name,
                prover = prover.tree_depth(),
                configured = config.tree_depth,
                "prover tree depth differs from configuration, using the prover's"
            );
        }
        let chain = ChainSync::new(name.clone(), config.clone(), Arc::clone(&network));
        Self {
            reconciler: BalanceReconciler::new(config.provisional_expiry_blocks),
            name,
            config,
            network,
            prover,
            chain: RwLock::new(chain),
            coins: Mutex::new(CoinStore::new()),
            addresses: RwLock::new(AddressBindings::with_keypair(keypair)),
        }
    }

    /// Peer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -- Addresses ----------------------------------------------------------

    /// The address new coins (mints, change) are bound to.
    pub fn address(&self) -> PublicAddress {
        self.addresses.read().current_address()
    }

    /// Rotate to a fresh address. Earlier addresses stay spendable.
    pub fn generate_new_address(&self) -> PublicAddress {
        let address = self.addresses.write().rotate();
        debug!(client = %self.name, %address, "rotated address");
        address
    }

    /// True if `address` belongs to this client.
    pub fn owns_address(&self, address: &PublicAddress) -> bool {
        self.addresses.read().contains(address)
    }

    // -- Blocks -------------------------------------------------------------

    /// Deliver a wire-encoded block.
    pub fn receive_block(&self, raw: &[u8]) -> Result<BlockStatus, SyncError> {
        self.chain.write().receive_block(raw)
    }

    /// React to one gossip message from the network.
    ///
    /// Mined blocks go to [`ChainSync`]. Missing-block requests from other
    /// peers are answered by re-broadcasting the block if we hold it. Posted
    /// transactions are for miners and ignored.
    pub fn handle_message(&self, message: &GossipMessage) -> Result<(), SyncError> {
        match message {
            GossipMessage::ProofFound { block } => {
                self.receive_block(block)?;
            }
            GossipMessage::MissingBlock { from, missing } => {
                if from == &self.name {
                    return Ok(());
                }
                let response = self.chain.read().process_sync_request(SyncRequest::MissingBlock {
                    from: from.clone(),
                    missing: *missing,
                });
                if let SyncResponse::Block { block, .. } = response {
                    match block.to_bytes() {
                        Ok(raw) => self.network.broadcast(GossipMessage::ProofFound { block: raw }),
                        Err(e) => warn!(client = %self.name, error = %e, "could not encode block"),
                    }
                }
            }
            GossipMessage::PostTransaction(_) => {}
        }
        Ok(())
    }

    /// Current head.
    pub fn head(&self) -> Arc<Block> {
        self.chain.read().head()
    }

    /// Last confirmed block.
    pub fn last_confirmed(&self) -> Arc<Block> {
        self.chain.read().last_confirmed()
    }

    /// Confirmed ledger view.
    pub fn snapshot(&self) -> Arc<LedgerSnapshot> {
        self.chain.read().snapshot()
    }

    /// True if the block is stored.
    pub fn has_block(&self, id: &crate::storage::block::BlockId) -> bool {
        self.chain.read().contains(id)
    }

    /// Orphans waiting on a parent.
    pub fn pending_block_count(&self) -> usize {
        self.chain.read().pending_count()
    }

    // -- Coins and balance ---------------------------------------------------

    /// Reconcile the coin store against the last confirmed ledger.
    pub fn confirm_owned_coins(&self) -> ReconcileReport {
        let chain = self.chain.read();
        let snapshot = chain.snapshot();
        let mut coins = self.coins.lock();
        self.reconciler.confirm_owned_coins(&mut coins, &snapshot)
    }

    /// Reconcile, then return the confirmed balance.
    pub fn get_balance(&self) -> u64 {
        let chain = self.chain.read();
        let snapshot = chain.snapshot();
        let mut coins = self.coins.lock();
        self.reconciler.get_balance(&mut coins, &snapshot)
    }

    /// Value held in coins not yet confirmed. Does not reconcile.
    pub fn pending_balance(&self) -> u64 {
        self.coins.lock().pending_balance()
    }

    /// A copy of every held coin, ascending by value.
    pub fn owned_coins(&self) -> Vec<OwnedCoin> {
        self.coins.lock().iter().cloned().collect()
    }

    /// Accept a coin opening delivered out of band, typically the payment
    /// output of someone else's spend. Held as provisional until confirmed.
    pub fn receive_coin(&self, opening: CoinOpening) -> Result<CoinCommitment, ReceiveError> {
        let coin = opening.into_coin()?;
        if !self.owns_address(&coin.owner()) {
            return Err(ReceiveError::UnboundAddress(coin.owner()));
        }

        let height = self.chain.read().head().chain_length;
        let cm = coin.cm();
        let value = coin.value();
        if !self
            .coins
            .lock()
            .add(coin, CoinStatus::Provisional { created_at: height })
        {
            return Err(ReceiveError::AlreadyHeld);
        }
        info!(client = %self.name, value, %cm, "received coin");
        Ok(cm)
    }
}

impl std::fmt::Debug for ShieldedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShieldedClient")
            .field("name", &self.name)
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::gossip::{GossipTopic, LoopbackNetwork};
    use crate::transaction::ShieldedTransaction;
    use crate::zkp::prover::CircuitCheckProver;

    const DEPTH: usize = 8;

    fn config() -> ClientConfig {
        ClientConfig {
            confirmed_depth: 0,
            provisional_expiry_blocks: 3,
            tree_depth: DEPTH,
            difficulty_bits: 0,
        }
    }

    fn client(name: &str) -> (ShieldedClient, Arc<LoopbackNetwork>) {
        let net = Arc::new(LoopbackNetwork::new());
        let c = ShieldedClient::new(
            name,
            config(),
            net.clone(),
            Arc::new(CircuitCheckProver::new(DEPTH)),
        );
        (c, net)
    }

    fn mine_posted(client: &ShieldedClient, net: &LoopbackNetwork) -> Block {
        let txs: Vec<ShieldedTransaction> = net.posted_transactions();
        net.drain();
        let mut block = Block::new(&client.head(), txs, 0);
        block.mine().unwrap();
        client.receive_block(&block.to_bytes().unwrap()).unwrap();
        block
    }

    #[test]
    fn mint_is_provisional_until_confirmed() {
        let (alice, net) = client("alice");
        alice.mint(100).unwrap();

        assert_eq!(alice.get_balance(), 0);
        assert_eq!(alice.pending_balance(), 100);
        assert_eq!(net.sent_on(GossipTopic::PostTransaction).len(), 1);

        mine_posted(&alice, &net);
        assert_eq!(alice.get_balance(), 100);
        assert_eq!(alice.pending_balance(), 0);
    }

    #[test]
    fn zero_mint_is_rejected() {
        let (alice, net) = client("alice");
        assert_eq!(alice.mint(0), Err(MintError::ZeroValue));
        assert!(net.sent().is_empty());
    }

    #[test]
    fn unmined_mint_expires() {
        let (alice, net) = client("alice");
        alice.mint(10).unwrap();
        net.drain();
        for _ in 0..4 {
            mine_posted(&alice, &net);
        }
        let report = alice.confirm_owned_coins();
        assert_eq!(report.evicted.len(), 1);
        assert_eq!(alice.pending_balance(), 0);
    }

    #[test]
    fn rotated_addresses_stay_owned() {
        let (alice, _) = client("alice");
        let first = alice.address();
        let second = alice.generate_new_address();
        assert_ne!(first, second);
        assert!(alice.owns_address(&first));
        assert_eq!(alice.address(), second);
    }

    #[test]
    fn foreign_coin_is_refused() {
        let (alice, _) = client("alice");
        let (bob, _) = client("bob");
        let coin = crate::wallet::coin::Coin::random(bob.address(), 5);
        assert_eq!(
            alice.receive_coin(coin.to_opening()),
            Err(ReceiveError::UnboundAddress(bob.address()))
        );
        assert!(bob.receive_coin(coin.to_opening()).is_ok());
        assert_eq!(
            bob.receive_coin(coin.to_opening()),
            Err(ReceiveError::AlreadyHeld)
        );
    }

    #[test]
    fn answers_missing_block_requests() {
        let (alice, net) = client("alice");
        alice.mint(1).unwrap();
        let block = mine_posted(&alice, &net);

        alice
            .handle_message(&GossipMessage::MissingBlock {
                from: "bob".into(),
                missing: block.id,
            })
            .unwrap();
        let sent = net.sent_on(GossipTopic::ProofFound);
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            GossipMessage::ProofFound { block: raw } => {
                assert_eq!(Block::from_bytes(raw).unwrap(), block);
            }
            other => panic!("expected ProofFound, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn spend_moves_value_and_keeps_change() {
        let (alice, net) = client("alice");
        let (bob, _) = client("bob");
        alice.mint(100).unwrap();
        mine_posted(&alice, &net);

        let outcome = alice.spend(bob.address(), 30).await.unwrap();
        assert_eq!(outcome.payment.value(), 30);
        assert_eq!(outcome.change.value(), 70);
        assert!(outcome.transaction.verify_signature().is_ok());

        assert_eq!(alice.get_balance(), 0);
        assert_eq!(alice.pending_balance(), 70);

        mine_posted(&alice, &net);
        assert_eq!(alice.get_balance(), 70);
        assert!(alice
            .owned_coins()
            .iter()
            .all(|c| c.status == CoinStatus::Confirmed));
    }

    #[tokio::test]
    async fn spend_errors_leave_wallet_untouched() {
        let (alice, net) = client("alice");
        alice.mint(10).unwrap();
        alice.mint(10).unwrap();
        mine_posted(&alice, &net);
        assert_eq!(alice.get_balance(), 20);
        let before = alice.owned_coins();

        let to = alice.address();
        assert!(matches!(alice.spend(to, 0).await, Err(SpendError::ZeroAmount)));
        assert!(matches!(
            alice.spend(to, 21).await,
            Err(SpendError::InsufficientFunds { balance: 20, amount: 21 })
        ));
        assert!(matches!(
            alice.spend(to, 15).await,
            Err(SpendError::NoSpendableCoin { amount: 15 })
        ));
        assert_eq!(alice.owned_coins(), before);
        assert!(net.sent().is_empty());
    }

    #[tokio::test]
    async fn spend_from_unbound_address_keeps_the_coin() {
        let (alice, net) = client("alice");
        let stranger = ShieldedKeypair::generate().address();
        let coin = crate::wallet::coin::Coin::random(stranger, 10);
        let mint =
            crate::transaction::MintTransaction::new(coin.cm(), coin.value(), coin.k(), coin.s());
        let mut block = Block::new(&alice.head(), vec![mint.into()], 0);
        block.mine().unwrap();
        alice.receive_block(&block.to_bytes().unwrap()).unwrap();
        assert!(alice.coins.lock().add(coin, CoinStatus::Confirmed));
        net.drain();
        let before = alice.owned_coins();

        let to = alice.address();
        let err = alice.spend(to, 5).await.unwrap_err();
        assert!(matches!(err, SpendError::UnboundAddress(owner) if owner == stranger));
        assert_eq!(alice.owned_coins(), before);
        assert_eq!(alice.get_balance(), 10);
        assert!(net.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_proof_releases_the_coin() {
        let net = Arc::new(LoopbackNetwork::new());
        let alice = ShieldedClient::new("alice", config(), net.clone(), Arc::new(BrokenProver));
        alice.mint(50).unwrap();
        mine_posted(&alice, &net);
        assert_eq!(alice.get_balance(), 50);
        let before = alice.owned_coins();

        let to = alice.address();
        let err = alice.spend(to, 20).await.unwrap_err();
        assert!(matches!(err, SpendError::ProofGenerationFailure(_)));
        assert_eq!(alice.owned_coins(), before);
        assert_eq!(alice.get_balance(), 50);
        assert!(net.posted_transactions().is_empty());
    }

    struct BrokenProver;

    impl SpendProver for BrokenProver {
        fn prove(
            &self,
            _witness: &crate::zkp::circuit::SpendWitness,
        ) -> anyhow::Result<crate::zkp::prover::SpendProof> {
            anyhow::bail!("prover offline")
        }

        fn tree_depth(&self) -> usize {
            DEPTH
        }
    }
}
