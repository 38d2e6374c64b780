//! # Toy Miner
//!
//! Collects posted transactions, drops the ones that do not check out, and
//! mines them into the next block on its own chain.
//!
//! ```text
//! SUBMIT  mint: commitment opening   spend: signature, proof*, fresh nullifier
//! BUILD   Block::new(head, pool) carries the grown commitment ledger
//! MINE    nonce search until the id meets the difficulty
//! ```
//!
//! `*` Proofs are only checked when a Groth16 verifier is available. The
//! constraint-checking prover emits digests that no verifier accepts.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use tessera_protocol::storage::block::Block;
use tessera_protocol::transaction::{ShieldedTransaction, TxId};
use tessera_protocol::zkp::nullifier::Nullifier;
use tessera_protocol::zkp::verifier::SpendVerifier;

/// A single in-process miner. The devnet has exactly one, so its chain is
/// the canonical one.
pub struct ToyMiner {
    head: Block,
    difficulty_bits: u32,
    verifier: Option<SpendVerifier>,
    pool: Vec<ShieldedTransaction>,
    pooled: HashSet<TxId>,
    spent: HashSet<Nullifier>,
}

impl ToyMiner {
    /// A miner sitting on genesis.
    pub fn new(difficulty_bits: u32, verifier: Option<SpendVerifier>) -> Self {
        Self {
            head: Block::genesis(),
            difficulty_bits,
            verifier,
            pool: Vec::new(),
            pooled: HashSet::new(),
            spent: HashSet::new(),
        }
    }

    /// The tip of the miner's chain.
    pub fn head(&self) -> &Block {
        &self.head
    }

    /// Transactions waiting for the next block.
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Validate a posted transaction and queue it.
    pub fn submit(&mut self, tx: ShieldedTransaction) -> Result<()> {
        let id = tx.id();
        if self.pooled.contains(&id) {
            bail!("transaction {id} already pooled");
        }

        match &tx {
            ShieldedTransaction::Mint(mint) => mint.verify().context("invalid mint")?,
            ShieldedTransaction::Spend(spend) => {
                if self.spent.contains(&spend.nullifier)
                    || self.pool.iter().any(|p| p.nullifier() == Some(spend.nullifier))
                {
                    bail!("double spend of {}", spend.nullifier);
                }
                match &self.verifier {
                    Some(verifier) => spend.verify(verifier).context("invalid spend")?,
                    None => spend.verify_signature().context("invalid spend signature")?,
                }
            }
        }

        debug!(tx = %id, kind = tx.kind(), "transaction pooled");
        self.pooled.insert(id);
        self.pool.push(tx);
        Ok(())
    }

    /// Mine every pooled transaction into a new head. An empty pool yields
    /// an empty block, which still advances confirmation.
    pub fn mine_block(&mut self) -> Result<Block> {
        let transactions = std::mem::take(&mut self.pool);
        self.pooled.clear();

        let mut block = Block::new(&self.head, transactions, self.difficulty_bits);
        let attempts = block.mine().context("nonce search failed")?;

        for tx in &block.transactions {
            if let Some(nullifier) = tx.nullifier() {
                self.spent.insert(nullifier);
            }
        }

        info!(
            block = %block.id,
            chain_length = block.chain_length,
            txs = block.tx_count(),
            ledger = block.cm_ledger.len(),
            attempts,
            "block mined"
        );
        self.head = block.clone();
        Ok(block)
    }
}
