//! Minting: new value entering the shielded pool.

use tracing::info;

use super::error::MintError;
use super::ShieldedClient;
use crate::network::gossip::GossipMessage;
use crate::transaction::MintTransaction;
use crate::wallet::coin::Coin;
use crate::wallet::store::CoinStatus;

impl ShieldedClient {
    /// Create a coin worth `value` on the current address and post its mint.
    ///
    /// The coin is held as provisional and does not count towards the
    /// balance until its commitment reaches the confirmed ledger. There is no
    /// proof-of-funds check.
    pub fn mint(&self, value: u64) -> Result<MintTransaction, MintError> {
        if value == 0 {
            return Err(MintError::ZeroValue);
        }

        let owner = self.address();
        let coin = Coin::random(owner, value);
        let tx = MintTransaction::new(coin.cm(), value, coin.k(), coin.s());

        let height = self.chain.read().head().chain_length;
        self.coins
            .lock()
            .add(coin, CoinStatus::Provisional { created_at: height });

        self.network
            .broadcast(GossipMessage::PostTransaction(tx.clone().into()));
        info!(client = %self.name, value, cm = %tx.cm, "mint posted");
        Ok(tx)
    }
}
