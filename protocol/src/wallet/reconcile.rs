//! Balance reconciliation against the confirmed ledger.

use tracing::{debug, info};

use super::store::{CoinStore, ReconcileReport};
use crate::storage::ledger::LedgerSnapshot;

/// Intersects the wallet's coins with the last confirmed ledger.
///
/// Run before every balance query and spend decision so that a coin the
/// network rejected, or a reorg removed, is never counted or selected.
#[derive(Debug, Clone, Copy)]
pub struct BalanceReconciler {
    provisional_expiry_blocks: u64,
}

impl BalanceReconciler {
    /// A reconciler that gives provisional coins and pending spends
    /// `provisional_expiry_blocks` confirmed blocks to appear.
    pub fn new(provisional_expiry_blocks: u64) -> Self {
        Self {
            provisional_expiry_blocks,
        }
    }

    /// Promote, evict, drop and release coins to match `snapshot`.
    pub fn confirm_owned_coins(
        &self,
        store: &mut CoinStore,
        snapshot: &LedgerSnapshot,
    ) -> ReconcileReport {
        let report = store.reconcile(snapshot, self.provisional_expiry_blocks);
        if report.is_empty() {
            debug!(block = %snapshot.block_id(), "coins already reconciled");
        } else {
            info!(
                block = %snapshot.block_id(),
                confirmed = report.confirmed.len(),
                evicted = report.evicted.len(),
                spent = report.spent.len(),
                released = report.released.len(),
                "reconciled owned coins"
            );
        }
        report
    }

    /// Reconcile, then sum the confirmed coins.
    pub fn get_balance(&self, store: &mut CoinStore, snapshot: &LedgerSnapshot) -> u64 {
        self.confirm_owned_coins(store, snapshot);
        store.balance()
    }
}
