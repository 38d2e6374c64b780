//! # Coin Store
//!
//! The wallet's coins, kept sorted by ascending value so that "smallest coin
//! that covers the amount" is a linear scan from the front. Ties keep
//! insertion order, so the oldest of several equal coins is picked first.
//!
//! ## Lifecycle
//!
//! ```text
//!  mint / spend output      seen in confirmed ledger
//!  ─────────────────> Provisional ─────────────────> Confirmed
//!                         │                           │    ^
//!                 expired │            reserve        │    │ release /
//!                         v                           v    │ spend expired
//!                      evicted                  (Reservation)
//!                                                     │ mark_spending
//!                                                     v
//!                      dropped <── nullifier ──── Spending
//!                                  confirmed
//! ```
//!
//! A coin remembers the nullifier of the last spend posted for it, even
//! after that spend expires and the coin is released. If the nullifier
//! later confirms, the coin is dropped whatever its status. Outputs of a
//! spend do not expire while the coin they came from is still held with
//! that nullifier unresolved.
//!
//! A reserved coin is physically removed from the store and lives inside the
//! [`Reservation`] value, so two concurrent spends can never pick it.

use std::collections::HashSet;

use thiserror::Error;

use super::coin::Coin;
use crate::storage::ledger::LedgerSnapshot;
use crate::zkp::commitment::CoinCommitment;
use crate::zkp::nullifier::Nullifier;

/// Where a stored coin is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinStatus {
    /// Created locally (mint or spend output), not yet in the confirmed
    /// ledger. `created_at` is the head's chain length at creation.
    Provisional {
        /// Chain length when the coin was created.
        created_at: u64,
    },
    /// Present in the last confirmed block's ledger. Spendable.
    Confirmed,
    /// Consumed by a posted spend whose nullifier is not yet confirmed.
    Spending {
        /// Nullifier the spend revealed.
        nullifier: Nullifier,
        /// Chain length when the spend was posted.
        submitted_at: u64,
    },
}

/// A coin plus its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedCoin {
    /// The coin.
    pub coin: Coin,
    /// Its lifecycle state.
    pub status: CoinStatus,
    seq: u64,
    revealed: Option<Nullifier>,
    source: Option<Nullifier>,
}

impl OwnedCoin {
    fn new(coin: Coin, status: CoinStatus, seq: u64) -> Self {
        Self {
            coin,
            status,
            seq,
            revealed: None,
            source: None,
        }
    }

    /// Nullifier of the last spend posted for this coin, if any.
    pub fn revealed_nullifier(&self) -> Option<Nullifier> {
        self.revealed
    }

    /// Nullifier of the spend that created this coin, if it is a spend
    /// output this wallet produced.
    pub fn source_nullifier(&self) -> Option<Nullifier> {
        self.source
    }
}

/// Coin-selection failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No single confirmed coin is worth at least the amount.
    #[error("no single confirmed coin covers {amount}")]
    NoSpendableCoin {
        /// Amount requested.
        amount: u64,
    },
}

/// A confirmed coin taken out of the store for a spend in progress.
///
/// Must be handed back through [`CoinStore::release`] or
/// [`CoinStore::mark_spending`]. Dropping it forgets the coin.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a dropped reservation removes the coin from the wallet"]
pub struct Reservation {
    coin: Coin,
    seq: u64,
    revealed: Option<Nullifier>,
}

impl Reservation {
    /// The reserved coin.
    pub fn coin(&self) -> &Coin {
        &self.coin
    }
}

/// What one reconcile pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Provisional coins promoted to confirmed.
    pub confirmed: Vec<CoinCommitment>,
    /// Coins removed because the ledger does not (or no longer) hold them.
    pub evicted: Vec<CoinCommitment>,
    /// Coins dropped because a spend of theirs is confirmed.
    pub spent: Vec<CoinCommitment>,
    /// Spending coins restored because their spend expired.
    pub released: Vec<CoinCommitment>,
}

impl ReconcileReport {
    /// True if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
            && self.evicted.is_empty()
            && self.spent.is_empty()
            && self.released.is_empty()
    }
}

/// Sorted, status-tracking coin collection.
#[derive(Debug, Default)]
pub struct CoinStore {
    coins: Vec<OwnedCoin>,
    next_seq: u64,
}

impl CoinStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `coin` after every coin of lower or equal value. Returns false
    /// if a coin with the same commitment is already held.
    pub fn add(&mut self, coin: Coin, status: CoinStatus) -> bool {
        if self.contains(&coin.cm()) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.insert(OwnedCoin::new(coin, status, seq));
        true
    }

    /// Add a provisional output of our own spend revealing `source`. It is
    /// kept past expiry while the spent coin is still held unresolved.
    pub fn add_output(&mut self, coin: Coin, created_at: u64, source: Nullifier) -> bool {
        if self.contains(&coin.cm()) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let mut owned = OwnedCoin::new(coin, CoinStatus::Provisional { created_at }, seq);
        owned.source = Some(source);
        self.insert(owned);
        true
    }

    /// Smallest confirmed coin worth at least `amount`.
    ///
    /// Fails even when several coins together would cover the amount: a
    /// spend consumes exactly one coin.
    pub fn select_for_amount(&self, amount: u64) -> Result<&Coin, StoreError> {
        self.position_for_amount(amount)
            .map(|i| &self.coins[i].coin)
            .ok_or(StoreError::NoSpendableCoin { amount })
    }

    /// Select and remove in one step.
    pub fn reserve_for_amount(&mut self, amount: u64) -> Result<Reservation, StoreError> {
        let index = self
            .position_for_amount(amount)
            .ok_or(StoreError::NoSpendableCoin { amount })?;
        let owned = self.coins.remove(index);
        Ok(Reservation {
            coin: owned.coin,
            seq: owned.seq,
            revealed: owned.revealed,
        })
    }

    /// Put a reserved coin back as confirmed, in its original place.
    pub fn release(&mut self, reservation: Reservation) {
        let mut owned = OwnedCoin::new(reservation.coin, CoinStatus::Confirmed, reservation.seq);
        owned.revealed = reservation.revealed;
        self.insert(owned);
    }

    /// Park a reserved coin until its spend confirms or expires.
    pub fn mark_spending(&mut self, reservation: Reservation, nullifier: Nullifier, height: u64) {
        let status = CoinStatus::Spending {
            nullifier,
            submitted_at: height,
        };
        let mut owned = OwnedCoin::new(reservation.coin, status, reservation.seq);
        owned.revealed = Some(nullifier);
        self.insert(owned);
    }

    /// Bring every coin's status in line with `snapshot`.
    ///
    /// `expiry` is how many confirmed blocks past its creation a provisional
    /// coin, or a pending spend, may wait.
    pub fn reconcile(&mut self, snapshot: &LedgerSnapshot, expiry: u64) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let confirmed_length = snapshot.chain_length();

        // Spends whose source coin is still in the ledger and not yet spent.
        let unresolved: HashSet<Nullifier> = self
            .coins
            .iter()
            .filter(|c| snapshot.contains(&c.coin.cm()))
            .filter_map(|c| c.revealed)
            .filter(|n| !snapshot.is_spent(n))
            .collect();

        self.coins.retain_mut(|owned| {
            let cm = owned.coin.cm();
            if let Some(nullifier) = owned.revealed {
                if snapshot.is_spent(&nullifier) {
                    report.spent.push(cm);
                    return false;
                }
            }
            match owned.status {
                CoinStatus::Confirmed => {
                    if snapshot.contains(&cm) {
                        true
                    } else {
                        report.evicted.push(cm);
                        false
                    }
                }
                CoinStatus::Provisional { created_at } => {
                    if snapshot.contains(&cm) {
                        owned.status = CoinStatus::Confirmed;
                        report.confirmed.push(cm);
                        true
                    } else if confirmed_length > created_at.saturating_add(expiry) {
                        if owned.source.is_some_and(|n| unresolved.contains(&n)) {
                            return true;
                        }
                        report.evicted.push(cm);
                        false
                    } else {
                        true
                    }
                }
                CoinStatus::Spending { submitted_at, .. } => {
                    if !snapshot.contains(&cm) {
                        report.evicted.push(cm);
                        false
                    } else if confirmed_length > submitted_at.saturating_add(expiry) {
                        owned.status = CoinStatus::Confirmed;
                        report.released.push(cm);
                        true
                    } else {
                        true
                    }
                }
            }
        });
        report
    }

    /// Sum of confirmed values.
    pub fn balance(&self) -> u64 {
        self.sum_where(|s| matches!(s, CoinStatus::Confirmed))
    }

    /// Sum of provisional values.
    pub fn pending_balance(&self) -> u64 {
        self.sum_where(|s| matches!(s, CoinStatus::Provisional { .. }))
    }

    /// Sum of values locked in unconfirmed spends.
    pub fn spending_balance(&self) -> u64 {
        self.sum_where(|s| matches!(s, CoinStatus::Spending { .. }))
    }

    /// True if a coin with commitment `cm` is held (reserved coins excluded).
    pub fn contains(&self, cm: &CoinCommitment) -> bool {
        self.coins.iter().any(|c| c.coin.cm() == *cm)
    }

    /// Status of the coin with commitment `cm`.
    pub fn status(&self, cm: &CoinCommitment) -> Option<CoinStatus> {
        self.coins.iter().find(|c| c.coin.cm() == *cm).map(|c| c.status)
    }

    /// Coins in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = &OwnedCoin> {
        self.coins.iter()
    }

    /// Number of held coins.
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    /// True if no coins are held.
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    fn position_for_amount(&self, amount: u64) -> Option<usize> {
        self.coins
            .iter()
            .position(|c| c.status == CoinStatus::Confirmed && c.coin.value() >= amount)
    }

    fn insert(&mut self, owned: OwnedCoin) {
        let key = (owned.coin.value(), owned.seq);
        let index = self
            .coins
            .partition_point(|c| (c.coin.value(), c.seq) < key);
        self.coins.insert(index, owned);
    }

    fn sum_where(&self, pred: impl Fn(&CoinStatus) -> bool) -> u64 {
        self.coins
            .iter()
            .filter(|c| pred(&c.status))
            .fold(0u64, |acc, c| acc.saturating_add(c.coin.value()))
    }
}
