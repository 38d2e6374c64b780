//! # Shielded Wallet
//!
//! Local state of one participant: the coins it can open, the keys that can
//! spend them, and the logic that keeps both honest against the chain.
//!
//! ## Architecture
//!
//! ```text
//! coin.rs       Coin, CoinOpening, construction-time validation
//! store.rs      CoinStore: sorted coins, reservations, lifecycle
//! bindings.rs   AddressBindings: a_pk -> a_sk, kept across rotations
//! reconcile.rs  BalanceReconciler: CoinStore vs. the confirmed ledger
//! ```
//!
//! Nothing here is persisted. A restarted wallet starts empty.

pub mod bindings;
pub mod coin;
pub mod reconcile;
pub mod store;

pub use bindings::AddressBindings;
pub use coin::{Coin, CoinError, CoinOpening};
pub use reconcile::BalanceReconciler;
pub use store::{CoinStatus, CoinStore, OwnedCoin, ReconcileReport, Reservation, StoreError};
