// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tessera Protocol: Shielded Coin Client
//!
//! Client-side logic for a privacy-preserving currency on a proof-of-work
//! chain. A participant mints value into coins, spends a coin by proving in
//! zero knowledge that it owns *some* coin on the ledger without saying which,
//! and tracks its spendable balance while blocks arrive in any order.
//!
//! ## Architecture
//!
//! - **crypto**: BLAKE3/SHA-256, Poseidon over BN254, role-tagged PRFs, keys.
//! - **zkp**: commitments, nullifiers, the ledger Merkle tree, the spend
//!   circuit, and the prover/verifier pair.
//! - **transaction**: mint and spend transactions and their envelope.
//! - **storage**: blocks with full ledger snapshots, the confirmed view.
//! - **network**: the gossip seam and [`network::ChainSync`].
//! - **wallet**: coins, the coin store, address bindings, reconciliation.
//! - **client**: [`client::ShieldedClient`], which owns all of the above.
//! - **config**: protocol constants and [`config::ClientConfig`].
//!
//! ## Design Philosophy
//!
//! 1. A coin counts only once the confirmed ledger says so.
//! 2. Every failure path leaves the wallet as it was.
//! 3. The prover is a seam. Tests run the circuit without a SNARK; the devnet
//!    can switch to real Groth16 proofs with one flag.

pub mod client;
pub mod config;
pub mod crypto;
pub mod network;
pub mod storage;
pub mod transaction;
pub mod wallet;
pub mod zkp;

pub use client::{MintError, ReceiveError, ShieldedClient, SpendError, SpendOutcome};
pub use config::ClientConfig;
