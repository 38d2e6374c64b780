//! Spending: one confirmed coin in, a payment and a change coin out.
//!
//! ```text
//! reconcile ─> balance check ─> reserve coin ─> look up a_sk
//!     ─> nullifier, outputs, hSig, h_ ─> Merkle path under the anchor
//!     ─> prove (blocking pool, no locks held)
//!     ─> sign, broadcast, park source coin, keep own outputs
//! ```
//!
//! Any failure after the reservation hands the coin back, so a failed spend
//! leaves the wallet exactly as it found it.

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use tracing::{debug, info, warn};

use super::error::SpendError;
use super::ShieldedClient;
use crate::crypto::keys::{generate_one_time_signing_key, PublicAddress, SpendingKey};
use crate::crypto::prf::{prf, PrfRole};
use crate::network::gossip::GossipMessage;
use crate::storage::ledger::LedgerSnapshot;
use crate::transaction::{h_sig_of, SpendTransaction};
use crate::wallet::coin::Coin;
use crate::wallet::store::Reservation;
use crate::zkp::circuit::{SpendPublicInputs, SpendWitness};
use crate::zkp::nullifier::Nullifier;

/// Result of a successful spend.
#[derive(Debug, Clone)]
pub struct SpendOutcome {
    /// The transaction as broadcast.
    pub transaction: SpendTransaction,
    /// Payment output. Its opening goes to the receiver out of band.
    pub payment: Coin,
    /// Change output, owned by the spender. May be worth zero.
    pub change: Coin,
}

/// Everything assembled before proving, kept together so the reservation
/// can be returned on failure.
struct PreparedSpend {
    reservation: Reservation,
    nullifier: Nullifier,
    payment: Coin,
    change: Coin,
    signing_key: SigningKey,
    witness: SpendWitness,
}

impl ShieldedClient {
    /// Pay `amount` to `receiver` from a single confirmed coin.
    pub async fn spend(
        &self,
        receiver: PublicAddress,
        amount: u64,
    ) -> Result<SpendOutcome, SpendError> {
        if amount == 0 {
            return Err(SpendError::ZeroAmount);
        }

        // chain -> coins: one critical section for reconcile, check, reserve.
        let (snapshot, height, reservation) = {
            let chain = self.chain.read();
            let snapshot = chain.snapshot();
            let height = chain.head().chain_length;
            let mut coins = self.coins.lock();

            let balance = self.reconciler.get_balance(&mut coins, &snapshot);
            if balance < amount {
                return Err(SpendError::InsufficientFunds { balance, amount });
            }
            let reservation = coins.reserve_for_amount(amount)?;
            (snapshot, height, reservation)
        };
        debug!(
            client = %self.name,
            amount,
            source = reservation.coin().value(),
            "coin reserved"
        );

        let prepared = match self.prepare(reservation, receiver, amount, &snapshot) {
            Ok(prepared) => prepared,
            Err((reservation, e)) => {
                self.coins.lock().release(reservation);
                return Err(e);
            }
        };

        let prover = Arc::clone(&self.prover);
        let witness = prepared.witness.clone();
        let proved = tokio::task::spawn_blocking(move || prover.prove(&witness)).await;

        let proof = match proved {
            Ok(Ok(proof)) => proof,
            Ok(Err(e)) => return Err(self.abandon(prepared, format!("{e:#}"))),
            Err(join) => return Err(self.abandon(prepared, join.to_string())),
        };

        let transaction =
            SpendTransaction::new_signed(&prepared.witness.public, proof, &prepared.signing_key);
        self.network
            .broadcast(GossipMessage::PostTransaction(transaction.clone().into()));

        {
            let mut coins = self.coins.lock();
            let addresses = self.addresses.read();
            coins.mark_spending(prepared.reservation, prepared.nullifier, height);
            for output in [&prepared.payment, &prepared.change] {
                if addresses.contains(&output.owner()) {
                    coins.add_output(output.clone(), height, prepared.nullifier);
                }
            }
        }

        info!(
            client = %self.name,
            amount,
            change = prepared.change.value(),
            nullifier = %prepared.nullifier,
            "spend posted"
        );

        Ok(SpendOutcome {
            transaction,
            payment: prepared.payment,
            change: prepared.change,
        })
    }

    /// Derive everything the proof needs. Hands the reservation back on
    /// failure.
    fn prepare(
        &self,
        reservation: Reservation,
        receiver: PublicAddress,
        amount: u64,
        snapshot: &LedgerSnapshot,
    ) -> Result<PreparedSpend, (Reservation, SpendError)> {
        let source = reservation.coin().clone();

        let (key, change_owner): (SpendingKey, PublicAddress) = {
            let addresses = self.addresses.read();
            match addresses.spending_key_for(&source.owner()) {
                Some(key) => (key.clone(), addresses.current_address()),
                None => {
                    warn!(client = %self.name, owner = %source.owner(), "coin has no bound key");
                    return Err((reservation, SpendError::UnboundAddress(source.owner())));
                }
            }
        };

        let depth = self.prover.tree_depth();
        let path = snapshot
            .position(&source.cm())
            .ok_or_else(|| "selected coin is not in the confirmed ledger".to_string())
            .and_then(|index| {
                let tree = snapshot.merkle_tree(depth).map_err(|e| e.to_string())?;
                let path = tree
                    .path(index)
                    .ok_or_else(|| "no Merkle path for selected coin".to_string())?;
                Ok((tree.root(), path))
            });
        let (anchor, path) = match path {
            Ok(found) => found,
            Err(msg) => return Err((reservation, SpendError::ProofGenerationFailure(msg))),
        };

        let nullifier = source.nullifier(&key);
        let payment = Coin::random(receiver, amount);
        let change = Coin::random(change_owner, source.value() - amount);

        let signing_key = generate_one_time_signing_key();
        let h_sig = h_sig_of(&signing_key.verifying_key());
        let h_ = prf(PrfRole::PublicKey, key.as_field(), &h_sig);

        let witness = SpendWitness {
            public: SpendPublicInputs {
                anchor,
                nullifier: nullifier.to_field(),
                cm_new1: payment.cm().to_field(),
                cm_new2: change.cm().to_field(),
                h_sig,
                h_,
            },
            spending_key: *key.as_field(),
            old_rho: *source.rho(),
            old_value: source.value(),
            old_s: *source.s(),
            path,
            new1: payment.output_opening(),
            new2: change.output_opening(),
        };

        Ok(PreparedSpend {
            reservation,
            nullifier,
            payment,
            change,
            signing_key,
            witness,
        })
    }

    fn abandon(&self, prepared: PreparedSpend, reason: String) -> SpendError {
        warn!(client = %self.name, %reason, "proof generation failed, releasing coin");
        self.coins.lock().release(prepared.reservation);
        SpendError::ProofGenerationFailure(reason)
    }
}
