// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tessera Devnet
//!
//! Entry point for the `tessera-node` binary. Parses CLI arguments,
//! initializes logging, and runs an in-process devnet:
//!
//! 1. every client mints a few coins and waits for confirmation
//! 2. each round, every client pays its neighbour from one confirmed coin
//! 3. optionally, a late client joins and syncs from its peers
//!
//! The final state is printed to stdout as JSON.

mod cli;
mod devnet;
mod logging;
mod miner;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::Rng;
use tokio::task::JoinSet;
use tracing::{info, warn};

use tessera_protocol::zkp::prover::{CircuitCheckProver, Groth16SpendProver, SpendProver};
use tessera_protocol::zkp::verifier::SpendVerifier;

use cli::{Commands, ProverKind, SimulateArgs, TesseraNodeCli};
use devnet::{Devnet, DevnetSummary};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TesseraNodeCli::parse();

    match cli.command {
        Commands::Simulate(args) => {
            logging::init_logging(&args.log_level, LogFormat::from_str_lossy(&args.log_format));
            let summary = simulate(args).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

async fn build_prover(
    kind: ProverKind,
    depth: usize,
) -> Result<(Arc<dyn SpendProver>, Option<SpendVerifier>)> {
    match kind {
        ProverKind::Check => Ok((Arc::new(CircuitCheckProver::new(depth)), None)),
        ProverKind::Groth16 => {
            info!(depth, "running Groth16 setup for the spend circuit");
            let (prover, verifier) = tokio::task::spawn_blocking(move || {
                let mut rng = ark_std::rand::thread_rng();
                Groth16SpendProver::setup(&mut rng, depth)
            })
            .await
            .context("setup task panicked")??;
            Ok((Arc::new(prover), Some(verifier)))
        }
    }
}

async fn simulate(args: SimulateArgs) -> Result<DevnetSummary> {
    if args.clients == 0 {
        bail!("need at least one client");
    }
    if args.mint_value == 0 {
        bail!("mint value must be positive");
    }

    let config = args.client_config();
    info!(
        clients = args.clients,
        rounds = args.rounds,
        prover = ?args.prover,
        ?config,
        "starting devnet"
    );

    let (prover, verifier) = build_prover(args.prover, config.tree_depth).await?;
    let mut net = Devnet::new(config, prover, verifier);
    for i in 0..args.clients {
        net.add_client(format!("client-{i}"), true);
    }

    // --- Mint ---
    for i in 0..args.clients {
        for _ in 0..args.mints {
            net.client(i).mint(args.mint_value)?;
        }
    }
    net.route();
    net.settle()?;
    log_balances(&net, "minted");

    // --- Pay ---
    for round in 1..=args.rounds {
        let mut spends = JoinSet::new();
        for i in 0..args.clients {
            let largest = net.largest_confirmed_coin(i);
            if largest == 0 {
                warn!(round, client = net.client(i).name(), "nothing to spend");
                continue;
            }
            let amount = rand::thread_rng().gen_range(1..=largest.div_ceil(2));
            let payer = Arc::clone(net.client(i));
            let receiver = (i + 1) % args.clients;
            let to = net.client(receiver).address();
            spends.spawn(async move { (receiver, payer.spend(to, amount).await) });
        }

        while let Some(joined) = spends.join_next().await {
            let (receiver, result) = joined.context("spend task panicked")?;
            match result {
                Ok(outcome) => {
                    net.client(receiver)
                        .receive_coin(outcome.payment.to_opening())
                        .context("receiver rejected payment")?;
                }
                Err(e) => warn!(round, error = %e, "spend failed"),
            }
        }

        net.route();
        net.settle()?;
        log_balances(&net, &format!("round {round}"));
    }

    // --- Late joiner ---
    if args.late_joiner {
        let late = net.add_client("late-joiner", false);
        net.join(late)?;
        let head = net.head();
        if net.client(late).head().id != head.id {
            warn!(
                expected = %head.id,
                got = %net.client(late).head().id,
                "late joiner did not reach the head"
            );
        }
    }

    let summary = net.summary();
    let minted = minted_supply(args.mint_value, args.clients, args.mints)?;
    let held: u64 = summary.clients.iter().map(|c| c.balance).sum();
    if held != minted {
        warn!(minted, held, "confirmed balances do not add up to the minted supply");
    }
    Ok(summary)
}

/// Total value the mint phase creates.
fn minted_supply(mint_value: u64, clients: usize, mints: usize) -> Result<u64> {
    clients
        .checked_mul(mints)
        .and_then(|count| u64::try_from(count).ok())
        .and_then(|count| count.checked_mul(mint_value))
        .context("minted supply overflows u64")
}

fn log_balances(net: &Devnet, stage: &str) {
    for i in 0..net.client_count() {
        let client = net.client(i);
        info!(
            stage,
            client = client.name(),
            balance = client.get_balance(),
            pending = client.pending_balance(),
            "balance"
        );
    }
}

fn print_version() {
    println!(
        "tessera-node {} (protocol {})",
        env!("CARGO_PKG_VERSION"),
        tessera_protocol::config::PROTOCOL_VERSION,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_supply_multiplies_out() {
        assert_eq!(minted_supply(100, 3, 2).unwrap(), 600);
        assert_eq!(minted_supply(7, 0, 5).unwrap(), 0);
    }

    #[test]
    fn minted_supply_overflow_is_an_error() {
        assert!(minted_supply(u64::MAX, 2, 1).is_err());
        assert!(minted_supply(1, usize::MAX, 2).is_err());
    }
}
