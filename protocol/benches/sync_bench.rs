// Chain synchronization benchmarks for the Tessera protocol.
//
// Measures block mining at the devnet difficulty, in-order block delivery,
// worst-case orphan draining (a chain delivered back to front) and coin
// store reconciliation against a large confirmed ledger.

use std::collections::HashSet;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tessera_protocol::config::ClientConfig;
use tessera_protocol::crypto::keys::ShieldedKeypair;
use tessera_protocol::network::gossip::LoopbackNetwork;
use tessera_protocol::network::sync::ChainSync;
use tessera_protocol::storage::block::Block;
use tessera_protocol::storage::ledger::LedgerSnapshot;
use tessera_protocol::transaction::{MintTransaction, ShieldedTransaction};
use tessera_protocol::wallet::coin::Coin;
use tessera_protocol::wallet::store::{CoinStatus, CoinStore};

const DIFFICULTY: u32 = 8;

fn mint_txs(coins: &[Coin]) -> Vec<ShieldedTransaction> {
    coins
        .iter()
        .map(|c| MintTransaction::new(c.cm(), c.value(), c.k(), c.s()).into())
        .collect()
}

/// `len` mined blocks on top of genesis, each carrying one mint.
fn build_chain(len: usize) -> Vec<Block> {
    let owner = ShieldedKeypair::generate().address();
    let mut chain = vec![Block::genesis()];
    for i in 1..=len {
        let coin = Coin::random(owner, i as u64);
        let mut block = Block::new_at(&chain[i - 1], mint_txs(&[coin]), DIFFICULTY, i as u64);
        block.mine().unwrap();
        chain.push(block);
    }
    chain
}

fn fresh_sync() -> ChainSync {
    let config = ClientConfig {
        difficulty_bits: DIFFICULTY,
        ..ClientConfig::default()
    };
    ChainSync::new("bench", config, Arc::new(LoopbackNetwork::new()))
}

fn bench_mining(c: &mut Criterion) {
    let genesis = Block::genesis();
    let mut nonce_seed = 0u64;
    c.bench_function("sync/mine_block_8bits", |b| {
        b.iter(|| {
            nonce_seed += 1;
            let mut block = Block::new_at(&genesis, vec![], DIFFICULTY, nonce_seed);
            block.mine().unwrap()
        });
    });
}

fn bench_receive(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync/receive");
    for len in [16usize, 64] {
        let chain = build_chain(len);
        let raw: Vec<Vec<u8>> = chain[1..].iter().map(|b| b.to_bytes().unwrap()).collect();
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("in_order", len), &raw, |b, raw| {
            b.iter(|| {
                let mut sync = fresh_sync();
                for block in raw {
                    sync.receive_block(block).unwrap();
                }
                sync
            });
        });

        group.bench_with_input(BenchmarkId::new("reversed", len), &raw, |b, raw| {
            b.iter(|| {
                let mut sync = fresh_sync();
                for block in raw.iter().rev() {
                    sync.receive_block(block).unwrap();
                }
                sync
            });
        });
    }
    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let owner = ShieldedKeypair::generate().address();
    let coins: Vec<Coin> = (1..=1_000).map(|v| Coin::random(owner, v)).collect();
    let block = Block::new_at(&Block::genesis(), mint_txs(&coins), 0, 1);
    let snapshot = LedgerSnapshot::new(&block, HashSet::new());

    c.bench_function("sync/reconcile_1000_coins", |b| {
        b.iter(|| {
            let mut store = CoinStore::new();
            for coin in &coins {
                store.add(coin.clone(), CoinStatus::Provisional { created_at: 0 });
            }
            store.reconcile(&snapshot, 6)
        });
    });
}

criterion_group!(benches, bench_mining, bench_receive, bench_reconcile);
criterion_main!(benches);
