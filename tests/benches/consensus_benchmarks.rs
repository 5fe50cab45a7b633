//! # Parlia Consensus Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Header verification (21 validators) | < 1ms |
//! | Snapshot derivation from genesis | linear in replayed headers |
//! | Post-fork block time | < 1µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parlia_consensus::adapters::{FailingEntropy, LruSnapshotCache};
use parlia_consensus::test_helpers::{TestChain, GENESIS_TIME};
use parlia_consensus::{
    ConsensusApi, EngineDependencies, Fork, ForkActivation, ForkSchedule, HeaderSigner,
    ParliaConfig, ParliaEngine,
};
use std::sync::Arc;
use std::time::Duration;

fn post_fork_chain(validators: usize) -> TestChain {
    let forks = ForkSchedule::new().with(Fork::Ramanujan, ForkActivation::Block(0));
    TestChain::new(validators, forks, Arc::new(FailingEntropy))
}

fn bench_verify_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("parlia-verify-header");
    group.measurement_time(Duration::from_secs(5));

    for validators in [7usize, 21, 41] {
        let chain = post_fork_chain(validators);
        let signer = chain.in_turn_signer(&chain.genesis).clone();
        let header = chain.child(&chain.genesis, &signer, GENESIS_TIME + 3);
        // Warm the parent snapshot
        chain.engine.verify_header(&header).unwrap();

        group.bench_with_input(BenchmarkId::new("in_turn", validators), &header, |b, h| {
            b.iter(|| black_box(chain.engine.verify_header(h).is_ok()))
        });
    }

    group.finish();
}

fn bench_snapshot_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("parlia-snapshot-derivation");
    group.measurement_time(Duration::from_secs(10));

    let chain = post_fork_chain(21);
    let blocks = chain.extend(&chain.genesis, 256);

    for depth in [16usize, 64, 256] {
        let tip = blocks[depth - 1].clone();
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::new("cold_cache", depth), &tip, |b, tip| {
            b.iter(|| {
                // Fresh cache each run so every lookup replays from genesis
                let config = ParliaConfig {
                    forks: chain.engine.config().forks.clone(),
                    ..Default::default()
                };
                let deps = EngineDependencies {
                    store: Arc::new(LruSnapshotCache::new(4)),
                    ..EngineDependencies::production(chain.store.clone(), &config)
                };
                let engine = ParliaEngine::new(config, deps).unwrap();
                black_box(engine.snapshot(tip.number, &tip.hash()).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_block_time(c: &mut Criterion) {
    let chain = post_fork_chain(21);
    let proposer = chain.no_turn_signer(&chain.genesis, 10).address();
    chain.engine.block_time(&chain.genesis, &proposer).unwrap();

    c.bench_function("parlia-block-time/distance_10", |b| {
        b.iter(|| black_box(chain.engine.block_time(&chain.genesis, &proposer).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_verify_header,
    bench_snapshot_derivation,
    bench_block_time
);
criterion_main!(benches);
