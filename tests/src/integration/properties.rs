//! # Scheduling Properties
//!
//! Rules every node must agree on, checked over generated validator sets,
//! heights and entropy draws.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    use parlia_consensus::adapters::{FailingEntropy, FixedEntropy};
    use parlia_consensus::domain::{time_until, FIXED_BACKOFF};
    use parlia_consensus::test_helpers::TestChain;
    use parlia_consensus::{
        BackoffCalculator, BackoffConfig, ConsensusApi, EngineDependencies, EntropySource, Fork,
        ForkActivation, ForkGate, ForkSchedule, ParliaConfig, ParliaEngine, Snapshot,
        TurnScheduler, TurnStatus, ValidatorSet,
    };
    use shared_types::{Address, BlockHeader, DIFF_IN_TURN, DIFF_NO_TURN};

    fn address(i: u16) -> Address {
        let mut a = [0u8; 20];
        a[..2].copy_from_slice(&i.to_be_bytes());
        a
    }

    fn snapshot(n: u16) -> Snapshot {
        Snapshot::new(0, [0u8; 32], ValidatorSet::new((0..n).map(address)))
    }

    fn calculator(fork_at: Option<u64>, entropy: Arc<dyn EntropySource>) -> BackoffCalculator {
        let schedule = match fork_at {
            Some(at) => ForkSchedule::new().with(Fork::Ramanujan, ForkActivation::Block(at)),
            None => ForkSchedule::new(),
        };
        BackoffCalculator::new(ForkGate::new(schedule), 3, BackoffConfig::default(), entropy)
    }

    fn header(number: u64, time: u64, difficulty: u64) -> BlockHeader {
        BlockHeader {
            number,
            time,
            difficulty,
            ..Default::default()
        }
    }

    /// Two nodes replaying the same headers from genesis, each with a cold
    /// cache, must hold identical snapshots, byte for byte once serialized.
    #[test]
    fn snapshot_derivation_is_deterministic_across_nodes() {
        let config = ParliaConfig {
            epoch: 4,
            ..Default::default()
        };
        let chain = TestChain::with_config(5, config.clone(), Arc::new(FailingEntropy));

        // Shrink the set to three validators at the first epoch boundary
        let before = chain.extend(&chain.genesis, 3);
        let parent = before.last().unwrap();
        let next: Vec<Address> = chain.addresses().into_iter().take(3).collect();
        let signer = chain.in_turn_signer(parent).clone();
        let boundary = chain.build(parent, &signer, parent.time + 3, DIFF_IN_TURN, Some(&next));
        chain.store.insert(boundary.clone());
        let after = chain.extend(&boundary, 7);
        let tip = after.last().unwrap();

        let node = |config: &ParliaConfig| {
            let deps = EngineDependencies::production(chain.store.clone(), config);
            ParliaEngine::new(config.clone(), deps).unwrap()
        };
        let a = node(&config).snapshot(tip.number, &tip.hash()).unwrap();
        let b = node(&config).snapshot(tip.number, &tip.hash()).unwrap();

        assert_eq!(a.number(), 11);
        assert_eq!(a.validators().as_slice(), next.as_slice());
        assert_eq!(*a, *b);
        assert_eq!(
            serde_json::to_vec(&*a).unwrap(),
            serde_json::to_vec(&*b).unwrap()
        );
    }

    proptest! {
        #[test]
        fn exactly_one_validator_in_turn(n in 1u16..64, number in any::<u64>()) {
            let snap = snapshot(n);
            let in_turn = (0..n)
                .filter(|i| {
                    TurnScheduler::expected_difficulty(&snap, number, &address(*i)) == TurnStatus::InTurn
                })
                .count();
            prop_assert_eq!(in_turn, 1);
        }

        #[test]
        fn rotation_distance_is_a_permutation(n in 1u16..64, number in any::<u64>()) {
            let snap = snapshot(n);
            let mut distances: Vec<u64> = (0..n)
                .map(|i| TurnScheduler::rotation_distance(&snap, number, &address(i)).unwrap())
                .collect();
            distances.sort_unstable();
            prop_assert_eq!(distances, (0..n as u64).collect::<Vec<_>>());
        }

        #[test]
        fn post_fork_backoff_is_deterministic_and_monotone(
            n in 2u16..64,
            number in 1u64..1_000_000,
            seed_a in any::<u64>(),
            seed_b in any::<u64>(),
        ) {
            let snap = snapshot(n);
            let node_a = calculator(Some(0), Arc::new(FixedEntropy::new(seed_a)));
            let node_b = calculator(Some(0), Arc::new(FixedEntropy::new(seed_b)));

            let mut by_distance: Vec<(u64, u64)> = (0..n)
                .map(|i| {
                    let proposer = address(i);
                    let a = node_a.back_off_time(&snap, number, &proposer);
                    let b = node_b.back_off_time(&snap, number, &proposer);
                    assert_eq!(a, b);
                    (TurnScheduler::rotation_distance(&snap, number, &proposer).unwrap(), a)
                })
                .collect();
            by_distance.sort_unstable();

            prop_assert_eq!(by_distance[0], (0, 0));
            for pair in by_distance.windows(2) {
                prop_assert!(pair[1].1 > pair[0].1);
            }
        }

        #[test]
        fn post_fork_verification_boundary(n in 1u16..32, parent_time in 0u64..1_000_000, pick in any::<u16>()) {
            let snap = snapshot(n);
            let calc = calculator(Some(0), Arc::new(FailingEntropy));
            let proposer = address(pick % n);
            let parent = header(0, parent_time, DIFF_IN_TURN);

            let mut probe = header(1, parent_time + 3, DIFF_NO_TURN);
            probe.coinbase = proposer;
            let earliest = calc.block_time(&snap, &probe, &parent, &proposer);

            probe.time = earliest;
            prop_assert!(calc.verify_block_time(&snap, &probe, &parent, 0).is_ok());
            probe.time = earliest - 1;
            prop_assert!(calc.verify_block_time(&snap, &probe, &parent, 0).unwrap_err().is_transient());
        }

        #[test]
        fn pre_fork_no_turn_delay_bound(draw in any::<u64>(), header_time in 0u64..10_000, now_ms in 0u64..10_000_000) {
            let snap = snapshot(21);
            let calc = calculator(None, Arc::new(FixedEntropy::new(draw)));
            let h = header(100, header_time, DIFF_NO_TURN);

            let added = calc.delay_for_fork(&snap, &h, now_ms) - time_until(header_time, now_ms);
            prop_assert!(added >= Duration::from_millis(200));
            prop_assert!(added < Duration::from_millis(5_700));
        }

        #[test]
        fn pre_fork_in_turn_delay_is_time_until(draw in any::<u64>(), header_time in 0u64..10_000, now_ms in 0u64..10_000_000) {
            let snap = snapshot(21);
            let calc = calculator(None, Arc::new(FixedEntropy::new(draw)));
            let h = header(100, header_time, DIFF_IN_TURN);

            prop_assert_eq!(calc.delay_for_fork(&snap, &h, now_ms), time_until(header_time, now_ms));
        }

        #[test]
        fn entropy_failure_substitutes_fixed_backoff_for_wiggle(n in 1u16..64, header_time in 0u64..10_000, now_ms in 0u64..10_000_000) {
            let snap = snapshot(n);
            let calc = calculator(None, Arc::new(FailingEntropy));
            let h = header(100, header_time, DIFF_NO_TURN);

            prop_assert_eq!(
                calc.delay_for_fork(&snap, &h, now_ms),
                time_until(header_time, now_ms) + FIXED_BACKOFF + FIXED_BACKOFF
            );
        }

        #[test]
        fn fork_gate_is_monotone(activation in 0u64..1_000, a in 0u64..2_000, b in 0u64..2_000) {
            let gate = ForkGate::new(
                ForkSchedule::new().with(Fork::Ramanujan, ForkActivation::Block(activation)),
            );
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            if gate.is_ramanujan(low, 0) {
                prop_assert!(gate.is_ramanujan(high, 0));
            }
        }
    }
}
