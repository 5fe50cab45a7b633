//! # Rotation, Backoff and Epoch Scenarios
//!
//! End-to-end runs over a signed chain with real secp256k1 keys:
//!
//! - **A**: pre-fork no-turn production delay (fixed backoff + jitter)
//! - **B**: post-fork minimum block time enforced on import
//! - **C**: anti-repeat window rejects back-to-back signing
//! - **D**: epoch-boundary validator-set replacement resizes the window
//! - Sealer race: the in-turn block lands first and the no-turn slot is abandoned

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, watch};

    use parlia_consensus::adapters::{ChannelBroadcaster, FailingEntropy, FixedEntropy, K256Signer, OsEntropy};
    use parlia_consensus::test_helpers::{TestChain, GENESIS_TIME};
    use parlia_consensus::{
        ConsensusApi, ConsensusError, ErrorKind, Fork, ForkActivation, ForkSchedule, HeaderSigner,
        ParliaConfig, SealOutcome, Sealer, TurnScheduler, TurnStatus,
    };
    use shared_types::{Address, BlockHeader, DIFF_IN_TURN, DIFF_NO_TURN};

    use crate::init_tracing;

    const PERIOD: u64 = 3;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn ramanujan_at_genesis() -> ForkSchedule {
        ForkSchedule::new().with(Fork::Ramanujan, ForkActivation::Block(0))
    }

    /// Sealer plus the receiving end of its broadcast channel.
    fn sealer_for(chain: &TestChain, signer: &K256Signer) -> (Sealer, mpsc::Receiver<BlockHeader>) {
        let (broadcaster, rx) = ChannelBroadcaster::new(8);
        let sealer = Sealer::new(chain.engine.clone(), Arc::new(signer.clone()), Arc::new(broadcaster));
        (sealer, rx)
    }

    fn sorted_signers(count: usize) -> Vec<K256Signer> {
        let mut signers: Vec<K256Signer> = (0..count).map(|_| K256Signer::random()).collect();
        signers.sort_by_key(|s| s.address());
        signers
    }

    // =========================================================================
    // SCENARIO A: pre-fork no-turn delay
    // =========================================================================

    #[test]
    fn scenario_a_pre_fork_no_turn_delay_is_bounded() {
        init_tracing();
        let chain = TestChain::new(21, ForkSchedule::new(), Arc::new(OsEntropy::new()));
        // Fifth validator in rotation order, four positions after the in-turn slot
        let local = chain.no_turn_signer(&chain.genesis, 4).clone();
        let (sealer, _rx) = sealer_for(&chain, &local);

        let header = sealer.prepare(&chain.genesis).unwrap();
        assert_eq!(header.difficulty, DIFF_NO_TURN);
        assert_eq!(header.time, GENESIS_TIME + PERIOD);

        for _ in 0..200 {
            let delay = chain.engine.seal_delay(&header).unwrap();
            // time_until(1003) = 3s, then 200ms fixed + r where r in [0, 5500ms)
            assert!(delay >= Duration::from_millis(3_200), "delay {delay:?}");
            assert!(delay < Duration::from_millis(3_000 + 200 + 5_500), "delay {delay:?}");
        }
    }

    #[test]
    fn scenario_a_jitter_is_added_verbatim() {
        let chain = TestChain::new(21, ForkSchedule::new(), Arc::new(FixedEntropy::new(5_499)));
        let local = chain.no_turn_signer(&chain.genesis, 4).clone();
        let (sealer, _rx) = sealer_for(&chain, &local);
        let header = sealer.prepare(&chain.genesis).unwrap();

        assert_eq!(
            chain.engine.seal_delay(&header).unwrap(),
            Duration::from_millis(3_000 + 200 + 5_499)
        );
    }

    #[test]
    fn scenario_a_entropy_failure_uses_fixed_backoff() {
        let chain = TestChain::new(21, ForkSchedule::new(), Arc::new(FailingEntropy));
        let local = chain.no_turn_signer(&chain.genesis, 4).clone();
        let (sealer, _rx) = sealer_for(&chain, &local);
        let header = sealer.prepare(&chain.genesis).unwrap();

        for _ in 0..20 {
            assert_eq!(
                chain.engine.seal_delay(&header).unwrap(),
                // fixed 200ms plus the 200ms stand-in for the failed draw
                Duration::from_millis(3_000 + 200 + 200)
            );
        }
    }

    #[test]
    fn scenario_a_in_turn_has_no_backoff() {
        let chain = TestChain::new(21, ForkSchedule::new(), Arc::new(OsEntropy::new()));
        let local = chain.in_turn_signer(&chain.genesis).clone();
        let (sealer, _rx) = sealer_for(&chain, &local);
        let header = sealer.prepare(&chain.genesis).unwrap();

        assert_eq!(header.difficulty, DIFF_IN_TURN);
        assert_eq!(chain.engine.seal_delay(&header).unwrap(), Duration::from_secs(3));
    }

    // =========================================================================
    // SCENARIO B: post-fork minimum block time
    // =========================================================================

    #[test]
    fn scenario_b_in_turn_boundary() {
        init_tracing();
        let chain = TestChain::new(21, ramanujan_at_genesis(), Arc::new(FailingEntropy));
        let in_turn = chain.in_turn_signer(&chain.genesis).clone();

        let on_time = chain.child(&chain.genesis, &in_turn, GENESIS_TIME + PERIOD);
        let verified = chain.engine.verify_header(&on_time).unwrap();
        assert_eq!(verified.turn, TurnStatus::InTurn);

        let early = chain.child(&chain.genesis, &in_turn, GENESIS_TIME + PERIOD - 1);
        let err = chain.engine.verify_header(&early).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FutureBlock);
        assert!(err.is_transient());
    }

    #[test]
    fn scenario_b_every_proposer_respects_its_stagger() {
        let chain = TestChain::new(21, ramanujan_at_genesis(), Arc::new(FailingEntropy));

        for distance in 0..21u64 {
            let proposer = chain.no_turn_signer(&chain.genesis, distance).clone();
            let earliest = chain
                .engine
                .block_time(&chain.genesis, &proposer.address())
                .unwrap();
            let stagger = if distance == 0 { 0 } else { distance };
            assert_eq!(earliest, GENESIS_TIME + PERIOD + stagger);

            let accepted = chain.child(&chain.genesis, &proposer, earliest);
            assert!(chain.engine.verify_header(&accepted).is_ok(), "distance {distance}");

            // Below the base period every proposer is premature
            let premature = chain.child(&chain.genesis, &proposer, GENESIS_TIME + PERIOD - 1);
            assert!(matches!(
                chain.engine.verify_header(&premature),
                Err(ConsensusError::FutureBlock { .. })
            ));

            let short = chain.child(&chain.genesis, &proposer, earliest - 1);
            assert!(chain.engine.verify_header(&short).unwrap_err().is_transient());
        }
    }

    #[test]
    fn scenario_b_independent_nodes_agree_on_block_time() {
        let node_a = TestChain::new(21, ramanujan_at_genesis(), Arc::new(OsEntropy::new()));
        let proposer = node_a.no_turn_signer(&node_a.genesis, 7).clone();
        let header = node_a.child(&node_a.genesis, &proposer, GENESIS_TIME + 50);

        // A second engine over the same headers with different entropy
        let config = ParliaConfig {
            forks: ramanujan_at_genesis(),
            ..Default::default()
        };
        let deps = parlia_consensus::EngineDependencies {
            entropy: Arc::new(FixedEntropy::new(3)),
            ..parlia_consensus::EngineDependencies::production(node_a.store.clone(), &config)
        };
        let node_b = parlia_consensus::ParliaEngine::new(config, deps).unwrap();

        let a = node_a.engine.block_time(&node_a.genesis, &proposer.address()).unwrap();
        let b = node_b.block_time(&node_a.genesis, &proposer.address()).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            node_a.engine.verify_header(&header).map(|v| v.signer),
            node_b.verify_header(&header).map(|v| v.signer)
        );
    }

    // =========================================================================
    // SCENARIO C: anti-repeat window
    // =========================================================================

    #[test]
    fn scenario_c_back_to_back_signing_rejected() {
        init_tracing();
        let chain = TestChain::new(21, ForkSchedule::new(), Arc::new(FailingEntropy));
        let block1 = chain.extend(&chain.genesis, 1).remove(0);
        let repeat_signer = chain.signer_of(&block1).clone();

        let block2 = chain.child(&block1, &repeat_signer, block1.time + PERIOD);
        assert_eq!(block2.difficulty, DIFF_NO_TURN);

        let snap1 = chain.engine.snapshot(1, &block1.hash()).unwrap();
        assert_eq!(snap1.validators().recents_limit(), 11);

        let err = chain
            .engine
            .snapshots()
            .apply(&snap1, std::slice::from_ref(&block2))
            .unwrap_err();
        assert_eq!(
            err,
            ConsensusError::RecentlySigned {
                number: 2,
                signer: repeat_signer.address(),
                recent_block: 1
            }
        );

        let err = chain.engine.verify_header(&block2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecentlySigned);
    }

    #[test]
    fn scenario_c_window_reopens_after_eleven_blocks() {
        let chain = TestChain::new(21, ForkSchedule::new(), Arc::new(FailingEntropy));
        let blocks = chain.extend(&chain.genesis, 11);
        let first_signer = blocks[0].coinbase;
        let tip = blocks.last().unwrap();

        let snap = chain.engine.snapshot(tip.number, &tip.hash()).unwrap();
        assert_eq!(snap.recently_signed(11, &first_signer), Some(1));
        assert_eq!(snap.recently_signed(12, &first_signer), None);

        let signer = chain.signer_by_address(&first_signer).clone();
        let again = chain.child(tip, &signer, tip.time + PERIOD);
        assert!(chain.engine.verify_header(&again).is_ok());
    }

    // =========================================================================
    // SCENARIO D: epoch-boundary validator-set replacement
    // =========================================================================

    fn epoch_chain(validators: usize) -> TestChain {
        let config = ParliaConfig {
            epoch: 4,
            ..Default::default()
        };
        TestChain::with_config(validators, config, Arc::new(FailingEntropy))
    }

    fn rotate_at_epoch(chain: &TestChain, next: &[K256Signer]) -> BlockHeader {
        let before = chain.extend(&chain.genesis, 3);
        let parent = before.last().unwrap();
        let signer = chain.in_turn_signer(parent).clone();
        let addresses: Vec<Address> = next.iter().map(|s| s.address()).collect();

        let boundary = chain.build(parent, &signer, parent.time + PERIOD, DIFF_IN_TURN, Some(&addresses));
        chain.engine.verify_header(&boundary).unwrap();
        chain.store.insert(boundary.clone());
        boundary
    }

    #[test]
    fn scenario_d_shrinking_set_recomputes_window_and_rotation() {
        init_tracing();
        let chain = epoch_chain(5);
        let next = sorted_signers(3);
        let boundary = rotate_at_epoch(&chain, &next);

        let snap = chain.engine.snapshot(4, &boundary.hash()).unwrap();
        assert_eq!(snap.validators().len(), 3);
        assert_eq!(snap.validators().recents_limit(), 2);
        assert!(snap.recents().len() <= 2);

        // Height 5 rotates over the new ordered set
        let expected = next[5 % 3].address();
        assert_eq!(TurnScheduler::in_turn_validator(&snap, 5), Some(expected));

        let block5 = chain.build(&boundary, &next[5 % 3], boundary.time + PERIOD, DIFF_IN_TURN, None);
        let verified = chain.engine.verify_header(&block5).unwrap();
        assert_eq!(verified.signer, expected);

        // Old validators are no longer authorized
        let old = chain.signers[0].clone();
        let stale = chain.build(&boundary, &old, boundary.time + PERIOD, DIFF_NO_TURN, None);
        assert_eq!(
            chain.engine.verify_header(&stale).unwrap_err().kind(),
            ErrorKind::UnauthorizedSigner
        );
    }

    #[test]
    fn scenario_d_growing_set() {
        let chain = epoch_chain(3);
        let next = sorted_signers(7);
        let boundary = rotate_at_epoch(&chain, &next);

        let snap = chain.engine.snapshot(4, &boundary.hash()).unwrap();
        assert_eq!(snap.validators().len(), 7);
        assert_eq!(snap.validators().recents_limit(), 4);
        assert_eq!(
            TurnScheduler::in_turn_validator(&snap, 9),
            Some(next[9 % 7].address())
        );
    }

    #[test]
    fn scenario_d_validator_list_outside_epoch_rejected() {
        let chain = epoch_chain(3);
        let signer = chain.in_turn_signer(&chain.genesis).clone();
        let list = chain.addresses();
        let header = chain.build(&chain.genesis, &signer, GENESIS_TIME + PERIOD, DIFF_IN_TURN, Some(&list));

        assert!(matches!(
            chain.engine.verify_header(&header),
            Err(ConsensusError::InvalidExtraData { number: 1, .. })
        ));
    }

    // =========================================================================
    // SEALER RACE
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_in_turn_block_wins_and_no_turn_slot_is_abandoned() {
        init_tracing();
        let chain = TestChain::new(5, ForkSchedule::new(), Arc::new(FailingEntropy));
        let (fast, mut fast_rx) = sealer_for(&chain, &chain.in_turn_signer(&chain.genesis).clone());
        let (slow, mut slow_rx) = sealer_for(&chain, &chain.no_turn_signer(&chain.genesis, 1).clone());

        let fast_header = fast.prepare(&chain.genesis).unwrap();
        let slow_header = slow.prepare(&chain.genesis).unwrap();

        let (head_tx, head_rx) = watch::channel(0u64);
        let slow_task = {
            let head_rx = head_rx.clone();
            tokio::spawn(async move { slow.seal(slow_header, head_rx).await })
        };

        let SealOutcome::Sealed(block) = fast.seal(fast_header, head_rx).await.unwrap() else {
            panic!("in-turn validator should seal");
        };
        assert_eq!(fast_rx.recv().await, Some(block.clone()));
        chain.engine.verify_header(&block).unwrap();
        chain.store.insert(block);
        head_tx.send(1).unwrap();

        assert_eq!(
            slow_task.await.unwrap().unwrap(),
            SealOutcome::Abandoned { number: 1, head: 1 }
        );
        assert!(slow_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sealed_chain_verifies_end_to_end() {
        let chain = TestChain::new(4, ramanujan_at_genesis(), Arc::new(FailingEntropy));
        let (_head_tx, head_rx) = watch::channel(0u64);
        let mut parent = chain.genesis.clone();

        for _ in 0..8 {
            let signer = chain.in_turn_signer(&parent).clone();
            let (sealer, _rx) = sealer_for(&chain, &signer);
            let header = sealer.prepare(&parent).unwrap();
            chain.clock.set(header.time);

            let SealOutcome::Sealed(block) = sealer.seal(header, head_rx.clone()).await.unwrap() else {
                panic!("sealing should succeed");
            };
            let verified = chain.engine.verify_header(&block).unwrap();
            assert_eq!(verified.signer, signer.address());
            chain.store.insert(block.clone());
            parent = block;
        }

        let snap = chain.engine.snapshot(parent.number, &parent.hash()).unwrap();
        assert_eq!(snap.number(), 8);
        assert_eq!(snap.recents().len(), 3);
    }
}
