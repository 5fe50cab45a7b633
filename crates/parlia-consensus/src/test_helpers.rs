//! Test fixtures: a small signed chain over real secp256k1 keys.

use crate::adapters::{
    InMemoryHeaderStore, K256Recovery, K256Signer, LruSnapshotCache, ParliaExtraCodec,
};
use crate::config::ParliaConfig;
use crate::domain::{ForkSchedule, TurnScheduler};
use crate::ports::{ConsensusApi, EntropySource, HeaderSigner, TimeSource, ValidatorSetCodec};
use crate::service::{EngineDependencies, ParliaEngine};
use shared_types::{Address, BlockHeader};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const GENESIS_TIME: u64 = 1_000;

/// Settable wall clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn at(secs: u64) -> Self {
        Self {
            millis: AtomicU64::new(secs * 1_000),
        }
    }

    pub fn set(&self, secs: u64) {
        self.millis.store(secs * 1_000, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

pub struct TestChain {
    /// Sorted by address, i.e. rotation order.
    pub signers: Vec<K256Signer>,
    pub store: Arc<InMemoryHeaderStore>,
    pub clock: Arc<ManualClock>,
    pub genesis: BlockHeader,
    pub engine: Arc<ParliaEngine>,
}

impl TestChain {
    pub fn new(validators: usize, forks: ForkSchedule, entropy: Arc<dyn EntropySource>) -> Self {
        let config = ParliaConfig {
            forks,
            ..Default::default()
        };
        Self::with_config(validators, config, entropy)
    }

    pub fn with_config(
        validators: usize,
        config: ParliaConfig,
        entropy: Arc<dyn EntropySource>,
    ) -> Self {
        let mut signers: Vec<K256Signer> = (0..validators).map(|_| K256Signer::random()).collect();
        signers.sort_by_key(|s| s.address());
        let addresses: Vec<Address> = signers.iter().map(|s| s.address()).collect();

        let genesis = BlockHeader {
            number: 0,
            time: GENESIS_TIME,
            extra_data: ParliaExtraCodec.encode_extra(b"genesis", Some(&addresses)),
            ..Default::default()
        };

        let store = Arc::new(InMemoryHeaderStore::new());
        store.insert(genesis.clone());
        let clock = Arc::new(ManualClock::at(GENESIS_TIME));

        let deps = EngineDependencies {
            headers: store.clone(),
            store: Arc::new(LruSnapshotCache::new(config.snapshot_cache_size)),
            recovery: Arc::new(K256Recovery),
            codec: Arc::new(ParliaExtraCodec),
            entropy,
            time_source: clock.clone(),
        };
        let engine = Arc::new(ParliaEngine::new(config, deps).expect("valid test config"));

        Self {
            signers,
            store,
            clock,
            genesis,
            engine,
        }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address()).collect()
    }

    pub fn signer_by_address(&self, address: &Address) -> &K256Signer {
        self.signers
            .iter()
            .find(|s| s.address() == *address)
            .expect("known validator")
    }

    pub fn signer_of(&self, header: &BlockHeader) -> &K256Signer {
        self.signer_by_address(&header.coinbase)
    }

    /// Validator in turn for the child of `parent`.
    pub fn in_turn_signer(&self, parent: &BlockHeader) -> &K256Signer {
        self.no_turn_signer(parent, 0)
    }

    /// Validator `distance` rotation positions after the in-turn slot for the
    /// child of `parent`.
    pub fn no_turn_signer(&self, parent: &BlockHeader, distance: u64) -> &K256Signer {
        let snapshot = self.engine.parent_snapshot(parent).expect("parent snapshot");
        let number = parent.number + 1;
        let in_turn = TurnScheduler::in_turn_validator(&snapshot, number).expect("non-empty set");
        let validators = snapshot.validators();
        let index = validators.index_of(&in_turn).expect("member");
        let target = (index + distance as usize) % validators.len();
        self.signer_by_address(validators.get(target).expect("in range"))
    }

    /// Signed child of `parent` by `signer` at `time`, not stored.
    pub fn child(&self, parent: &BlockHeader, signer: &K256Signer, time: u64) -> BlockHeader {
        let number = parent.number + 1;
        let difficulty = self
            .engine
            .calc_difficulty(parent, &signer.address())
            .expect("difficulty");
        let validators = if self.engine.is_epoch_boundary(number) {
            Some(self.engine.parent_snapshot(parent).expect("snapshot").validators().as_slice().to_vec())
        } else {
            None
        };

        self.build(parent, signer, time, difficulty, validators.as_deref())
    }

    /// Signed child with explicit fields; does not consult the engine.
    pub fn build(
        &self,
        parent: &BlockHeader,
        signer: &K256Signer,
        time: u64,
        difficulty: u64,
        validators: Option<&[Address]>,
    ) -> BlockHeader {
        let mut header = BlockHeader {
            number: parent.number + 1,
            parent_hash: parent.hash(),
            time,
            difficulty,
            coinbase: signer.address(),
            extra_data: ParliaExtraCodec.encode_extra(&[], validators),
            ..Default::default()
        };
        self.sign(&mut header, signer);
        header
    }

    pub fn sign(&self, header: &mut BlockHeader, signer: &K256Signer) {
        header.signature = signer.sign(&header.seal_hash()).expect("signing");
    }

    /// Append `count` in-turn blocks one period apart and store them.
    pub fn extend(&self, parent: &BlockHeader, count: usize) -> Vec<BlockHeader> {
        let period = self.engine.config().period;
        let mut parent = parent.clone();
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let signer = self.in_turn_signer(&parent).clone();
            let header = self.child(&parent, &signer, parent.time + period);
            self.store.insert(header.clone());
            parent = header.clone();
            out.push(header);
        }
        out
    }
}
