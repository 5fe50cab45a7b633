//! Parlia engine - core business logic
//!
//! Wires the domain rules to the outbound ports and exposes them through
//! [`ConsensusApi`]. The engine holds no mutable state of its own; the
//! snapshot store behind [`SnapshotManager`] is the only shared structure.

mod snapshots;

pub use snapshots::SnapshotManager;

use crate::adapters::{K256Recovery, LruSnapshotCache, OsEntropy, ParliaExtraCodec};
use crate::config::ParliaConfig;
use crate::domain::{
    child_number, BackoffCalculator, ConsensusError, ConsensusResult, ForkGate, HeaderVerifier,
    Snapshot, TurnScheduler, VerifiedHeader,
};
use crate::ports::{
    ConsensusApi, EntropySource, HeaderReader, SignerRecovery, SnapshotStore, SystemTimeSource,
    TimeSource, ValidatorSetCodec,
};
use shared_types::{Address, BlockHeader, Hash};
use std::sync::Arc;
use std::time::Duration;

/// Dependencies for [`ParliaEngine`]
pub struct EngineDependencies {
    pub headers: Arc<dyn HeaderReader>,
    pub store: Arc<dyn SnapshotStore>,
    pub recovery: Arc<dyn SignerRecovery>,
    pub codec: Arc<dyn ValidatorSetCodec>,
    pub entropy: Arc<dyn EntropySource>,
    pub time_source: Arc<dyn TimeSource>,
}

impl EngineDependencies {
    /// Production adapters around a header source.
    pub fn production(headers: Arc<dyn HeaderReader>, config: &ParliaConfig) -> Self {
        Self {
            headers,
            store: Arc::new(LruSnapshotCache::new(config.snapshot_cache_size)),
            recovery: Arc::new(K256Recovery),
            codec: Arc::new(ParliaExtraCodec),
            entropy: Arc::new(OsEntropy::new()),
            time_source: Arc::new(SystemTimeSource),
        }
    }
}

/// Parlia consensus engine
pub struct ParliaEngine {
    config: ParliaConfig,
    headers: Arc<dyn HeaderReader>,
    codec: Arc<dyn ValidatorSetCodec>,
    time_source: Arc<dyn TimeSource>,
    snapshots: SnapshotManager,
    verifier: HeaderVerifier,
}

impl ParliaEngine {
    pub fn new(config: ParliaConfig, deps: EngineDependencies) -> ConsensusResult<Self> {
        config.validate()?;

        let backoff = BackoffCalculator::new(
            ForkGate::new(config.forks.clone()),
            config.period,
            config.backoff,
            deps.entropy,
        );
        let verifier = HeaderVerifier::new(
            config.epoch,
            backoff,
            deps.recovery.clone(),
            deps.codec.clone(),
            deps.time_source.clone(),
        )
        .with_max_future_drift(config.max_future_drift_secs);
        let snapshots = SnapshotManager::new(
            config.epoch,
            deps.headers.clone(),
            deps.store,
            deps.recovery,
            deps.codec.clone(),
        );

        Ok(Self {
            config,
            headers: deps.headers,
            codec: deps.codec,
            time_source: deps.time_source,
            snapshots,
            verifier,
        })
    }

    pub fn config(&self) -> &ParliaConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    pub fn backoff(&self) -> &BackoffCalculator {
        self.verifier.backoff()
    }

    pub fn codec(&self) -> &dyn ValidatorSetCodec {
        self.codec.as_ref()
    }

    pub fn time_source(&self) -> &dyn TimeSource {
        self.time_source.as_ref()
    }

    /// Whether `number` is a validator-set checkpoint.
    pub fn is_epoch_boundary(&self, number: u64) -> bool {
        number % self.config.epoch == 0
    }

    /// Stored parent of `header`.
    pub fn parent_of(&self, header: &BlockHeader) -> ConsensusResult<BlockHeader> {
        let unknown = ConsensusError::UnknownAncestor {
            number: header.number.saturating_sub(1),
            hash: header.parent_hash,
        };
        let parent_number = header.number.checked_sub(1).ok_or_else(|| unknown.clone())?;
        self.headers
            .header(parent_number, &header.parent_hash)
            .ok_or(unknown)
    }

    /// Snapshot a child of `parent` is verified against.
    pub fn parent_snapshot(&self, parent: &BlockHeader) -> ConsensusResult<Arc<Snapshot>> {
        self.snapshots.snapshot(parent.number, &parent.hash())
    }

    /// Draft child used to evaluate fork rules before the real header exists.
    fn draft_child(&self, parent: &BlockHeader, proposer: &Address) -> ConsensusResult<BlockHeader> {
        Ok(BlockHeader {
            number: child_number(parent)?,
            parent_hash: parent.hash(),
            time: parent.time.saturating_add(self.config.period),
            coinbase: *proposer,
            ..Default::default()
        })
    }
}

impl ConsensusApi for ParliaEngine {
    fn verify_header(&self, header: &BlockHeader) -> ConsensusResult<VerifiedHeader> {
        let parent = self.parent_of(header)?;
        let snapshot = self.parent_snapshot(&parent)?;
        self.verifier.verify(header, &parent, &snapshot)
    }

    fn verify_headers(&self, headers: &[BlockHeader]) -> ConsensusResult<Vec<VerifiedHeader>> {
        let Some(first) = headers.first() else {
            return Ok(Vec::new());
        };

        let mut parent = self.parent_of(first)?;
        let mut snapshot = self.parent_snapshot(&parent)?;
        let mut verified = Vec::with_capacity(headers.len());

        for header in headers {
            verified.push(self.verifier.verify(header, &parent, &snapshot)?);
            snapshot = self.snapshots.apply(&snapshot, std::slice::from_ref(header))?;
            parent = header.clone();
        }
        Ok(verified)
    }

    fn snapshot(&self, number: u64, hash: &Hash) -> ConsensusResult<Arc<Snapshot>> {
        self.snapshots.snapshot(number, hash)
    }

    fn calc_difficulty(&self, parent: &BlockHeader, signer: &Address) -> ConsensusResult<u64> {
        let snapshot = self.parent_snapshot(parent)?;
        let number = child_number(parent)?;
        Ok(TurnScheduler::expected_difficulty(&snapshot, number, signer).difficulty())
    }

    fn block_time(&self, parent: &BlockHeader, proposer: &Address) -> ConsensusResult<u64> {
        let snapshot = self.parent_snapshot(parent)?;
        let draft = self.draft_child(parent, proposer)?;
        Ok(self.backoff().block_time(&snapshot, &draft, parent, proposer))
    }

    fn seal_delay(&self, header: &BlockHeader) -> ConsensusResult<Duration> {
        let parent = self.parent_of(header)?;
        let snapshot = self.parent_snapshot(&parent)?;
        Ok(self
            .backoff()
            .delay_for_fork(&snapshot, header, self.time_source.now_millis()))
    }
}
