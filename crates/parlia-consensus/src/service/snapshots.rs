//! Snapshot derivation and caching

use crate::domain::{ConsensusError, ConsensusResult, Snapshot};
use crate::ports::{HeaderReader, SignerRecovery, SnapshotStore, ValidatorSetCodec};
use shared_types::{BlockHeader, Hash};
use std::sync::Arc;
use tracing::debug;

/// Resolves snapshots for arbitrary chain positions.
///
/// Lookups are read-through: a miss walks parent links back to the nearest
/// cached snapshot (or genesis) and replays the headers forward. The store
/// lock is only held for individual get/insert calls, never across a
/// derivation, so competing branches derive concurrently.
#[derive(Clone)]
pub struct SnapshotManager {
    epoch: u64,
    headers: Arc<dyn HeaderReader>,
    store: Arc<dyn SnapshotStore>,
    recovery: Arc<dyn SignerRecovery>,
    codec: Arc<dyn ValidatorSetCodec>,
}

impl SnapshotManager {
    pub fn new(
        epoch: u64,
        headers: Arc<dyn HeaderReader>,
        store: Arc<dyn SnapshotStore>,
        recovery: Arc<dyn SignerRecovery>,
        codec: Arc<dyn ValidatorSetCodec>,
    ) -> Self {
        Self {
            epoch,
            headers,
            store,
            recovery,
            codec,
        }
    }

    /// Build and cache the height-0 snapshot from the genesis header.
    pub fn genesis(&self, header: &BlockHeader) -> ConsensusResult<Arc<Snapshot>> {
        let snap = Arc::new(Snapshot::genesis(header, self.codec.as_ref())?);
        self.store.insert(snap.clone());
        Ok(snap)
    }

    /// Snapshot after block `(number, hash)`.
    #[tracing::instrument(skip(self, hash))]
    pub fn snapshot(&self, number: u64, hash: &Hash) -> ConsensusResult<Arc<Snapshot>> {
        let mut pending: Vec<BlockHeader> = Vec::new();
        let mut current_number = number;
        let mut current_hash = *hash;

        let base = loop {
            if let Some(snap) = self.store.get(current_number, &current_hash) {
                break snap;
            }

            let header = self.headers.header(current_number, &current_hash).ok_or(
                ConsensusError::UnknownAncestor {
                    number: current_number,
                    hash: current_hash,
                },
            )?;

            if current_number == 0 {
                break self.genesis(&header)?;
            }

            current_number -= 1;
            current_hash = header.parent_hash;
            pending.push(header);
        };

        if pending.is_empty() {
            return Ok(base);
        }

        pending.reverse();
        debug!(from = base.number(), replayed = pending.len(), "Deriving snapshot");
        self.apply(&base, &pending)
    }

    /// Apply consecutive headers on top of `parent` and cache the result.
    pub fn apply(&self, parent: &Snapshot, headers: &[BlockHeader]) -> ConsensusResult<Arc<Snapshot>> {
        let snap = Arc::new(parent.apply(
            headers,
            self.epoch,
            self.recovery.as_ref(),
            self.codec.as_ref(),
        )?);
        self.store.insert(snap.clone());
        Ok(snap)
    }
}
