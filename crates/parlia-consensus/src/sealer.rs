//! Block sealing for the local validator
//!
//! ```text
//! prepare(parent) ──▶ header (difficulty, time, extra) ──▶ seal(header, heads)
//!                                                          │
//!                               ┌── sleep(delay) elapsed ──┴── new head >= number ──┐
//!                               ▼                                                   ▼
//!                       sign + broadcast                                       Abandoned
//!                               ▼
//!                         Sealed(header)
//! ```
//!
//! The local signing identity is part of the sealer itself, so several
//! sealers with different keys can run side by side.

use crate::domain::{child_number, ConsensusError, ConsensusResult, TurnScheduler};
use crate::metrics;
use crate::ports::{BlockBroadcaster, HeaderSigner};
use crate::service::ParliaEngine;
use shared_types::{Address, BlockHeader};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Result of a sealing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealOutcome {
    /// Header was signed and handed to the broadcaster.
    Sealed(BlockHeader),
    /// A competing block at this height (or higher) arrived first.
    Abandoned { number: u64, head: u64 },
}

pub struct Sealer {
    engine: Arc<ParliaEngine>,
    signer: Arc<dyn HeaderSigner>,
    broadcaster: Arc<dyn BlockBroadcaster>,
    vanity: Vec<u8>,
}

impl Sealer {
    pub fn new(
        engine: Arc<ParliaEngine>,
        signer: Arc<dyn HeaderSigner>,
        broadcaster: Arc<dyn BlockBroadcaster>,
    ) -> Self {
        Self {
            engine,
            signer,
            broadcaster,
            vanity: Vec::new(),
        }
    }

    /// Vanity bytes stamped into every produced header.
    pub fn with_vanity(mut self, vanity: &[u8]) -> Self {
        self.vanity = vanity.to_vec();
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Build an unsigned child of `parent` for the local validator.
    ///
    /// Difficulty follows the turn rule and `time` is the later of the
    /// earliest legal block time and the local clock. Epoch-boundary headers
    /// carry the current validator list.
    pub fn prepare(&self, parent: &BlockHeader) -> ConsensusResult<BlockHeader> {
        let local = self.address();
        let number = child_number(parent)?;
        let snapshot = self.engine.parent_snapshot(parent)?;

        let validators = self
            .engine
            .is_epoch_boundary(number)
            .then(|| snapshot.validators().as_slice());

        let mut header = BlockHeader {
            number,
            parent_hash: parent.hash(),
            time: parent.time.saturating_add(self.engine.backoff().period()),
            difficulty: TurnScheduler::expected_difficulty(&snapshot, number, &local).difficulty(),
            coinbase: local,
            extra_data: self.engine.codec().encode_extra(&self.vanity, validators),
            ..Default::default()
        };

        let earliest = self
            .engine
            .backoff()
            .block_time(&snapshot, &header, parent, &local);
        header.time = earliest.max(self.engine.time_source().now());

        debug!(number, time = header.time, difficulty = header.difficulty, "Prepared header");
        Ok(header)
    }

    /// Wait out the production delay, then sign and broadcast `header`.
    ///
    /// `heads` carries the height of the local canonical head. The wait is
    /// abandoned as soon as it reaches `header.number`.
    pub async fn seal(
        &self,
        mut header: BlockHeader,
        mut heads: watch::Receiver<u64>,
    ) -> ConsensusResult<SealOutcome> {
        let local = self.address();
        let number = header.number;
        let parent = self.engine.parent_of(&header)?;
        let snapshot = self.engine.parent_snapshot(&parent)?;

        if !snapshot.is_validator(&local) {
            return Err(ConsensusError::NotAuthorized(local));
        }
        if let Some(recent_block) = snapshot.recently_signed(number, &local) {
            return Err(ConsensusError::RecentlySigned {
                number,
                signer: local,
                recent_block,
            });
        }

        let delay = self.engine.backoff().delay_for_fork(
            &snapshot,
            &header,
            self.engine.time_source().now_millis(),
        );
        let deadline = Instant::now() + delay;
        debug!(number, delay_ms = delay.as_millis() as u64, "Waiting for slot");

        loop {
            let head = *heads.borrow_and_update();
            if head >= number {
                return Ok(self.abandon(number, head));
            }

            tokio::select! {
                _ = sleep_until(deadline) => break,
                changed = heads.changed() => {
                    if changed.is_err() {
                        // Head feed closed: the node is shutting down
                        let head = *heads.borrow();
                        return Ok(self.abandon(number, head));
                    }
                }
            }
        }

        header.signature = self
            .signer
            .sign(&header.seal_hash())
            .map_err(ConsensusError::SigningFailed)?;

        self.broadcaster
            .broadcast(header.clone())
            .await
            .map_err(ConsensusError::BroadcastFailed)?;

        metrics::record_block_sealed();
        info!(
            number,
            hash = ?header.hash(),
            difficulty = header.difficulty,
            "Sealed block"
        );
        Ok(SealOutcome::Sealed(header))
    }

    fn abandon(&self, number: u64, head: u64) -> SealOutcome {
        metrics::record_block_abandoned();
        info!(number, head, "Abandoned sealing, chain moved on");
        SealOutcome::Abandoned { number, head }
    }
}
