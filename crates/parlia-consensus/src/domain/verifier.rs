//! Header verification state machine
//!
//! ```text
//! Received ──▶ StructurallyChecked ──▶ SnapshotConsistent ──▶ TimeValid ──▶ Accepted
//!     │                 │                       │                  │
//!     └─────────────────┴───────────────────────┴──────────────────┴──▶ Rejected
//! ```
//!
//! Each transition is a hard gate: the first failure is returned and nothing
//! about the header reaches a snapshot. Verification is synchronous and reads
//! only the header, its parent, the parent's snapshot and the local clock.

use super::{
    BackoffCalculator, ConsensusError, ConsensusResult, Snapshot, TurnScheduler, TurnStatus,
};
use crate::metrics;
use crate::ports::{SignerRecovery, TimeSource, ValidatorSetCodec};
use shared_types::{Address, BlockHeader, Hash};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Height of the block built on `parent`.
pub fn child_number(parent: &BlockHeader) -> ConsensusResult<u64> {
    parent
        .number
        .checked_add(1)
        .ok_or(ConsensusError::InvalidParent {
            number: parent.number,
            parent_number: parent.number,
            reason: "height overflow",
        })
}

/// Last gate a header passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerificationStage {
    Received,
    StructurallyChecked,
    SnapshotConsistent,
    TimeValid,
    Accepted,
}

impl fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationStage::Received => "received",
            VerificationStage::StructurallyChecked => "structurally_checked",
            VerificationStage::SnapshotConsistent => "snapshot_consistent",
            VerificationStage::TimeValid => "time_valid",
            VerificationStage::Accepted => "accepted",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedHeader {
    pub number: u64,
    pub hash: Hash,
    pub signer: Address,
    pub turn: TurnStatus,
    pub stage: VerificationStage,
}

/// Validates remote headers against snapshot, fork and backoff rules.
#[derive(Clone)]
pub struct HeaderVerifier {
    epoch: u64,
    backoff: BackoffCalculator,
    recovery: Arc<dyn SignerRecovery>,
    codec: Arc<dyn ValidatorSetCodec>,
    time_source: Arc<dyn TimeSource>,
    /// Upper bound on how far ahead of the local clock a header may be.
    max_future_drift_secs: Option<u64>,
}

impl HeaderVerifier {
    pub fn new(
        epoch: u64,
        backoff: BackoffCalculator,
        recovery: Arc<dyn SignerRecovery>,
        codec: Arc<dyn ValidatorSetCodec>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            epoch,
            backoff,
            recovery,
            codec,
            time_source,
            max_future_drift_secs: None,
        }
    }

    /// Reject headers stamped further than `secs` ahead of the local clock.
    pub fn with_max_future_drift(mut self, secs: Option<u64>) -> Self {
        self.max_future_drift_secs = secs;
        self
    }

    pub fn backoff(&self) -> &BackoffCalculator {
        &self.backoff
    }

    /// Run every gate for `header` on top of `parent`, using `snapshot` taken
    /// at the parent.
    #[tracing::instrument(skip_all, fields(number = header.number))]
    pub fn verify(
        &self,
        header: &BlockHeader,
        parent: &BlockHeader,
        snapshot: &Snapshot,
    ) -> ConsensusResult<VerifiedHeader> {
        let mut stage = VerificationStage::Received;
        match self.run(header, parent, snapshot, &mut stage) {
            Ok(verified) => {
                metrics::record_header_verified();
                debug!(signer = ?verified.signer, turn = ?verified.turn, "Header accepted");
                Ok(verified)
            }
            Err(err) => {
                metrics::record_header_rejected(err.kind().as_str());
                warn!(%stage, error = %err, transient = err.is_transient(), "Header rejected");
                Err(err)
            }
        }
    }

    fn run(
        &self,
        header: &BlockHeader,
        parent: &BlockHeader,
        snapshot: &Snapshot,
        stage: &mut VerificationStage,
    ) -> ConsensusResult<VerifiedHeader> {
        let (signer, claimed) = self.check_structure(header, parent, snapshot)?;
        *stage = VerificationStage::StructurallyChecked;

        let turn = self.check_snapshot(header, snapshot, &signer, claimed)?;
        *stage = VerificationStage::SnapshotConsistent;

        self.check_time(header, parent, snapshot)?;
        *stage = VerificationStage::TimeValid;

        *stage = VerificationStage::Accepted;
        Ok(VerifiedHeader {
            number: header.number,
            hash: header.hash(),
            signer,
            turn,
            stage: *stage,
        })
    }

    fn check_structure(
        &self,
        header: &BlockHeader,
        parent: &BlockHeader,
        snapshot: &Snapshot,
    ) -> ConsensusResult<(Address, TurnStatus)> {
        let number = header.number;

        if number != child_number(parent)? {
            return Err(ConsensusError::InvalidParent {
                number,
                parent_number: parent.number,
                reason: "non-sequential number",
            });
        }
        if header.parent_hash != parent.hash() {
            return Err(ConsensusError::InvalidParent {
                number,
                parent_number: parent.number,
                reason: "parent hash mismatch",
            });
        }
        if snapshot.number() != parent.number || snapshot.hash() != header.parent_hash {
            return Err(ConsensusError::SnapshotMismatch {
                number,
                snapshot_number: snapshot.number(),
            });
        }

        let claimed = TurnStatus::from_difficulty(header.difficulty).ok_or(
            ConsensusError::InvalidDifficultyValue {
                number,
                difficulty: header.difficulty,
            },
        )?;

        let epoch_boundary = self.epoch > 0 && number % self.epoch == 0;
        self.codec
            .validate_extra(&header.extra_data, epoch_boundary)
            .map_err(|reason| ConsensusError::InvalidExtraData { number, reason })?;

        if header.is_unsigned() {
            return Err(ConsensusError::MissingSignature { number });
        }
        let signer = self
            .recovery
            .recover_signer(&header.seal_hash(), &header.signature)
            .ok_or(ConsensusError::SignatureRecovery {
                number,
                reason: "unrecoverable signature".to_string(),
            })?;

        Ok((signer, claimed))
    }

    fn check_snapshot(
        &self,
        header: &BlockHeader,
        snapshot: &Snapshot,
        signer: &Address,
        claimed: TurnStatus,
    ) -> ConsensusResult<TurnStatus> {
        let number = header.number;

        if !snapshot.is_validator(signer) {
            return Err(ConsensusError::UnauthorizedSigner {
                number,
                signer: *signer,
            });
        }
        if let Some(recent_block) = snapshot.recently_signed(number, signer) {
            return Err(ConsensusError::RecentlySigned {
                number,
                signer: *signer,
                recent_block,
            });
        }
        if header.coinbase != *signer {
            return Err(ConsensusError::CoinbaseMismatch {
                number,
                coinbase: header.coinbase,
                signer: *signer,
            });
        }

        let expected = TurnScheduler::expected_difficulty(snapshot, number, signer);
        if expected != claimed {
            return Err(ConsensusError::DifficultyMismatch {
                number,
                expected: expected.difficulty(),
                actual: header.difficulty,
            });
        }
        Ok(expected)
    }

    fn check_time(
        &self,
        header: &BlockHeader,
        parent: &BlockHeader,
        snapshot: &Snapshot,
    ) -> ConsensusResult<()> {
        let now = self.time_source.now();

        if let Some(drift) = self.max_future_drift_secs {
            let bound = now.saturating_add(drift);
            if header.time > bound {
                return Err(ConsensusError::FutureBlock {
                    number: header.number,
                    time: header.time,
                    bound,
                    now,
                });
            }
        }

        self.backoff.verify_block_time(snapshot, header, parent, now)
    }
}
