//! Backoff calculation
//!
//! Two fork-gated regimes:
//!
//! - **Before Ramanujan** the backoff is local only. A no-turn validator waits
//!   `FIXED_BACKOFF + uniform[0, (n/2 + 1) * WIGGLE_UNIT)` past the header
//!   time before broadcasting. If the random source fails the draw is
//!   replaced by `FIXED_BACKOFF`. Nodes may legitimately disagree on the
//!   value and nothing about it is checked on import.
//! - **From Ramanujan on** the backoff is part of the minimum block time every
//!   node enforces: `parent.time + period + back_off_time(distance)`, where
//!   `distance` is the proposer's position after the in-turn slot.
//!
//! ```text
//! back_off_time(d) = 0                                         if d == 0
//!                  = initial_backoff + (d - 1) * backoff_step  otherwise
//! ```

use super::{ConsensusError, ConsensusResult, ForkGate, Snapshot, TurnScheduler};
use crate::metrics;
use crate::ports::EntropySource;
use serde::Deserialize;
use shared_types::{Address, BlockHeader, DIFF_NO_TURN};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Random delay per half of the validator set, pre-fork.
pub const WIGGLE_UNIT: Duration = Duration::from_millis(500);

/// Fixed delay every no-turn validator observes, pre-fork.
pub const FIXED_BACKOFF: Duration = Duration::from_millis(200);

/// Post-fork stagger parameters (seconds).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Backoff of the validator right after the in-turn slot.
    pub initial_backoff_secs: u64,
    /// Extra backoff per further rotation position.
    pub backoff_step_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_backoff_secs: 1,
            backoff_step_secs: 1,
        }
    }
}

/// Computes production delays and minimum block times.
#[derive(Clone)]
pub struct BackoffCalculator {
    gate: ForkGate,
    period: u64,
    config: BackoffConfig,
    entropy: Arc<dyn EntropySource>,
}

impl BackoffCalculator {
    pub fn new(
        gate: ForkGate,
        period: u64,
        config: BackoffConfig,
        entropy: Arc<dyn EntropySource>,
    ) -> Self {
        Self {
            gate,
            period,
            config,
            entropy,
        }
    }

    pub fn gate(&self) -> &ForkGate {
        &self.gate
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// How long the local node waits before broadcasting `header`.
    ///
    /// Pre-fork no-turn headers get the randomized wiggle on top of the time
    /// remaining until `header.time`; in-turn headers and every post-fork
    /// header wait exactly until `header.time`.
    pub fn delay_for_fork(&self, snapshot: &Snapshot, header: &BlockHeader, now_millis: u64) -> Duration {
        let delay = time_until(header.time, now_millis);
        if self.gate.is_ramanujan(header.number, header.time) {
            return delay;
        }
        if header.difficulty == DIFF_NO_TURN {
            let wiggle = WIGGLE_UNIT * (snapshot.validators().len() / 2 + 1) as u32;
            return delay + FIXED_BACKOFF + self.wiggle(wiggle);
        }
        delay
    }

    /// Deterministic post-fork stagger for `proposer` producing block `number`.
    ///
    /// Non-members get zero: they never reach the time check because the
    /// snapshot gate rejects them first.
    pub fn back_off_time(&self, snapshot: &Snapshot, number: u64, proposer: &Address) -> u64 {
        match TurnScheduler::rotation_distance(snapshot, number, proposer) {
            None | Some(0) => 0,
            Some(distance) => self
                .config
                .initial_backoff_secs
                .saturating_add((distance - 1).saturating_mul(self.config.backoff_step_secs)),
        }
    }

    /// Earliest legal time for `header` produced by `proposer` on `parent`.
    pub fn block_time(
        &self,
        snapshot: &Snapshot,
        header: &BlockHeader,
        parent: &BlockHeader,
        proposer: &Address,
    ) -> u64 {
        let block_time = parent.time.saturating_add(self.period);
        if self.gate.is_ramanujan(header.number, header.time) {
            return block_time.saturating_add(self.back_off_time(snapshot, header.number, proposer));
        }
        block_time
    }

    /// Import-time check of `header.time` against its parent.
    ///
    /// Post-fork, a header earlier than [`BackoffCalculator::block_time`] for
    /// its own coinbase is premature and reported as the transient
    /// [`ConsensusError::FutureBlock`]. Pre-fork only strict monotonicity is
    /// enforced.
    pub fn verify_block_time(
        &self,
        snapshot: &Snapshot,
        header: &BlockHeader,
        parent: &BlockHeader,
        now: u64,
    ) -> ConsensusResult<()> {
        if self.gate.is_ramanujan(header.number, header.time) {
            let earliest = self.block_time(snapshot, header, parent, &header.coinbase);
            if header.time < earliest {
                return Err(ConsensusError::FutureBlock {
                    number: header.number,
                    time: header.time,
                    bound: earliest,
                    now,
                });
            }
            return Ok(());
        }

        if header.time <= parent.time {
            return Err(ConsensusError::InvalidTimestamp {
                number: header.number,
                time: header.time,
                parent_time: parent.time,
            });
        }
        Ok(())
    }

    fn wiggle(&self, max: Duration) -> Duration {
        let bound = max.as_millis() as u64;
        match self.entropy.random_below(bound) {
            Ok(millis) => Duration::from_millis(millis.min(bound.saturating_sub(1))),
            Err(err) => {
                warn!(error = %err, "Entropy unavailable, substituting fixed backoff for wiggle");
                metrics::record_entropy_fallback();
                FIXED_BACKOFF
            }
        }
    }
}

/// Time remaining until `time` (unix seconds), zero if already past.
pub fn time_until(time: u64, now_millis: u64) -> Duration {
    Duration::from_millis(time.saturating_mul(1_000).saturating_sub(now_millis))
}
