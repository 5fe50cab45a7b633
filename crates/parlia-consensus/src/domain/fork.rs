//! Fork gate
//!
//! Every fork-sensitive rule in the crate asks this table, keyed by fork name
//! and chain position, which rule-set variant applies. Activation uses a `>=`
//! comparison against a fixed threshold, so once a fork is active it stays
//! active for every later height.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named protocol upgrades understood by the consensus core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fork {
    /// Switches no-turn backoff from local random wiggle to a
    /// network-verified, rotation-staggered minimum block time.
    Ramanujan,
}

impl Fork {
    pub fn name(&self) -> &'static str {
        match self {
            Fork::Ramanujan => "ramanujan",
        }
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Activation threshold of a fork.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkActivation {
    /// Active for every block with `number >= n`.
    Block(u64),
    /// Active for every block with `time >= t`.
    Timestamp(u64),
}

impl ForkActivation {
    fn is_active(&self, number: u64, time: u64) -> bool {
        match *self {
            ForkActivation::Block(at) => number >= at,
            ForkActivation::Timestamp(at) => time >= at,
        }
    }
}

/// Per-chain fork activation table. Forks absent from the table never activate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkSchedule {
    activations: BTreeMap<Fork, ForkActivation>,
}

impl ForkSchedule {
    /// Empty schedule: every fork inactive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style activation entry.
    pub fn with(mut self, fork: Fork, activation: ForkActivation) -> Self {
        self.activations.insert(fork, activation);
        self
    }

    /// Activation threshold for a fork, if scheduled.
    pub fn activation(&self, fork: Fork) -> Option<ForkActivation> {
        self.activations.get(&fork).copied()
    }
}

/// Queryable fork predicate family.
#[derive(Clone, Debug, Default)]
pub struct ForkGate {
    schedule: ForkSchedule,
}

impl ForkGate {
    pub fn new(schedule: ForkSchedule) -> Self {
        Self { schedule }
    }

    /// Whether `fork` governs a block at `number` stamped with `time`.
    pub fn is_active(&self, fork: Fork, number: u64, time: u64) -> bool {
        self.schedule
            .activation(fork)
            .map(|a| a.is_active(number, time))
            .unwrap_or(false)
    }

    pub fn is_ramanujan(&self, number: u64, time: u64) -> bool {
        self.is_active(Fork::Ramanujan, number, time)
    }
}
