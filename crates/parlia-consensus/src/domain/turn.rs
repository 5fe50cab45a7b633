//! Turn scheduling
//!
//! The in-turn validator for height `h` is `validators[h mod n]` in canonical
//! order, evaluated against the snapshot of the parent (`h - 1`). Rotation is
//! a plain modulus, so exactly one member is in turn for any height.

use super::Snapshot;
use shared_types::{Address, DIFF_IN_TURN, DIFF_NO_TURN};

/// Turn status of a signer, carried on the wire as a difficulty sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurnStatus {
    InTurn,
    NoTurn,
}

impl TurnStatus {
    /// Difficulty sentinel for this status.
    pub fn difficulty(&self) -> u64 {
        match self {
            TurnStatus::InTurn => DIFF_IN_TURN,
            TurnStatus::NoTurn => DIFF_NO_TURN,
        }
    }

    /// Parse a header difficulty. Anything but the two sentinels is invalid.
    pub fn from_difficulty(difficulty: u64) -> Option<Self> {
        match difficulty {
            DIFF_IN_TURN => Some(TurnStatus::InTurn),
            DIFF_NO_TURN => Some(TurnStatus::NoTurn),
            _ => None,
        }
    }
}

/// Stateless turn rules over a snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct TurnScheduler;

impl TurnScheduler {
    /// Validator entitled to produce block `number`. `None` only for an
    /// empty validator set.
    pub fn in_turn_validator(snapshot: &Snapshot, number: u64) -> Option<Address> {
        let validators = snapshot.validators();
        if validators.is_empty() {
            return None;
        }
        let index = (number % validators.len() as u64) as usize;
        validators.get(index).copied()
    }

    /// Expected turn status of `candidate` producing block `number`.
    pub fn expected_difficulty(snapshot: &Snapshot, number: u64, candidate: &Address) -> TurnStatus {
        match Self::in_turn_validator(snapshot, number) {
            Some(in_turn) if in_turn == *candidate => TurnStatus::InTurn,
            _ => TurnStatus::NoTurn,
        }
    }

    /// Positions the candidate sits after the in-turn slot in rotation order;
    /// `0` for the in-turn validator, `None` for non-members.
    pub fn rotation_distance(snapshot: &Snapshot, number: u64, candidate: &Address) -> Option<u64> {
        let validators = snapshot.validators();
        let index = validators.index_of(candidate)? as u64;
        let n = validators.len() as u64;
        let in_turn = number % n;
        Some((index + n - in_turn) % n)
    }
}
