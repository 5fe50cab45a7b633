//! Error types for the consensus core
//!
//! Every rejection is permanent except [`ConsensusError::FutureBlock`], which
//! the import pipeline holds and retries once wall-clock time catches up.

use shared_types::{Address, Hash};

/// Consensus error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    #[error("Signature missing from header {number}")]
    MissingSignature { number: u64 },

    #[error("Signature recovery failed for header {number}: {reason}")]
    SignatureRecovery { number: u64, reason: String },

    #[error("Invalid extra data in header {number}: {reason}")]
    InvalidExtraData { number: u64, reason: String },

    #[error("Invalid difficulty {difficulty} in header {number}: expected 1 or 2")]
    InvalidDifficultyValue { number: u64, difficulty: u64 },

    #[error("Unknown ancestor {hash:?} at height {number}")]
    UnknownAncestor { number: u64, hash: Hash },

    #[error("Header {number} does not extend parent {parent_number} ({reason})")]
    InvalidParent {
        number: u64,
        parent_number: u64,
        reason: &'static str,
    },

    #[error("Snapshot at {snapshot_number} cannot verify header {number}")]
    SnapshotMismatch { number: u64, snapshot_number: u64 },

    #[error("Non-contiguous header batch: expected {expected}, got {actual}")]
    InvalidVotingChain { expected: u64, actual: u64 },

    #[error("Unauthorized signer {signer:?} at height {number}")]
    UnauthorizedSigner { number: u64, signer: Address },

    #[error("Signer {signer:?} recently signed block {recent_block}, cannot sign {number}")]
    RecentlySigned {
        number: u64,
        signer: Address,
        recent_block: u64,
    },

    #[error("Coinbase {coinbase:?} does not match signer {signer:?} at height {number}")]
    CoinbaseMismatch {
        number: u64,
        coinbase: Address,
        signer: Address,
    },

    #[error("Wrong difficulty at height {number}: expected {expected}, got {actual}")]
    DifficultyMismatch {
        number: u64,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid timestamp at height {number}: {time} not after parent {parent_time}")]
    InvalidTimestamp {
        number: u64,
        time: u64,
        parent_time: u64,
    },

    #[error("Future block {number}: time {time} outside allowed bound {bound} (now {now})")]
    FutureBlock {
        number: u64,
        time: u64,
        bound: u64,
        now: u64,
    },

    #[error("Local validator {0:?} is not authorized to seal")]
    NotAuthorized(Address),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used for metrics labels and the import pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Structural,
    UnauthorizedSigner,
    RecentlySigned,
    DifficultyMismatch,
    FutureBlock,
    Sealing,
    Config,
}

impl ErrorKind {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Structural => "structural",
            ErrorKind::UnauthorizedSigner => "unauthorized_signer",
            ErrorKind::RecentlySigned => "recently_signed",
            ErrorKind::DifficultyMismatch => "difficulty_mismatch",
            ErrorKind::FutureBlock => "future_block",
            ErrorKind::Sealing => "sealing",
            ErrorKind::Config => "config",
        }
    }
}

impl ConsensusError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingSignature { .. }
            | Self::SignatureRecovery { .. }
            | Self::InvalidExtraData { .. }
            | Self::InvalidDifficultyValue { .. }
            | Self::UnknownAncestor { .. }
            | Self::InvalidParent { .. }
            | Self::SnapshotMismatch { .. }
            | Self::InvalidVotingChain { .. }
            | Self::InvalidTimestamp { .. }
            | Self::CoinbaseMismatch { .. } => ErrorKind::Structural,
            Self::UnauthorizedSigner { .. } => ErrorKind::UnauthorizedSigner,
            Self::RecentlySigned { .. } => ErrorKind::RecentlySigned,
            Self::DifficultyMismatch { .. } => ErrorKind::DifficultyMismatch,
            Self::FutureBlock { .. } => ErrorKind::FutureBlock,
            Self::NotAuthorized(_) | Self::SigningFailed(_) | Self::BroadcastFailed(_) => {
                ErrorKind::Sealing
            }
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Transient errors may clear on retry; every other rejection is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FutureBlock { .. })
    }
}

/// Failure of the randomness source used for pre-fork backoff jitter.
///
/// Never surfaced to callers: the backoff calculator falls back to the fixed
/// backoff when it sees this.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntropyError {
    #[error("Random source degraded: {0}")]
    RandomSourceDegraded(String),
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
