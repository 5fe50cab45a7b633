//! # parlia-consensus
//!
//! Turn-based validator-rotation consensus core (Parlia).
//!
//! ## Architecture
//!
//! A fixed, ordered validator set takes turns producing blocks. The set and
//! its recent-signer history are tracked per chain position as immutable
//! [`Snapshot`] values, re-derived from headers and replaced at epoch
//! boundaries from header extra data.
//!
//! ```text
//!                 ┌──────────────── ParliaEngine (ConsensusApi) ───────────────┐
//! header ───────▶ │ SnapshotManager ──▶ HeaderVerifier ──▶ BackoffCalculator   │
//!                 │        │                  │                    │           │
//!                 │  HeaderReader      TurnScheduler            ForkGate       │
//!                 │  SnapshotStore     SignerRecovery        EntropySource     │
//!                 └────────────────────────────────────────────────────────────┘
//!                                   ▲
//!                 Sealer ───────────┘  (HeaderSigner, BlockBroadcaster)
//! ```
//!
//! ### Fork-gated backoff
//!
//! Before the Ramanujan fork a no-turn validator delays broadcasting by a
//! fixed backoff plus random jitter, which nobody else checks. From the fork
//! on the backoff is a deterministic function of rotation distance folded
//! into the minimum block time every node enforces on import.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use parlia_consensus::{ConsensusApi, EngineDependencies, ParliaConfig, ParliaEngine};
//!
//! let config = ParliaConfig::from_env()?;
//! let deps = EngineDependencies::production(header_store, &config);
//! let engine = ParliaEngine::new(config, deps)?;
//!
//! let verified = engine.verify_header(&header)?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod sealer;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

// Re-export main types
pub use adapters::{
    ChannelBroadcaster, InMemoryHeaderStore, K256Recovery, K256Signer, LruSnapshotCache,
    OsEntropy, ParliaExtraCodec,
};
pub use config::{ConfigError, ParliaConfig};
pub use domain::{
    BackoffCalculator, BackoffConfig, ConsensusError, ConsensusResult, ErrorKind, Fork,
    ForkActivation, ForkGate, ForkSchedule, HeaderVerifier, Snapshot, TurnScheduler, TurnStatus,
    ValidatorSet, VerificationStage, VerifiedHeader,
};
pub use ports::{
    BlockBroadcaster, ConsensusApi, EntropySource, HeaderReader, HeaderSigner, SignerRecovery,
    SnapshotStore, SystemTimeSource, TimeSource, ValidatorSetCodec,
};
pub use sealer::{SealOutcome, Sealer};
pub use service::{EngineDependencies, ParliaEngine, SnapshotManager};
