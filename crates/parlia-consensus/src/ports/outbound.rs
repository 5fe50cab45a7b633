//! Driven ports (Outbound dependencies)
//!
//! Capabilities the consensus core consumes but does not own: signature
//! cryptography, the extra-data codec, entropy, wall-clock time, header
//! storage, the local signing key and block propagation.

use crate::domain::{EntropyError, Snapshot};
use async_trait::async_trait;
use shared_types::{Address, BlockHeader, Hash, SIGNATURE_LENGTH};
use std::sync::Arc;

/// Recover the signer address from a signature over a header seal hash.
pub trait SignerRecovery: Send + Sync {
    /// Returns `None` when the signature is malformed or unrecoverable.
    fn recover_signer(&self, seal_hash: &Hash, signature: &[u8; SIGNATURE_LENGTH])
        -> Option<Address>;
}

/// Validator-set encoding inside header extra data.
pub trait ValidatorSetCodec: Send + Sync {
    /// Decode the validator list carried by an epoch-boundary header.
    fn decode_validators(&self, extra_data: &[u8]) -> Result<Vec<Address>, String>;

    /// Structural check of extra data; `epoch_boundary` selects which layout
    /// is legal.
    fn validate_extra(&self, extra_data: &[u8], epoch_boundary: bool) -> Result<(), String>;

    /// Encode extra data for a header the local node produces.
    fn encode_extra(&self, vanity: &[u8], validators: Option<&[Address]>) -> Vec<u8>;
}

/// Cryptographically secure randomness.
///
/// # Concurrency
/// May be called from several scheduling attempts at once and must never
/// block indefinitely.
pub trait EntropySource: Send + Sync {
    /// Uniform draw from `[0, bound)`. `bound` is non-zero.
    fn random_below(&self, bound: u64) -> Result<u64, EntropyError>;
}

/// Time source for scheduling and clock-drift checks
pub trait TimeSource: Send + Sync {
    /// Current unix time in milliseconds.
    fn now_millis(&self) -> u64;

    /// Current unix time in seconds.
    fn now(&self) -> u64 {
        self.now_millis() / 1_000
    }
}

/// Default time source using system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Read access to headers the node already stores.
pub trait HeaderReader: Send + Sync {
    fn header(&self, number: u64, hash: &Hash) -> Option<BlockHeader>;
}

/// Snapshot storage keyed by `(number, hash)`.
///
/// Inserting a key twice must be harmless: equal keys always carry equal
/// snapshots.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, number: u64, hash: &Hash) -> Option<Arc<Snapshot>>;

    fn insert(&self, snapshot: Arc<Snapshot>);
}

/// The local node's signing identity. Read-only after construction.
pub trait HeaderSigner: Send + Sync {
    /// Address the key signs as.
    fn address(&self) -> Address;

    /// Sign a header seal hash.
    fn sign(&self, seal_hash: &Hash) -> Result<[u8; SIGNATURE_LENGTH], String>;
}

/// Block propagation collaborator.
#[async_trait]
pub trait BlockBroadcaster: Send + Sync {
    /// Emit a freshly sealed header.
    async fn broadcast(&self, header: BlockHeader) -> Result<(), String>;
}
