//! Driving ports (Inbound API)

use crate::domain::{ConsensusResult, Snapshot, VerifiedHeader};
use shared_types::{Address, BlockHeader, Hash};
use std::sync::Arc;
use std::time::Duration;

/// Primary consensus API used by the import pipeline and block producer.
///
/// All operations are synchronous: they read stored headers, derive
/// snapshots and consult the local clock, but never wait.
pub trait ConsensusApi: Send + Sync {
    /// Verify one header whose parent is already stored.
    fn verify_header(&self, header: &BlockHeader) -> ConsensusResult<VerifiedHeader>;

    /// Verify a contiguous batch. The first header's parent must be stored;
    /// each later header's parent is its predecessor in the batch.
    ///
    /// Stops at the first failure.
    fn verify_headers(&self, headers: &[BlockHeader]) -> ConsensusResult<Vec<VerifiedHeader>>;

    /// Snapshot after applying the block `(number, hash)`.
    fn snapshot(&self, number: u64, hash: &Hash) -> ConsensusResult<Arc<Snapshot>>;

    /// Difficulty `signer` must stamp on the child of `parent`.
    fn calc_difficulty(&self, parent: &BlockHeader, signer: &Address) -> ConsensusResult<u64>;

    /// Earliest legal time for a child of `parent` produced by `proposer`.
    fn block_time(&self, parent: &BlockHeader, proposer: &Address) -> ConsensusResult<u64>;

    /// How long the local node should hold `header` before broadcasting it.
    fn seal_delay(&self, header: &BlockHeader) -> ConsensusResult<Duration>;
}
