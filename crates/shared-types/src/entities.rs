//! # Core Domain Entities
//!
//! Chain primitives shared by the consensus core and its collaborators.
//!
//! Only the header fields the validator-rotation rules read or write are
//! modelled here; execution roots, gas accounting and transaction lists
//! belong to the execution layer.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Keccak256};

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// The all-zero hash.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Length of a recoverable secp256k1 signature (r ‖ s ‖ v).
pub const SIGNATURE_LENGTH: usize = 65;

/// Difficulty carried by a block signed by the in-turn validator.
pub const DIFF_IN_TURN: u64 = 2;

/// Difficulty carried by a block signed out of turn.
pub const DIFF_NO_TURN: u64 = 1;

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Consensus-relevant subset of a block header.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height.
    pub number: u64,
    /// Hash of the parent header.
    pub parent_hash: Hash,
    /// Declared production time (unix seconds).
    pub time: u64,
    /// Turn sentinel, [`DIFF_IN_TURN`] or [`DIFF_NO_TURN`].
    pub difficulty: u64,
    /// Validator claiming production of this block.
    pub coinbase: Address,
    /// Opaque extension bytes (validator set at epoch boundaries).
    pub extra_data: Vec<u8>,
    /// Recoverable signature over [`BlockHeader::seal_hash`].
    #[serde_as(as = "Bytes")]
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            number: 0,
            parent_hash: ZERO_HASH,
            time: 0,
            difficulty: DIFF_NO_TURN,
            coinbase: [0u8; 20],
            extra_data: Vec::new(),
            signature: [0u8; SIGNATURE_LENGTH],
        }
    }
}

impl BlockHeader {
    /// Block identity: hash over every field, signature included.
    pub fn hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        self.feed_unsigned(&mut hasher);
        hasher.update(self.signature);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        hash
    }

    /// The message a validator signs: hash over every field except the signature.
    pub fn seal_hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        self.feed_unsigned(&mut hasher);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        hash
    }

    /// Whether the signature field has never been filled in.
    pub fn is_unsigned(&self) -> bool {
        self.signature.iter().all(|b| *b == 0)
    }

    fn feed_unsigned(&self, hasher: &mut Keccak256) {
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.parent_hash);
        hasher.update(self.time.to_be_bytes());
        hasher.update(self.difficulty.to_be_bytes());
        hasher.update(self.coinbase);
        hasher.update((self.extra_data.len() as u64).to_be_bytes());
        hasher.update(&self.extra_data);
    }
}
