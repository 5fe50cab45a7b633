//! Validator snapshot
//!
//! A snapshot is the validator set plus recent-signer history as of one
//! chain position `(number, hash)`. Deriving a child never touches the
//! parent value, so competing branches can each hold their own snapshot
//! without coordination.

use super::{ConsensusError, ConsensusResult, ValidatorSet};
use crate::ports::{SignerRecovery, ValidatorSetCodec};
use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeader, Hash};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Validator set and anti-repeat history at a chain position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    number: u64,
    hash: Hash,
    validators: ValidatorSet,
    /// Block number -> signer, bounded by `validators.recents_limit()`.
    recents: BTreeMap<u64, Address>,
}

impl Snapshot {
    /// Create a snapshot with no signing history.
    ///
    /// Only meaningful for genesis or a trusted checkpoint.
    pub fn new(number: u64, hash: Hash, validators: ValidatorSet) -> Self {
        Self {
            number,
            hash,
            validators,
            recents: BTreeMap::new(),
        }
    }

    /// Build the height-0 snapshot from the genesis header's extra data.
    pub fn genesis(header: &BlockHeader, codec: &dyn ValidatorSetCodec) -> ConsensusResult<Self> {
        let validators = decode_validator_set(header, codec)?;
        Ok(Self::new(header.number, header.hash(), validators))
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    pub fn recents(&self) -> &BTreeMap<u64, Address> {
        &self.recents
    }

    pub fn is_validator(&self, address: &Address) -> bool {
        self.validators.contains(address)
    }

    /// Block the validator signed inside the current anti-repeat window, as
    /// seen by the block at `number`.
    pub fn recently_signed(&self, number: u64, validator: &Address) -> Option<u64> {
        let limit = self.validators.recents_limit();
        self.recents
            .iter()
            .find(|&(&block, signer)| signer == validator && block + limit > number)
            .map(|(&block, _)| block)
    }

    /// Apply consecutive headers and return the derived snapshot.
    ///
    /// Headers must start at `self.number() + 1`. The first failing header
    /// aborts the whole batch; `self` is never modified.
    #[tracing::instrument(skip_all, fields(from = self.number, count = headers.len()))]
    pub fn apply(
        &self,
        headers: &[BlockHeader],
        epoch: u64,
        recovery: &dyn SignerRecovery,
        codec: &dyn ValidatorSetCodec,
    ) -> ConsensusResult<Snapshot> {
        if headers.is_empty() {
            return Ok(self.clone());
        }

        let mut snap = self.clone();

        for header in headers {
            let number = header.number;
            let expected = snap.number + 1;
            if number != expected {
                return Err(ConsensusError::InvalidVotingChain {
                    expected,
                    actual: number,
                });
            }

            // Oldest entry leaves the window so its signer may sign again
            let limit = snap.validators.recents_limit();
            if number >= limit {
                snap.recents.remove(&(number - limit));
            }

            let signer = recover(header, recovery)?;

            if !snap.validators.contains(&signer) {
                return Err(ConsensusError::UnauthorizedSigner { number, signer });
            }

            if let Some((&recent_block, _)) = snap.recents.iter().find(|(_, s)| **s == signer) {
                return Err(ConsensusError::RecentlySigned {
                    number,
                    signer,
                    recent_block,
                });
            }

            snap.recents.insert(number, signer);

            if epoch > 0 && number % epoch == 0 {
                let next = decode_validator_set(header, codec)?;
                let new_limit = next.recents_limit();

                if new_limit < limit {
                    for i in 0..(limit - new_limit) {
                        if let Some(stale) = number.checked_sub(new_limit + i) {
                            snap.recents.remove(&stale);
                        }
                    }
                }

                info!(
                    number,
                    old_size = snap.validators.len(),
                    new_size = next.len(),
                    "Validator set rotated at epoch boundary"
                );
                snap.validators = next;
            }

            debug!(number, signer = ?signer, "Applied header to snapshot");

            snap.number = number;
            snap.hash = header.hash();
        }

        Ok(snap)
    }
}

fn recover(header: &BlockHeader, recovery: &dyn SignerRecovery) -> ConsensusResult<Address> {
    if header.is_unsigned() {
        return Err(ConsensusError::MissingSignature {
            number: header.number,
        });
    }
    recovery
        .recover_signer(&header.seal_hash(), &header.signature)
        .ok_or(ConsensusError::SignatureRecovery {
            number: header.number,
            reason: "unrecoverable signature".to_string(),
        })
}

fn decode_validator_set(
    header: &BlockHeader,
    codec: &dyn ValidatorSetCodec,
) -> ConsensusResult<ValidatorSet> {
    let validators = codec
        .decode_validators(&header.extra_data)
        .map_err(|reason| ConsensusError::InvalidExtraData {
            number: header.number,
            reason,
        })?;
    let set = ValidatorSet::new(validators);
    if set.is_empty() {
        return Err(ConsensusError::InvalidExtraData {
            number: header.number,
            reason: "empty validator set".to_string(),
        });
    }
    Ok(set)
}
