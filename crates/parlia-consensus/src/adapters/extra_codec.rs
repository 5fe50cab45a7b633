//! Extra-data codec
//!
//! ```text
//! non-epoch header:   [ vanity: 32 ]
//! epoch header:       [ vanity: 32 ][ validator: 20 ] * N     (N >= 1)
//! ```
//!
//! Validators are stored in ascending byte order; decoding does not re-sort.

use crate::ports::ValidatorSetCodec;
use shared_types::Address;

/// Fixed vanity prefix length.
pub const EXTRA_VANITY: usize = 32;

/// Length of one encoded validator address.
pub const VALIDATOR_BYTES: usize = 20;

#[derive(Debug, Default, Clone, Copy)]
pub struct ParliaExtraCodec;

impl ValidatorSetCodec for ParliaExtraCodec {
    fn decode_validators(&self, extra_data: &[u8]) -> Result<Vec<Address>, String> {
        if extra_data.len() < EXTRA_VANITY {
            return Err(format!(
                "extra data {} bytes, shorter than {EXTRA_VANITY}-byte vanity",
                extra_data.len()
            ));
        }
        let list = &extra_data[EXTRA_VANITY..];
        if list.len() % VALIDATOR_BYTES != 0 {
            return Err(format!(
                "validator list {} bytes, not a multiple of {VALIDATOR_BYTES}",
                list.len()
            ));
        }

        Ok(list
            .chunks_exact(VALIDATOR_BYTES)
            .map(|chunk| {
                let mut address = [0u8; VALIDATOR_BYTES];
                address.copy_from_slice(chunk);
                address
            })
            .collect())
    }

    fn validate_extra(&self, extra_data: &[u8], epoch_boundary: bool) -> Result<(), String> {
        if !epoch_boundary {
            return match extra_data.len() {
                EXTRA_VANITY => Ok(()),
                n if n < EXTRA_VANITY => Err(format!("missing vanity: {n} bytes")),
                _ => Err("validator list outside epoch boundary".to_string()),
            };
        }

        let validators = self.decode_validators(extra_data)?;
        if validators.is_empty() {
            return Err("epoch header carries no validators".to_string());
        }
        Ok(())
    }

    fn encode_extra(&self, vanity: &[u8], validators: Option<&[Address]>) -> Vec<u8> {
        let count = validators.map_or(0, <[Address]>::len);
        let mut extra = Vec::with_capacity(EXTRA_VANITY + count * VALIDATOR_BYTES);

        let take = vanity.len().min(EXTRA_VANITY);
        extra.extend_from_slice(&vanity[..take]);
        extra.resize(EXTRA_VANITY, 0);

        for validator in validators.unwrap_or_default() {
            extra.extend_from_slice(validator);
        }
        extra
    }
}
