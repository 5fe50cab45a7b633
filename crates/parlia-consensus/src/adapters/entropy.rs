//! Entropy source adapters

use crate::domain::EntropyError;
use crate::ports::EntropySource;
use rand::rngs::OsRng;
use rand::RngCore;

/// Production entropy backed by the operating system CSPRNG.
///
/// Draws are unbiased: values from the incomplete top bucket of the `u64`
/// range are rejected and redrawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl OsEntropy {
    pub fn new() -> Self {
        Self
    }
}

impl EntropySource for OsEntropy {
    fn random_below(&self, bound: u64) -> Result<u64, EntropyError> {
        if bound <= 1 {
            return Ok(0);
        }

        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let mut buf = [0u8; 8];
            OsRng
                .try_fill_bytes(&mut buf)
                .map_err(|e| EntropyError::RandomSourceDegraded(e.to_string()))?;
            let value = u64::from_le_bytes(buf);
            if value < zone {
                return Ok(value % bound);
            }
        }
    }
}

/// Fixed entropy for deterministic testing.
///
/// Always returns `value % bound`.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy {
    value: u64,
}

impl FixedEntropy {
    pub fn new(value: u64) -> Self {
        Self { value }
    }
}

impl EntropySource for FixedEntropy {
    fn random_below(&self, bound: u64) -> Result<u64, EntropyError> {
        if bound == 0 {
            return Ok(0);
        }
        Ok(self.value % bound)
    }
}

/// Entropy source that always fails, for exercising the fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingEntropy;

impl EntropySource for FailingEntropy {
    fn random_below(&self, _bound: u64) -> Result<u64, EntropyError> {
        Err(EntropyError::RandomSourceDegraded(
            "entropy source unavailable".to_string(),
        ))
    }
}
