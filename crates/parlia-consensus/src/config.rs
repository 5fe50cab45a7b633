//! Chain configuration
//!
//! Loaded once and read-only afterwards. Sources, lowest precedence first:
//! built-in defaults, a JSON document, `PARLIA_*` environment variables.

use crate::adapters::DEFAULT_SNAPSHOT_CACHE_SIZE;
use crate::domain::{BackoffConfig, ConsensusError, Fork, ForkActivation, ForkSchedule};
use serde::Deserialize;
use std::env;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed configuration: {0}")]
    Parse(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for ConsensusError {
    fn from(err: ConfigError) -> Self {
        ConsensusError::Config(err.to_string())
    }
}

/// Parlia chain parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParliaConfig {
    /// Target seconds between blocks
    pub period: u64,
    /// Blocks between validator-set checkpoints
    pub epoch: u64,
    pub forks: ForkSchedule,
    pub backoff: BackoffConfig,
    pub snapshot_cache_size: usize,
    /// Reject headers this many seconds ahead of the local clock. Disabled
    /// when `None`.
    pub max_future_drift_secs: Option<u64>,
}

impl Default for ParliaConfig {
    fn default() -> Self {
        Self {
            period: 3,
            epoch: 200,
            forks: ForkSchedule::new(),
            backoff: BackoffConfig::default(),
            snapshot_cache_size: DEFAULT_SNAPSHOT_CACHE_SIZE,
            max_future_drift_secs: None,
        }
    }
}

impl ParliaConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    ///
    /// # Environment Variables
    ///
    /// - `PARLIA_PERIOD`: block period in seconds (default: 3)
    /// - `PARLIA_EPOCH`: epoch length in blocks (default: 200)
    /// - `PARLIA_RAMANUJAN_BLOCK`: Ramanujan activation height (default: never)
    /// - `PARLIA_INITIAL_BACKOFF`: post-fork backoff of the first no-turn slot (default: 1)
    /// - `PARLIA_BACKOFF_STEP`: post-fork backoff per further slot (default: 1)
    /// - `PARLIA_SNAPSHOT_CACHE`: cached snapshots (default: 128)
    /// - `PARLIA_MAX_FUTURE_DRIFT`: clock drift bound in seconds (default: disabled)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `PARLIA_*` overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(period) = env_u64("PARLIA_PERIOD")? {
            self.period = period;
        }
        if let Some(epoch) = env_u64("PARLIA_EPOCH")? {
            self.epoch = epoch;
        }
        if let Some(block) = env_u64("PARLIA_RAMANUJAN_BLOCK")? {
            self.forks = self.forks.with(Fork::Ramanujan, ForkActivation::Block(block));
        }
        if let Some(secs) = env_u64("PARLIA_INITIAL_BACKOFF")? {
            self.backoff.initial_backoff_secs = secs;
        }
        if let Some(secs) = env_u64("PARLIA_BACKOFF_STEP")? {
            self.backoff.backoff_step_secs = secs;
        }
        if let Some(size) = env_u64("PARLIA_SNAPSHOT_CACHE")? {
            self.snapshot_cache_size = size as usize;
        }
        if let Some(secs) = env_u64("PARLIA_MAX_FUTURE_DRIFT")? {
            self.max_future_drift_secs = Some(secs);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::Invalid("period must be positive".into()));
        }
        if self.epoch == 0 {
            return Err(ConfigError::Invalid("epoch must be positive".into()));
        }
        if self.snapshot_cache_size == 0 {
            return Err(ConfigError::Invalid(
                "snapshot_cache_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn env_u64(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}
