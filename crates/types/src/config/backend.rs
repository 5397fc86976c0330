//! Backend marker sections.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default number of client credential sets a backend can issue.
const fn default_max_clients() -> usize {
    10_000
}

// =========================================================================
// MemoryConfig
// =========================================================================

/// Default commit latency of the in-memory ledger (10ms).
const fn default_commit_latency() -> Duration {
    Duration::from_millis(10)
}

/// In-memory backend configuration (`[memory]` section).
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use ledger_bench_types::config::MemoryConfig;
/// let config = MemoryConfig::builder()
///     .commit_latency(Duration::from_millis(5))
///     .reject_every(10)
///     .build()
///     .expect("valid memory config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MemoryConfig {
    /// Time between submission and commit of each transaction.
    #[serde(default = "default_commit_latency")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub commit_latency: Duration,
    /// Reject every n-th invocation as a ledger-level failure. 0 disables.
    #[serde(default)]
    pub reject_every: u32,
    /// Maximum client credential sets issued by one deployment.
    ///
    /// Must be > 0.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            commit_latency: default_commit_latency(),
            reject_every: 0,
            max_clients: default_max_clients(),
        }
    }
}

#[bon::bon]
impl MemoryConfig {
    /// Creates a new in-memory backend configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `max_clients` is zero.
    #[builder]
    pub fn new(
        #[builder(default = default_commit_latency())] commit_latency: Duration,
        #[builder(default)] reject_every: u32,
        #[builder(default = default_max_clients())] max_clients: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { commit_latency, reject_every, max_clients };
        config.validate()?;
        Ok(config)
    }
}

impl MemoryConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Validation {
                message: "memory.max_clients must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

// =========================================================================
// ChainConfig
// =========================================================================

/// Default block interval (1s).
const fn default_block_interval() -> Duration {
    Duration::from_secs(1)
}

/// Default maximum transactions per block.
const fn default_max_block_txs() -> usize {
    500
}

/// Default producer tick interval (5ms).
const fn default_tick_interval() -> Duration {
    Duration::from_millis(5)
}

/// Block-producing backend configuration (`[chain]` section).
///
/// A block is sealed when `max_block_txs` transactions are pending or when
/// `block_interval` has elapsed since the first pending transaction. The
/// producer checks both conditions every `tick_interval`.
///
/// # Validation Rules
///
/// - `block_interval` must be > 0
/// - `max_block_txs` must be > 0
/// - `tick_interval` must be > 0 and <= `block_interval`
/// - `max_clients` must be > 0
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use ledger_bench_types::config::ChainConfig;
/// let config = ChainConfig::builder()
///     .block_interval(Duration::from_millis(200))
///     .max_block_txs(100)
///     .build()
///     .expect("valid chain config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChainConfig {
    /// Maximum wait between the first pending transaction and its block seal.
    #[serde(default = "default_block_interval")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub block_interval: Duration,
    /// Maximum transactions sealed into one block.
    #[serde(default = "default_max_block_txs")]
    pub max_block_txs: usize,
    /// How often the block producer checks the seal conditions.
    #[serde(default = "default_tick_interval")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub tick_interval: Duration,
    /// Maximum client credential sets issued by one deployment.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            block_interval: default_block_interval(),
            max_block_txs: default_max_block_txs(),
            tick_interval: default_tick_interval(),
            max_clients: default_max_clients(),
        }
    }
}

#[bon::bon]
impl ChainConfig {
    /// Creates a new block-producing backend configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any rule in the type-level
    /// documentation is violated.
    #[builder]
    pub fn new(
        #[builder(default = default_block_interval())] block_interval: Duration,
        #[builder(default = default_max_block_txs())] max_block_txs: usize,
        #[builder(default = default_tick_interval())] tick_interval: Duration,
        #[builder(default = default_max_clients())] max_clients: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { block_interval, max_block_txs, tick_interval, max_clients };
        config.validate()?;
        Ok(config)
    }
}

impl ChainConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_interval.is_zero() {
            return Err(ConfigError::Validation {
                message: "chain.block_interval must be > 0".to_string(),
            });
        }
        if self.max_block_txs == 0 {
            return Err(ConfigError::Validation {
                message: "chain.max_block_txs must be > 0".to_string(),
            });
        }
        if self.tick_interval.is_zero() || self.tick_interval > self.block_interval {
            return Err(ConfigError::Validation {
                message: format!(
                    "chain.tick_interval ({:?}) must be > 0 and <= block_interval ({:?})",
                    self.tick_interval, self.block_interval
                ),
            });
        }
        if self.max_clients == 0 {
            return Err(ConfigError::Validation {
                message: "chain.max_clients must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
