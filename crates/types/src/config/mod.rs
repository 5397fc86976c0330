//! Network configuration for ledger benchmarking.
//!
//! A network configuration names exactly one backend through a top-level
//! marker section (`[memory]` or `[chain]`) and lists the smart contracts to
//! deploy. It is loaded from TOML or JSON. Every struct validates its values
//! at construction time via fallible builders; post-deserialization
//! validation is available via `validate()`.

// The schemars `JsonSchema` derive macro internally uses `.unwrap()` in its
// expansions.
#![allow(clippy::disallowed_methods)]

mod backend;
mod contract;

use std::path::{Path, PathBuf};

pub use backend::*;
pub use contract::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::types::BackendKind;

/// Configuration loading or validation error.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// The configuration document could not be parsed.
    #[snafu(display("failed to parse {format} config: {message}"))]
    Parse {
        /// Document format (`toml` or `json`).
        format: &'static str,
        /// Parser error description.
        message: String,
    },

    /// The configuration file could not be read.
    #[snafu(display("failed to read config {}: {source}", path.display()))]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Duration serialization using humantime format.
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Top-level configuration for one benchmarked ledger network.
///
/// # Example
///
/// ```toml
/// [memory]
/// commit_latency = "20ms"
///
/// [[contracts]]
/// id = "simple"
/// version = "v0"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NetworkConfig {
    /// Marker section selecting the in-memory backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryConfig>,
    /// Marker section selecting the block-producing backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainConfig>,
    /// Smart contracts deployed by `install_smart_contract`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<ContractSpec>,
}

impl NetworkConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input and
    /// [`ConfigError::Validation`] on out-of-range values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)
            .map_err(|e| ConfigError::Parse { format: "toml", message: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input and
    /// [`ConfigError::Validation`] on out-of-range values.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ConfigError::Parse { format: "json", message: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file. Files ending in `.json` are parsed as
    /// JSON, everything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`Self::from_toml_str`] / [`Self::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(IoSnafu { path })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }

    /// Returns true if the marker section for `kind` is present.
    #[must_use]
    pub fn has_section(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Memory => self.memory.is_some(),
            BackendKind::Chain => self.chain.is_some(),
        }
    }

    /// Backend markers present in this configuration, in probe order.
    #[must_use]
    pub fn backend_markers(&self) -> Vec<BackendKind> {
        BackendKind::PROBE_ORDER.into_iter().filter(|kind| self.has_section(*kind)).collect()
    }

    /// Validates every present section and contract.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(memory) = &self.memory {
            memory.validate()?;
        }
        if let Some(chain) = &self.chain {
            chain.validate()?;
        }
        for contract in &self.contracts {
            contract.validate()?;
        }
        Ok(())
    }

    /// Generates the JSON Schema describing this configuration format.
    #[must_use]
    pub fn json_schema() -> String {
        let schema = schemars::schema_for!(NetworkConfig);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }
}
