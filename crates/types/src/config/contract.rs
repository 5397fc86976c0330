//! Smart contract deployment metadata.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// One smart contract to deploy during `install_smart_contract`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, bon::Builder)]
pub struct ContractSpec {
    /// Contract identifier used by invoke and query calls.
    #[builder(into)]
    pub id: String,
    /// Contract version used by invoke and query calls.
    #[builder(into)]
    pub version: String,
    /// Key/value pairs written to the contract's state at deployment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[builder(default)]
    pub init_state: BTreeMap<String, serde_json::Value>,
}

impl ContractSpec {
    /// Validates the contract metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the id or version is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "contract id must not be empty".to_string(),
            });
        }
        if self.version.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("contract '{}' has an empty version", self.id),
            });
        }
        Ok(())
    }
}
