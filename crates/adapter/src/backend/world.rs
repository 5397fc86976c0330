//! Contract world state for the simulated backends.
//!
//! Each installed contract owns a key/value map. An invocation's `args` must
//! be a JSON object with a string `key`; a `value` member is stored under that
//! key and its absence deletes the key.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use ledger_bench_types::{BackendKind, ContractSpec, TxOutcome};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

use crate::error::{DeploymentSnafu, Result};

/// A validated state change waiting to be applied.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ContractWrite {
    pub(crate) contract_id: String,
    pub(crate) key: String,
    pub(crate) value: Option<Value>,
}

/// Why the ledger refused a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    UnknownContract { id: String, version: String },
    MalformedArgs(&'static str),
    Policy(u64),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownContract { id, version } => {
                write!(f, "contract {id}@{version} is not installed")
            },
            Self::MalformedArgs(reason) => write!(f, "malformed args: {reason}"),
            Self::Policy(n) => write!(f, "rejected by endorsement policy (invocation #{n})"),
        }
    }
}

impl Rejection {
    /// Resolves `tx` as a confirmed ledger rejection.
    pub(crate) fn resolve(&self, mut tx: TxOutcome) -> TxOutcome {
        tx.mark_failed();
        tx.verified = true;
        tx.extensions.insert("rejection", self.to_string());
        tx
    }
}

#[derive(Debug)]
struct InstalledContract {
    version: String,
    state: BTreeMap<String, Value>,
}

/// Installed contracts and their state.
#[derive(Debug, Default)]
pub(crate) struct WorldState {
    contracts: RwLock<HashMap<String, InstalledContract>>,
}

impl WorldState {
    /// Installs every contract in `contracts`, or none of them.
    ///
    /// Reinstalling an id replaces its version and resets its state.
    pub(crate) fn install(&self, backend: BackendKind, contracts: &[ContractSpec]) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in contracts {
            if spec.id.trim().is_empty() || spec.version.trim().is_empty() {
                return DeploymentSnafu {
                    backend,
                    message: "contract id and version must be non-empty",
                }
                .fail();
            }
            if !seen.insert(spec.id.as_str()) {
                return DeploymentSnafu {
                    backend,
                    message: format!("contract '{}' listed more than once", spec.id),
                }
                .fail();
            }
        }

        let mut installed = self.contracts.write();
        for spec in contracts {
            info!(
                backend = %backend,
                contract = %spec.id,
                version = %spec.version,
                keys = spec.init_state.len(),
                "Installed contract"
            );
            installed.insert(
                spec.id.clone(),
                InstalledContract { version: spec.version.clone(), state: spec.init_state.clone() },
            );
        }
        Ok(())
    }

    /// Validates an invocation against the installed contracts.
    pub(crate) fn prepare(
        &self,
        contract_id: &str,
        version: &str,
        args: &Value,
    ) -> Result<ContractWrite, Rejection> {
        self.check_installed(contract_id, version)?;
        let args = args.as_object().ok_or(Rejection::MalformedArgs("expected a JSON object"))?;
        let key = args
            .get("key")
            .and_then(Value::as_str)
            .ok_or(Rejection::MalformedArgs("missing string 'key'"))?;
        Ok(ContractWrite {
            contract_id: contract_id.to_owned(),
            key: key.to_owned(),
            value: args.get("value").cloned(),
        })
    }

    /// Applies a prepared write. Writes to a contract removed since
    /// preparation are dropped.
    pub(crate) fn apply(&self, write: &ContractWrite) {
        let mut contracts = self.contracts.write();
        let Some(contract) = contracts.get_mut(&write.contract_id) else {
            return;
        };
        match &write.value {
            Some(value) => {
                contract.state.insert(write.key.clone(), value.clone());
            },
            None => {
                contract.state.remove(&write.key);
            },
        }
    }

    /// Reads the committed value for `key`, `null` when unset.
    pub(crate) fn read(&self, contract_id: &str, version: &str, key: &str) -> Result<Value, Rejection> {
        self.check_installed(contract_id, version)?;
        let contracts = self.contracts.read();
        Ok(contracts
            .get(contract_id)
            .and_then(|contract| contract.state.get(key))
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn check_installed(&self, contract_id: &str, version: &str) -> Result<(), Rejection> {
        let contracts = self.contracts.read();
        match contracts.get(contract_id) {
            Some(contract) if contract.version == version => Ok(()),
            _ => Err(Rejection::UnknownContract {
                id: contract_id.to_owned(),
                version: version.to_owned(),
            }),
        }
    }
}
