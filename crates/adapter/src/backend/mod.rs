//! Simulated ledger backends.
//!
//! The facade owns exactly one [`Backend`], chosen at construction. Both
//! variants implement [`LedgerAdapter`] over a shared contract world state.

mod chain;
mod memory;
mod registry;
mod world;

pub use chain::ChainLedger;
use ledger_bench_types::{BackendKind, NetworkConfig, TxOutcome, now_millis};
pub use memory::MemoryLedger;
use snafu::OptionExt;
use world::WorldState;

use crate::{
    adapter::LedgerAdapter,
    error::{ConfigurationSnafu, Result},
};

/// The backend variant driven by a facade.
#[derive(Debug)]
pub enum Backend {
    /// In-memory ledger.
    Memory(MemoryLedger),
    /// Block-producing ledger.
    Chain(ChainLedger),
}

impl Backend {
    /// Builds the variant for `kind` from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Configuration`] if the section for
    /// `kind` is missing.
    pub fn from_config(kind: BackendKind, config: &NetworkConfig) -> Result<Self> {
        let missing =
            || ConfigurationSnafu { message: format!("missing [{}] section", kind.marker()) };
        Ok(match kind {
            BackendKind::Memory => {
                Self::Memory(MemoryLedger::new(config.memory.clone().with_context(missing)?))
            },
            BackendKind::Chain => {
                Self::Chain(ChainLedger::new(config.chain.clone().with_context(missing)?))
            },
        })
    }

    /// Variant of this backend.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Memory(_) => BackendKind::Memory,
            Self::Chain(_) => BackendKind::Chain,
        }
    }

    /// The adapter contract of the selected variant.
    #[must_use]
    pub fn as_adapter(&self) -> &dyn LedgerAdapter {
        match self {
            Self::Memory(ledger) => ledger,
            Self::Chain(ledger) => ledger,
        }
    }

    /// Returns the in-memory ledger, if selected.
    #[must_use]
    pub fn as_memory(&self) -> Option<&MemoryLedger> {
        match self {
            Self::Memory(ledger) => Some(ledger),
            Self::Chain(_) => None,
        }
    }

    /// Returns the block-producing ledger, if selected.
    #[must_use]
    pub fn as_chain(&self) -> Option<&ChainLedger> {
        match self {
            Self::Chain(ledger) => Some(ledger),
            Self::Memory(_) => None,
        }
    }
}

/// Resolves `tx` as failed because its deadline passed before commit.
pub(crate) fn timed_out(mut tx: TxOutcome) -> TxOutcome {
    tx.mark_failed();
    tx.verified = false;
    tx.extensions.insert("timeout", true);
    tx
}

/// Builds the record for a state read. Reads have no validity delay.
fn read_committed(
    world: &WorldState,
    backend: BackendKind,
    contract_id: &str,
    version: &str,
    key: &str,
) -> TxOutcome {
    let now = now_millis();
    let mut tx = TxOutcome::created(uuid::Uuid::new_v4().to_string(), now);
    tx.extensions.backend = Some(backend);
    match world.read(contract_id, version, key) {
        Ok(value) => {
            tx.mark_success(now);
            tx.with_result(value)
        },
        Err(rejection) => rejection.resolve(tx),
    }
}
