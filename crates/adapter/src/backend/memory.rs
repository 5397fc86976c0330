//! In-process ledger that commits each transaction after a fixed latency.
//!
//! Besides the configured behaviour (`commit_latency`, `reject_every`), the
//! backend supports operator fault injection for resilience runs:
//!
//! - [`MemoryLedger::inject_unavailable`]: the next N invoke, query or
//!   release calls fail with an infrastructure error instead of completing.
//! - [`MemoryLedger::set_extra_latency`]: adds latency to every invocation.

use std::{
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use ledger_bench_types::{BackendKind, ContractSpec, MemoryConfig, TxOutcome, now_millis};
use tracing::{debug, info, instrument};

use super::{
    registry::{ClientRegistry, Lifecycle},
    world::{Rejection, WorldState},
};
use crate::{
    adapter::{ClientCredentials, LedgerAdapter, Session},
    error::{ContextSnafu, DeploymentSnafu, InvocationSnafu, ProvisioningSnafu, QuerySnafu, Result},
};

const KIND: BackendKind = BackendKind::Memory;

/// In-memory ledger backend (`[memory]` section).
#[derive(Debug)]
pub struct MemoryLedger {
    config: MemoryConfig,
    lifecycle: Lifecycle,
    clients: ClientRegistry,
    world: WorldState,
    /// Invocations seen, used for `reject_every`.
    invocations: AtomicU64,
    /// Number of unavailable errors to inject for the next calls.
    unavailable_count: AtomicUsize,
    /// Extra latency added to every invocation (milliseconds).
    extra_latency_ms: AtomicU64,
}

impl MemoryLedger {
    /// Creates a backend from its configuration section.
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        let clients = ClientRegistry::new(KIND, config.max_clients);
        Self {
            config,
            lifecycle: Lifecycle::default(),
            clients,
            world: WorldState::default(),
            invocations: AtomicU64::new(0),
            unavailable_count: AtomicUsize::new(0),
            extra_latency_ms: AtomicU64::new(0),
        }
    }

    /// Returns the configuration this backend runs with.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Makes the next `count` invoke, query or release calls fail with an
    /// infrastructure error.
    pub fn inject_unavailable(&self, count: usize) {
        self.unavailable_count.store(count, Ordering::SeqCst);
    }

    /// Adds `latency` on top of `commit_latency` for every invocation.
    pub fn set_extra_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.extra_latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Clears all injected faults.
    pub fn reset_faults(&self) {
        self.unavailable_count.store(0, Ordering::SeqCst);
        self.extra_latency_ms.store(0, Ordering::SeqCst);
    }

    /// Number of sessions currently open.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.clients.active_sessions()
    }

    /// Consumes one pending injected failure, if any.
    fn should_inject_unavailable(&self) -> bool {
        self.unavailable_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn commit_latency(&self) -> Duration {
        self.config.commit_latency
            + Duration::from_millis(self.extra_latency_ms.load(Ordering::SeqCst))
    }

    /// Returns the policy rejection for this invocation, if it is one.
    fn policy_rejection(&self) -> Option<Rejection> {
        let n = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
        let every = u64::from(self.config.reject_every);
        (every > 0 && n % every == 0).then_some(Rejection::Policy(n))
    }
}

#[async_trait]
impl LedgerAdapter for MemoryLedger {
    fn kind(&self) -> BackendKind {
        KIND
    }

    #[instrument(skip(self))]
    async fn init(&self) -> Result<()> {
        self.lifecycle.begin(KIND)?;
        info!(
            commit_latency_ms = self.config.commit_latency.as_millis(),
            reject_every = self.config.reject_every,
            "Memory ledger initialized"
        );
        Ok(())
    }

    async fn create_clients(&self, count: usize) -> Result<Vec<ClientCredentials>> {
        if !self.lifecycle.is_initialized() {
            return ProvisioningSnafu {
                backend: KIND,
                requested: count,
                message: "ledger not initialized",
            }
            .fail();
        }
        self.clients.issue(count)
    }

    async fn install_smart_contract(&self, contracts: &[ContractSpec]) -> Result<()> {
        if !self.lifecycle.is_initialized() {
            return DeploymentSnafu { backend: KIND, message: "ledger not initialized" }.fail();
        }
        self.world.install(KIND, contracts)
    }

    async fn get_context(&self, name: &str, credentials: &ClientCredentials) -> Result<Session> {
        if !self.lifecycle.is_initialized() {
            return ContextSnafu { message: "memory ledger not initialized" }.fail();
        }
        self.clients.open(name, credentials)
    }

    async fn release_context(&self, session: &Session) -> Result<()> {
        if self.should_inject_unavailable() {
            return ContextSnafu {
                message: format!("injected unavailable releasing session {}", session.handle),
            }
            .fail();
        }
        self.clients.close(session)
    }

    #[instrument(skip(self, session, args), fields(handle = session.handle))]
    async fn invoke_smart_contract(
        &self,
        session: &Session,
        contract_id: &str,
        version: &str,
        args: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TxOutcome> {
        if !self.lifecycle.is_initialized() {
            return InvocationSnafu { backend: KIND, message: "ledger not initialized" }.fail();
        }
        if self.should_inject_unavailable() {
            return InvocationSnafu { backend: KIND, message: "injected unavailable" }.fail();
        }

        let mut tx = TxOutcome::submitted(uuid::Uuid::new_v4().to_string(), KIND);
        let write = match self.world.prepare(contract_id, version, args) {
            Ok(write) => write,
            Err(rejection) => return Ok(rejection.resolve(tx)),
        };
        if let Some(rejection) = self.policy_rejection() {
            debug!(%rejection, "Invocation rejected");
            return Ok(rejection.resolve(tx));
        }

        let latency = self.commit_latency();
        if latency > timeout {
            tokio::time::sleep(timeout).await;
            return Ok(super::timed_out(tx));
        }

        tokio::time::sleep(latency).await;
        self.world.apply(&write);
        let committed_at = now_millis().max(tx.time_create);
        tx.mark_success(committed_at);
        Ok(tx)
    }

    async fn query_state(
        &self,
        _session: &Session,
        contract_id: &str,
        version: &str,
        key: &str,
    ) -> Result<TxOutcome> {
        if !self.lifecycle.is_initialized() {
            return QuerySnafu { backend: KIND, message: "ledger not initialized" }.fail();
        }
        if self.should_inject_unavailable() {
            return QuerySnafu { backend: KIND, message: "injected unavailable" }.fail();
        }
        Ok(super::read_committed(&self.world, KIND, contract_id, version, key))
    }
}
