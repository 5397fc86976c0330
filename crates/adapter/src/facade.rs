//! The adapter facade.
//!
//! [`Blockchain`] presents the seven benchmark operations over whichever
//! backend the network configuration names. The backend is detected once at
//! construction; afterwards every call is a plain delegation to it.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ledger_bench_types::{BackendKind, ContextId, NetworkConfig, TxOutcome};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::{
    adapter::ClientCredentials,
    backend::{self, Backend},
    context::Context,
    error::{ConfigurationSnafu, ContextSnafu, ProvisioningSnafu, Result},
    metrics::{BenchMetrics, ContextEvent, Operation, default_metrics},
    timeout::InvokeTimeout,
};

/// Distinguishes facade instances so contexts cannot cross between them.
static NEXT_FACADE_ID: AtomicU64 = AtomicU64::new(1);

/// Determines which backend a configuration selects.
///
/// Marker sections are probed in [`BackendKind::PROBE_ORDER`] and the first
/// one present wins. Extra markers are ignored with a warning.
///
/// # Errors
///
/// Returns [`crate::AdapterError::Configuration`] if no marker is present.
pub fn detect_backend(config: &NetworkConfig) -> Result<BackendKind> {
    let markers = config.backend_markers();
    let Some((&selected, ignored)) = markers.split_first() else {
        let expected: Vec<&str> = BackendKind::PROBE_ORDER.iter().map(|k| k.marker()).collect();
        return ConfigurationSnafu {
            message: format!("no backend section found, expected one of: {}", expected.join(", ")),
        }
        .fail();
    };
    if !ignored.is_empty() {
        warn!(
            selected = %selected,
            ignored = ?ignored,
            "Configuration names several backends; using the first in probe order"
        );
    }
    Ok(selected)
}

/// Uniform benchmark interface over one ledger backend.
///
/// The facade is `Send + Sync`; share it between workers with an [`Arc`].
#[derive(Debug)]
pub struct Blockchain {
    id: u64,
    config: NetworkConfig,
    backend: Backend,
    metrics: Arc<dyn BenchMetrics>,
    next_context: AtomicU64,
}

impl Blockchain {
    /// Validates `config` and builds the backend it selects.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Configuration`] if the configuration is
    /// invalid or names no backend.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        Self::with_metrics(config, default_metrics())
    }

    /// Like [`Self::new`], reporting to `metrics`.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_metrics(config: NetworkConfig, metrics: Arc<dyn BenchMetrics>) -> Result<Self> {
        config.validate()?;
        let kind = detect_backend(&config)?;
        let backend = Backend::from_config(kind, &config)?;
        info!(backend = %kind, contracts = config.contracts.len(), "Adapter facade ready");
        Ok(Self {
            id: NEXT_FACADE_ID.fetch_add(1, Ordering::Relaxed),
            config,
            backend,
            metrics,
            next_context: AtomicU64::new(1),
        })
    }

    /// The selected backend variant.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The validated network configuration.
    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// The backend, for variant-specific controls such as fault injection.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Runs `operation`, reporting its duration and outcome.
    async fn observe<T>(
        &self,
        operation: Operation,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = future.await;
        self.metrics.record_operation(self.kind(), operation, start.elapsed(), result.is_ok());
        if let Err(err) = &result {
            let code = err.code();
            warn!(
                %operation,
                error = %err,
                %code,
                action = code.suggested_action(),
                "Adapter operation failed"
            );
        }
        result
    }

    /// Performs one-time network setup.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Initialization`] on failure or repeat.
    #[instrument(skip(self), fields(backend = %self.kind()))]
    pub async fn init(&self) -> Result<()> {
        self.observe(Operation::Init, self.backend.as_adapter().init()).await
    }

    /// Issues exactly `count` client credential sets.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Provisioning`] if the backend cannot
    /// provide `count` sets.
    #[instrument(skip(self), fields(backend = %self.kind()))]
    pub async fn create_clients(&self, count: usize) -> Result<Vec<ClientCredentials>> {
        let kind = self.kind();
        self.observe(Operation::CreateClients, async {
            let clients = self.backend.as_adapter().create_clients(count).await?;
            if clients.len() != count {
                return ProvisioningSnafu {
                    backend: kind,
                    requested: count,
                    message: format!("backend returned {} credential sets", clients.len()),
                }
                .fail();
            }
            Ok(clients)
        })
        .await
    }

    /// Deploys the contracts listed in the network configuration.
    ///
    /// An empty contract list is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Deployment`] on failure.
    #[instrument(skip(self), fields(backend = %self.kind()))]
    pub async fn install_smart_contract(&self) -> Result<()> {
        if self.config.contracts.is_empty() {
            debug!("No contracts configured");
            return Ok(());
        }
        self.observe(
            Operation::InstallSmartContract,
            self.backend.as_adapter().install_smart_contract(&self.config.contracts),
        )
        .await
    }

    /// Binds a new context for workload `name` to `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Context`] if the credentials were not
    /// issued by this backend or the backend refuses the session.
    #[instrument(skip(self, credentials), fields(backend = %self.kind(), client_id = credentials.client_id()))]
    pub async fn get_context(&self, name: &str, credentials: &ClientCredentials) -> Result<Context> {
        let kind = self.kind();
        let session = self
            .observe(Operation::GetContext, async {
                if credentials.backend() != kind {
                    return ContextSnafu {
                        message: format!(
                            "credentials issued by {} cannot be used with {kind}",
                            credentials.backend()
                        ),
                    }
                    .fail();
                }
                self.backend.as_adapter().get_context(name, credentials).await
            })
            .await?;

        let id = ContextId::new(self.next_context.fetch_add(1, Ordering::Relaxed));
        self.metrics.record_context(kind, ContextEvent::Acquired);
        debug!(context_id = %id, "Context acquired");
        Ok(Context::new(id, self.id, name, kind, session))
    }

    /// Releases `context`. A context is released at most once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Context`] if the context was already
    /// released or belongs to another facade. If the backend fails the
    /// release, its error is returned and the context stays acquired.
    #[instrument(skip(self, context), fields(backend = %self.kind(), context_id = %context.id()))]
    pub async fn release_context(&self, context: &Context) -> Result<()> {
        self.observe(Operation::ReleaseContext, async {
            let session = context.session_for(self.id)?;
            context.begin_release()?;
            let released = self.backend.as_adapter().release_context(session).await;
            context.finish_release(released.is_ok());
            released?;
            self.metrics.record_context(self.kind(), ContextEvent::Released);
            Ok(())
        })
        .await?;
        debug!("Context released");
        Ok(())
    }

    /// Submits one contract invocation.
    ///
    /// Resolves no later than `timeout` (default 120 s). Ledger rejections and
    /// expired deadlines produce `failed` records rather than errors.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Context`] for a released or foreign
    /// context and [`crate::AdapterError::Invocation`] for infrastructure
    /// failures.
    #[instrument(
        skip(self, context, args, timeout),
        fields(backend = %self.kind(), context_id = %context.id(), contract = contract_id)
    )]
    pub async fn invoke_smart_contract(
        &self,
        context: &Context,
        contract_id: &str,
        version: &str,
        args: &serde_json::Value,
        timeout: InvokeTimeout,
    ) -> Result<TxOutcome> {
        let kind = self.kind();
        let deadline = timeout.duration();
        let outcome = self
            .observe(Operation::InvokeSmartContract, async {
                let session = context.session_for(self.id)?;
                let pending = TxOutcome::submitted(uuid::Uuid::new_v4().to_string(), kind);
                let invoke = self
                    .backend
                    .as_adapter()
                    .invoke_smart_contract(session, contract_id, version, args, deadline);
                match tokio::time::timeout(deadline, invoke).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(deadline_ms = deadline.as_millis(), "Backend overran invoke deadline");
                        Ok(backend::timed_out(pending))
                    },
                }
            })
            .await?;

        self.metrics.record_outcome(kind, outcome.status);
        debug!(tx_id = %outcome.id, status = %outcome.status, "Invocation resolved");
        Ok(outcome)
    }

    /// Reads committed contract state for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Context`] for a released or foreign
    /// context and [`crate::AdapterError::Query`] for infrastructure
    /// failures.
    #[instrument(
        skip(self, context),
        fields(backend = %self.kind(), context_id = %context.id(), contract = contract_id)
    )]
    pub async fn query_state(
        &self,
        context: &Context,
        contract_id: &str,
        version: &str,
        key: &str,
    ) -> Result<TxOutcome> {
        let outcome = self
            .observe(Operation::QueryState, async {
                let session = context.session_for(self.id)?;
                self.backend.as_adapter().query_state(session, contract_id, version, key).await
            })
            .await?;
        self.metrics.record_outcome(self.kind(), outcome.status);
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        sync::atomic::{AtomicI64, AtomicU64},
        time::Duration,
    };

    use ledger_bench_test_utils::{
        TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, test_chain_network, test_memory_network,
    };
    use ledger_bench_types::{ChainConfig, ErrorCode, MemoryConfig, TxStatus};
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        operations: AtomicU64,
        errors: AtomicU64,
        outcomes: AtomicU64,
        contexts: AtomicI64,
    }

    impl BenchMetrics for Recorder {
        fn record_operation(&self, _: BackendKind, _: Operation, _: Duration, success: bool) {
            self.operations.fetch_add(1, Ordering::SeqCst);
            if !success {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn record_outcome(&self, _: BackendKind, _: TxStatus) {
            self.outcomes.fetch_add(1, Ordering::SeqCst);
        }

        fn record_context(&self, _: BackendKind, event: ContextEvent) {
            let delta = if event == ContextEvent::Acquired { 1 } else { -1 };
            self.contexts.fetch_add(delta, Ordering::SeqCst);
        }
    }

    async fn deployed(config: NetworkConfig) -> (Blockchain, Context) {
        let chain = Blockchain::new(config).unwrap();
        chain.init().await.unwrap();
        chain.install_smart_contract().await.unwrap();
        let creds = chain.create_clients(1).await.unwrap().remove(0);
        let ctx = chain.get_context("test", &creds).await.unwrap();
        (chain, ctx)
    }

    #[test]
    fn test_detect_single_marker() {
        assert_eq!(detect_backend(&test_memory_network()).unwrap(), BackendKind::Memory);
        assert_eq!(detect_backend(&test_chain_network()).unwrap(), BackendKind::Chain);
    }

    #[test]
    fn test_detect_no_marker_is_configuration_error() {
        let err = Blockchain::new(NetworkConfig::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
        assert!(err.to_string().contains("memory, chain"));
    }

    #[test]
    fn test_detect_multiple_markers_uses_probe_order() {
        let config = NetworkConfig {
            memory: Some(MemoryConfig::default()),
            chain: Some(ChainConfig::default()),
            contracts: Vec::new(),
        };
        assert_eq!(detect_backend(&config).unwrap(), BackendKind::Memory);
        assert_eq!(Blockchain::new(config).unwrap().kind(), BackendKind::Memory);
    }

    #[test]
    fn test_invalid_section_rejected() {
        let config = NetworkConfig {
            memory: Some(MemoryConfig { max_clients: 0, ..MemoryConfig::default() }),
            ..NetworkConfig::default()
        };
        assert_eq!(Blockchain::new(config).unwrap_err().code(), ErrorCode::Configuration);
    }

    #[tokio::test]
    async fn test_create_clients_exact_count() {
        let chain = Blockchain::new(test_memory_network()).unwrap();
        chain.init().await.unwrap();
        assert!(chain.create_clients(0).await.unwrap().is_empty());
        assert_eq!(chain.create_clients(4).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_install_without_contracts_is_noop() {
        let config = NetworkConfig { contracts: Vec::new(), ..test_memory_network() };
        let chain = Blockchain::new(config).unwrap();
        chain.install_smart_contract().await.unwrap();
    }

    #[tokio::test]
    async fn test_double_release_fails() {
        let (chain, ctx) = deployed(test_memory_network()).await;
        chain.release_context(&ctx).await.unwrap();
        let err = chain.release_context(&ctx).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Context);
        assert_eq!(chain.backend().as_memory().unwrap().active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_failed_backend_release_keeps_context_acquired() {
        let recorder = Arc::new(Recorder::default());
        let chain = Blockchain::with_metrics(test_memory_network(), recorder.clone()).unwrap();
        chain.init().await.unwrap();
        let creds = chain.create_clients(1).await.unwrap().remove(0);
        let ctx = chain.get_context("test", &creds).await.unwrap();
        let memory = chain.backend().as_memory().unwrap();

        memory.inject_unavailable(1);
        let err = chain.release_context(&ctx).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Context);
        assert!(!ctx.is_released());
        assert_eq!(memory.active_sessions(), 1);
        assert_eq!(recorder.contexts.load(Ordering::SeqCst), 1);

        chain.release_context(&ctx).await.unwrap();
        assert!(ctx.is_released());
        assert_eq!(memory.active_sessions(), 0);
        assert_eq!(recorder.contexts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_released_context_cannot_invoke_or_query() {
        let (chain, ctx) = deployed(test_memory_network()).await;
        chain.release_context(&ctx).await.unwrap();

        let err = chain
            .invoke_smart_contract(
                &ctx,
                TEST_CONTRACT_ID,
                TEST_CONTRACT_VERSION,
                &json!({"key": "k"}),
                InvokeTimeout::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Context);

        let err = chain.query_state(&ctx, TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, "k").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Context);
    }

    #[tokio::test]
    async fn test_context_from_other_facade_rejected() {
        let (first, ctx) = deployed(test_memory_network()).await;
        let (second, _) = deployed(test_memory_network()).await;
        assert_eq!(second.release_context(&ctx).await.unwrap_err().code(), ErrorCode::Context);
        first.release_context(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_credentials_from_other_backend_rejected() {
        let (memory, _) = deployed(test_memory_network()).await;
        let chain = Blockchain::new(test_chain_network()).unwrap();
        chain.init().await.unwrap();
        let chain_creds = chain.create_clients(1).await.unwrap().remove(0);
        let err = memory.get_context("test", &chain_creds).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Context);
    }

    #[tokio::test]
    async fn test_contexts_have_distinct_ids() {
        let (chain, first) = deployed(test_memory_network()).await;
        let creds = chain.create_clients(1).await.unwrap().remove(0);
        let second = chain.get_context("test", &creds).await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(second.backend(), BackendKind::Memory);
        assert_eq!(second.client_id(), creds.client_id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_fails_pending_invocation() {
        let (chain, ctx) = deployed(test_memory_network()).await;
        let tx = chain
            .invoke_smart_contract(
                &ctx,
                TEST_CONTRACT_ID,
                TEST_CONTRACT_VERSION,
                &json!({"key": "k", "value": 1}),
                InvokeTimeout::from_secs(Some(0.0)),
            )
            .await
            .unwrap();
        assert_eq!(tx.status, TxStatus::Failed);
        assert!(!tx.verified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_timeout_waits_like_default() {
        let mut config = test_memory_network();
        if let Some(memory) = config.memory.as_mut() {
            memory.commit_latency = Duration::from_secs(100);
        }
        let (chain, ctx) = deployed(config).await;
        let start = Instant::now();
        let tx = chain
            .invoke_smart_contract(
                &ctx,
                TEST_CONTRACT_ID,
                TEST_CONTRACT_VERSION,
                &json!({"key": "k", "value": 1}),
                InvokeTimeout::from_secs(Some(-1.0)),
            )
            .await
            .unwrap();
        assert_eq!(tx.status, TxStatus::Success, "100s commit fits in the 120s default");
        assert!(start.elapsed() >= Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_reported() {
        let recorder = Arc::new(Recorder::default());
        let chain = Blockchain::with_metrics(test_memory_network(), recorder.clone()).unwrap();
        chain.init().await.unwrap();
        chain.install_smart_contract().await.unwrap();
        let creds = chain.create_clients(1).await.unwrap().remove(0);
        let ctx = chain.get_context("test", &creds).await.unwrap();
        assert_eq!(recorder.contexts.load(Ordering::SeqCst), 1);

        chain
            .invoke_smart_contract(
                &ctx,
                TEST_CONTRACT_ID,
                TEST_CONTRACT_VERSION,
                &json!({"key": "k", "value": 1}),
                InvokeTimeout::default(),
            )
            .await
            .unwrap();
        chain.release_context(&ctx).await.unwrap();
        chain.release_context(&ctx).await.unwrap_err();

        assert_eq!(recorder.operations.load(Ordering::SeqCst), 7);
        assert_eq!(recorder.errors.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.outcomes.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.contexts.load(Ordering::SeqCst), 0);
    }
}
