//! Block-producing ledger.
//!
//! ## Architecture
//!
//! `init` spawns a block producer task. Invocations are validated, queued,
//! and sealed into a block either:
//! - When `max_block_txs` transactions are pending
//! - When `block_interval` elapses since the first pending transaction
//!
//! Both conditions are checked every `tick_interval`. Each submitter holds a
//! `oneshot::Receiver` that resolves with the block it landed in. A
//! submitter that stops waiting (its timeout expired) does not remove the
//! transaction: it may still be sealed later, as on a real network.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use ledger_bench_types::{BackendKind, BlockHeight, ChainConfig, ContractSpec, TxOutcome, now_millis};
use parking_lot::Mutex;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{Instant, interval},
};
use tracing::{debug, info, instrument, warn};

use super::{
    registry::{ClientRegistry, Lifecycle},
    world::{ContractWrite, WorldState},
};
use crate::{
    adapter::{ClientCredentials, LedgerAdapter, Session},
    error::{
        ContextSnafu, DeploymentSnafu, InvocationSnafu, ProvisioningSnafu, QuerySnafu, Result,
    },
};

const KIND: BackendKind = BackendKind::Chain;

/// Where and when a transaction was sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sealed {
    height: BlockHeight,
    time_valid: u64,
}

/// A transaction waiting for a block.
struct PendingTx {
    write: ContractWrite,
    response_tx: oneshot::Sender<Sealed>,
    queued_at: Instant,
}

/// Queue shared between submitters and the producer.
struct MempoolState {
    pending: VecDeque<PendingTx>,
    /// Time when the oldest pending transaction was queued.
    first_pending_at: Option<Instant>,
}

impl MempoolState {
    fn new() -> Self {
        Self { pending: VecDeque::new(), first_pending_at: None }
    }

    fn push(&mut self, tx: PendingTx) {
        if self.first_pending_at.is_none() {
            self.first_pending_at = Some(tx.queued_at);
        }
        self.pending.push_back(tx);
    }

    /// Takes up to `max` transactions; the remainder keeps its queue time.
    fn take_block(&mut self, max: usize) -> Vec<PendingTx> {
        let take = self.pending.len().min(max);
        let block: Vec<PendingTx> = self.pending.drain(..take).collect();
        self.first_pending_at = self.pending.front().map(|tx| tx.queued_at);
        block
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn should_seal(&self, config: &ChainConfig) -> bool {
        if self.pending.len() >= config.max_block_txs {
            return true;
        }
        self.first_pending_at.is_some_and(|first_at| first_at.elapsed() >= config.block_interval)
    }
}

impl fmt::Debug for MempoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MempoolState").field("pending", &self.pending.len()).finish()
    }
}

/// Background task sealing pending transactions into blocks.
struct BlockProducer {
    mempool: Arc<Mutex<MempoolState>>,
    world: Arc<WorldState>,
    height: Arc<AtomicU64>,
    config: ChainConfig,
}

impl BlockProducer {
    #[instrument(skip(self), name = "block_producer")]
    async fn run(self) {
        let mut ticker = interval(self.config.tick_interval);

        info!(
            max_block_txs = self.config.max_block_txs,
            block_interval_ms = self.config.block_interval.as_millis(),
            "Starting block producer"
        );

        loop {
            ticker.tick().await;

            let block = {
                let mut mempool = self.mempool.lock();
                if mempool.should_seal(&self.config) {
                    Some(mempool.take_block(self.config.max_block_txs))
                } else {
                    None
                }
            };

            if let Some(block) = block {
                self.seal(block);
            }
        }
    }

    /// Applies a block's writes in order and notifies its submitters.
    fn seal(&self, block: Vec<PendingTx>) {
        if block.is_empty() {
            return;
        }

        let height = BlockHeight::new(self.height.fetch_add(1, Ordering::SeqCst) + 1);
        let time_valid = now_millis();
        let size = block.len();
        let mut abandoned = 0usize;

        for tx in block {
            self.world.apply(&tx.write);
            if tx.response_tx.send(Sealed { height, time_valid }).is_err() {
                abandoned += 1;
            }
        }

        if abandoned > 0 {
            warn!(block_height = %height, abandoned, "Sealed transactions whose submitters stopped waiting");
        }
        debug!(block_height = %height, size, "Block sealed");
    }
}

/// Block-producing ledger backend (`[chain]` section).
#[derive(Debug)]
pub struct ChainLedger {
    config: ChainConfig,
    lifecycle: Lifecycle,
    clients: ClientRegistry,
    world: Arc<WorldState>,
    mempool: Arc<Mutex<MempoolState>>,
    height: Arc<AtomicU64>,
    producer: Mutex<Option<JoinHandle<()>>>,
}

impl ChainLedger {
    /// Creates a backend from its configuration section.
    ///
    /// No task is spawned until [`LedgerAdapter::init`].
    #[must_use]
    pub fn new(config: ChainConfig) -> Self {
        let clients = ClientRegistry::new(KIND, config.max_clients);
        Self {
            config,
            lifecycle: Lifecycle::default(),
            clients,
            world: Arc::new(WorldState::default()),
            mempool: Arc::new(Mutex::new(MempoolState::new())),
            height: Arc::new(AtomicU64::new(0)),
            producer: Mutex::new(None),
        }
    }

    /// Returns the configuration this backend runs with.
    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Height of the most recently sealed block (0 before the first block).
    #[must_use]
    pub fn height(&self) -> BlockHeight {
        BlockHeight::new(self.height.load(Ordering::SeqCst))
    }

    /// Transactions queued and not yet sealed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.mempool.lock().len()
    }

    /// Number of sessions currently open.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.clients.active_sessions()
    }

    fn submit(&self, write: ContractWrite) -> oneshot::Receiver<Sealed> {
        let (response_tx, rx) = oneshot::channel();
        let mut mempool = self.mempool.lock();
        mempool.push(PendingTx { write, response_tx, queued_at: Instant::now() });
        if mempool.should_seal(&self.config) {
            debug!(pending = mempool.len(), "Block threshold reached, sealing on next tick");
        }
        rx
    }
}

impl Drop for ChainLedger {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.get_mut().take() {
            producer.abort();
        }
    }
}

#[async_trait]
impl LedgerAdapter for ChainLedger {
    fn kind(&self) -> BackendKind {
        KIND
    }

    #[instrument(skip(self))]
    async fn init(&self) -> Result<()> {
        self.lifecycle.begin(KIND)?;
        let producer = BlockProducer {
            mempool: Arc::clone(&self.mempool),
            world: Arc::clone(&self.world),
            height: Arc::clone(&self.height),
            config: self.config.clone(),
        };
        *self.producer.lock() = Some(tokio::spawn(producer.run()));
        info!("Chain ledger initialized");
        Ok(())
    }

    async fn create_clients(&self, count: usize) -> Result<Vec<ClientCredentials>> {
        if !self.lifecycle.is_initialized() {
            return ProvisioningSnafu {
                backend: KIND,
                requested: count,
                message: "chain not initialized",
            }
            .fail();
        }
        self.clients.issue(count)
    }

    async fn install_smart_contract(&self, contracts: &[ContractSpec]) -> Result<()> {
        if !self.lifecycle.is_initialized() {
            return DeploymentSnafu { backend: KIND, message: "chain not initialized" }.fail();
        }
        self.world.install(KIND, contracts)
    }

    async fn get_context(&self, name: &str, credentials: &ClientCredentials) -> Result<Session> {
        if !self.lifecycle.is_initialized() {
            return ContextSnafu { message: "chain not initialized" }.fail();
        }
        self.clients.open(name, credentials)
    }

    async fn release_context(&self, session: &Session) -> Result<()> {
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
            return InvocationSnafu { backend: KIND, message: "chain not initialized" }.fail();
        }

        let mut tx = TxOutcome::submitted(uuid::Uuid::new_v4().to_string(), KIND);
        let write = match self.world.prepare(contract_id, version, args) {
            Ok(write) => write,
            Err(rejection) => return Ok(rejection.resolve(tx)),
        };

        let rx = self.submit(write);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(sealed)) => {
                tx.mark_success(sealed.time_valid.max(tx.time_create));
                tx.extensions.insert("block_height", sealed.height.value());
                Ok(tx)
            },
            Ok(Err(_)) => {
                InvocationSnafu { backend: KIND, message: "block producer stopped" }.fail()
            },
            Err(_) => Ok(super::timed_out(tx)),
        }
    }

    async fn query_state(
        &self,
        _session: &Session,
        contract_id: &str,
        version: &str,
        key: &str,
    ) -> Result<TxOutcome> {
        if !self.lifecycle.is_initialized() {
            return QuerySnafu { backend: KIND, message: "chain not initialized" }.fail();
        }
        let mut tx = super::read_committed(&self.world, KIND, contract_id, version, key);
        tx.extensions.insert("block_height", self.height().value());
        Ok(tx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use ledger_bench_test_utils::{
        TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, assert_eventually, test_chain_network,
    };
    use ledger_bench_types::{ErrorCode, TxStatus};
    use serde_json::json;

    use super::*;

    fn config() -> ChainConfig {
        test_chain_network().chain.unwrap()
    }

    async fn ready(config: ChainConfig) -> (Arc<ChainLedger>, Session) {
        let ledger = Arc::new(ChainLedger::new(config));
        ledger.init().await.unwrap();
        ledger.install_smart_contract(&test_chain_network().contracts).await.unwrap();
        let creds = ledger.create_clients(1).await.unwrap().remove(0);
        let session = ledger.get_context("test", &creds).await.unwrap();
        (ledger, session)
    }

    async fn put(ledger: &ChainLedger, session: &Session, key: &str, timeout: Duration) -> TxOutcome {
        ledger
            .invoke_smart_contract(
                session,
                TEST_CONTRACT_ID,
                TEST_CONTRACT_VERSION,
                &json!({"key": key, "value": key}),
                timeout,
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_mempool_seals_on_size() {
        let config = ChainConfig { max_block_txs: 2, ..config() };
        let mut mempool = MempoolState::new();
        let write = ContractWrite { contract_id: "c".into(), key: "k".into(), value: None };
        for _ in 0..3 {
            let (response_tx, _rx) = oneshot::channel();
            mempool.push(PendingTx { write: write.clone(), response_tx, queued_at: Instant::now() });
        }
        assert!(mempool.should_seal(&config));
        assert_eq!(mempool.take_block(config.max_block_txs).len(), 2);
        assert_eq!(mempool.len(), 1);
        assert!(mempool.first_pending_at.is_some());
        assert_eq!(mempool.take_block(config.max_block_txs).len(), 1);
        assert!(mempool.first_pending_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mempool_seals_on_interval() {
        let config = config();
        let mut mempool = MempoolState::new();
        let (response_tx, _rx) = oneshot::channel();
        mempool.push(PendingTx {
            write: ContractWrite { contract_id: "c".into(), key: "k".into(), value: None },
            response_tx,
            queued_at: Instant::now(),
        });
        assert!(!mempool.should_seal(&config));
        tokio::time::advance(config.block_interval).await;
        assert!(mempool.should_seal(&config));
    }

    #[tokio::test]
    async fn test_operations_before_init_fail() {
        let ledger = ChainLedger::new(config());
        assert_eq!(ledger.create_clients(1).await.unwrap_err().code(), ErrorCode::Provisioning);
        let creds = ClientCredentials::generate(BackendKind::Chain);
        assert_eq!(ledger.get_context("w", &creds).await.unwrap_err().code(), ErrorCode::Context);
        let session = Session { handle: 1, client_id: creds.client_id().to_owned() };
        let err = ledger
            .invoke_smart_contract(&session, "c", "v", &json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Invocation);
    }

    #[tokio::test]
    async fn test_double_init_fails() {
        let ledger = ChainLedger::new(config());
        ledger.init().await.unwrap();
        assert_eq!(ledger.init().await.unwrap_err().code(), ErrorCode::Initialization);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_seals_after_interval() {
        let (ledger, session) = ready(config()).await;
        let tx = put(&ledger, &session, "a", Duration::from_secs(5)).await;

        assert_eq!(tx.status, TxStatus::Success);
        assert_eq!(tx.extensions.get("block_height"), Some(&json!(1)));
        assert_eq!(ledger.height(), BlockHeight::new(1));

        let read = ledger.query_state(&session, TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, "a").await.unwrap();
        assert_eq!(read.result, Some(json!("a")));
        assert_eq!(read.time_valid, Some(read.time_create));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_block_shares_height() {
        let (ledger, session) = ready(ChainConfig { max_block_txs: 3, ..config() }).await;
        let session = Arc::new(session);

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    let key = format!("k{i}");
                    put(&ledger, &session, &key, Duration::from_secs(5)).await
                })
            })
            .collect();

        let mut heights = Vec::new();
        for handle in handles {
            let tx = handle.await.unwrap();
            assert_eq!(tx.status, TxStatus::Success);
            heights.push(tx.extensions.get("block_height").cloned());
        }
        assert!(heights.iter().all(|h| *h == Some(json!(1))), "{heights:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_before_seal_fails_but_tx_still_lands() {
        let config = ChainConfig { block_interval: Duration::from_secs(10), ..config() };
        let (ledger, session) = ready(config).await;

        let tx = put(&ledger, &session, "late", Duration::from_millis(100)).await;
        assert_eq!(tx.status, TxStatus::Failed);
        assert!(!tx.verified);
        assert_eq!(tx.extensions.get("timeout"), Some(&json!(true)));
        assert_eq!(ledger.pending_count(), 1);

        assert!(assert_eventually(Duration::from_secs(15), || ledger.pending_count() == 0).await);
        let read = ledger
            .query_state(&session, TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, "late")
            .await
            .unwrap();
        assert_eq!(read.result, Some(json!("late")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_args_rejected_without_queueing() {
        let (ledger, session) = ready(config()).await;
        let tx = ledger
            .invoke_smart_contract(
                &session,
                TEST_CONTRACT_ID,
                TEST_CONTRACT_VERSION,
                &json!("not an object"),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(tx.status, TxStatus::Failed);
        assert!(tx.verified);
        assert_eq!(ledger.pending_count(), 0);
    }
}
