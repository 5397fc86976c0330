//! The capability contract every ledger backend implements.
//!
//! The facade drives backends exclusively through [`LedgerAdapter`]. A
//! production SDK adapter implements the same seven operations as the
//! simulated backends shipped with this crate.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use ledger_bench_types::{BackendKind, ContractSpec, TxOutcome};

use crate::error::Result;

/// Length of the per-client secret issued with each credential set.
pub const CLIENT_SECRET_LEN: usize = 32;

/// Opaque credential material for one benchmark client.
///
/// Produced by [`LedgerAdapter::create_clients`]; ownership moves to the
/// caller, which hands it back when requesting a context.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    client_id: String,
    backend: BackendKind,
    secret: [u8; CLIENT_SECRET_LEN],
}

impl ClientCredentials {
    /// Generates a fresh credential set with a random client id and secret.
    #[must_use]
    pub fn generate(backend: BackendKind) -> Self {
        Self { client_id: uuid::Uuid::new_v4().to_string(), backend, secret: rand::random() }
    }

    /// Client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Backend that issued these credentials.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub(crate) fn secret(&self) -> &[u8; CLIENT_SECRET_LEN] {
        &self.secret
    }

    /// Short hex prefix of the secret, safe for logs.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.secret[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("backend", &self.backend)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Backend-side handle for an acquired context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub(crate) handle: u64,
    pub(crate) client_id: String,
}

impl Session {
    /// Backend-assigned session number.
    #[must_use]
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// Client the session is bound to.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// Operations a ledger backend exposes to the facade.
///
/// Ledger rejections and timeouts resolve as `failed` records. `Err` is
/// reserved for setup failures and infrastructure faults.
#[async_trait]
pub trait LedgerAdapter: Send + Sync + fmt::Debug {
    /// Backend variant implemented by this adapter.
    fn kind(&self) -> BackendKind;

    /// One-time network setup.
    async fn init(&self) -> Result<()>;

    /// Issues exactly `count` client credential sets.
    async fn create_clients(&self, count: usize) -> Result<Vec<ClientCredentials>>;

    /// Deploys the given contracts.
    async fn install_smart_contract(&self, contracts: &[ContractSpec]) -> Result<()>;

    /// Binds a session to one credential set.
    async fn get_context(&self, name: &str, credentials: &ClientCredentials) -> Result<Session>;

    /// Tears down a session.
    async fn release_context(&self, session: &Session) -> Result<()>;

    /// Submits one contract invocation and waits up to `timeout` for it to
    /// commit.
    async fn invoke_smart_contract(
        &self,
        session: &Session,
        contract_id: &str,
        version: &str,
        args: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TxOutcome>;

    /// Reads committed state for `key`.
    async fn query_state(
        &self,
        session: &Session,
        contract_id: &str,
        version: &str,
        key: &str,
    ) -> Result<TxOutcome>;
}
