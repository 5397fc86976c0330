//! Lifecycle flag and client registry shared by the simulated backends.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use ledger_bench_types::BackendKind;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::{
    adapter::{CLIENT_SECRET_LEN, ClientCredentials, Session},
    error::{ContextSnafu, InitializationSnafu, ProvisioningSnafu, Result},
};

/// One-shot initialization flag.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    initialized: AtomicBool,
}

impl Lifecycle {
    /// Marks the backend initialized, failing if it already was.
    pub(crate) fn begin(&self, backend: BackendKind) -> Result<()> {
        self.initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| InitializationSnafu { backend, message: "already initialized" }.build())
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

/// Issued credentials and open sessions.
#[derive(Debug)]
pub(crate) struct ClientRegistry {
    backend: BackendKind,
    max_clients: usize,
    clients: RwLock<HashMap<String, [u8; CLIENT_SECRET_LEN]>>,
    next_session: AtomicU64,
    open_sessions: Mutex<HashSet<u64>>,
}

impl ClientRegistry {
    pub(crate) fn new(backend: BackendKind, max_clients: usize) -> Self {
        Self {
            backend,
            max_clients,
            clients: RwLock::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            open_sessions: Mutex::new(HashSet::new()),
        }
    }

    /// Issues `count` credential sets, all or nothing.
    pub(crate) fn issue(&self, count: usize) -> Result<Vec<ClientCredentials>> {
        if count > self.max_clients {
            return ProvisioningSnafu {
                backend: self.backend,
                requested: count,
                message: format!("at most {} clients per request", self.max_clients),
            }
            .fail();
        }

        let issued: Vec<ClientCredentials> =
            (0..count).map(|_| ClientCredentials::generate(self.backend)).collect();
        let mut clients = self.clients.write();
        for creds in &issued {
            clients.insert(creds.client_id().to_owned(), *creds.secret());
        }
        debug!(backend = %self.backend, count, total = clients.len(), "Issued client credentials");
        Ok(issued)
    }

    /// Opens a session after checking the credentials were issued here.
    pub(crate) fn open(&self, name: &str, credentials: &ClientCredentials) -> Result<Session> {
        if credentials.backend() != self.backend {
            return ContextSnafu {
                message: format!(
                    "credentials issued by {} cannot open a {} context",
                    credentials.backend(),
                    self.backend
                ),
            }
            .fail();
        }

        let known = self
            .clients
            .read()
            .get(credentials.client_id())
            .is_some_and(|secret| secret == credentials.secret());
        if !known {
            return ContextSnafu {
                message: format!("unknown client '{}'", credentials.client_id()),
            }
            .fail();
        }

        let handle = self.next_session.fetch_add(1, Ordering::Relaxed);
        self.open_sessions.lock().insert(handle);
        debug!(
            backend = %self.backend,
            workload = name,
            client_id = credentials.client_id(),
            key = %credentials.fingerprint(),
            handle,
            "Session opened"
        );
        Ok(Session { handle, client_id: credentials.client_id().to_owned() })
    }

    /// Closes a session opened by [`Self::open`].
    pub(crate) fn close(&self, session: &Session) -> Result<()> {
        if !self.open_sessions.lock().remove(&session.handle) {
            return ContextSnafu { message: format!("session {} is not open", session.handle) }
                .fail();
        }
        debug!(backend = %self.backend, handle = session.handle, "Session closed");
        Ok(())
    }

    pub(crate) fn active_sessions(&self) -> usize {
        self.open_sessions.lock().len()
    }
}
