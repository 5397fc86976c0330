//! Adapter error types.
//!
//! Every variant maps to a stable [`ErrorCode`]. Ledger rejections and
//! invoke timeouts are not errors: they resolve as `failed` outcome records.
//! These variants cover setup failures and infrastructure faults only, and
//! the facade propagates them unchanged.

use ledger_bench_types::{BackendKind, ConfigError, ErrorCode};
use snafu::{Location, Snafu};

/// Result type alias for adapter operations.
pub type Result<T, E = AdapterError> = std::result::Result<T, E>;

/// Errors surfaced by the adapter facade and its backends.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AdapterError {
    /// The network configuration does not name a usable backend.
    #[snafu(display("Configuration error at {location}: {message}"))]
    Configuration {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Backend initialization failed or was attempted twice.
    #[snafu(display("{backend} initialization failed: {message}"))]
    Initialization {
        /// Backend that failed.
        backend: BackendKind,
        /// Error description.
        message: String,
    },

    /// Fewer client credential sets could be created than requested.
    #[snafu(display("{backend} could not provision {requested} clients: {message}"))]
    Provisioning {
        /// Backend that failed.
        backend: BackendKind,
        /// Number of clients requested.
        requested: usize,
        /// Error description.
        message: String,
    },

    /// Smart contract deployment failed.
    #[snafu(display("{backend} contract deployment failed: {message}"))]
    Deployment {
        /// Backend that failed.
        backend: BackendKind,
        /// Error description.
        message: String,
    },

    /// A context could not be bound, or a released or foreign context was used.
    #[snafu(display("Context error: {message}"))]
    Context {
        /// Error description.
        message: String,
    },

    /// Infrastructure failure while submitting a transaction.
    #[snafu(display("{backend} invocation failed: {message}"))]
    Invocation {
        /// Backend that failed.
        backend: BackendKind,
        /// Error description.
        message: String,
    },

    /// Infrastructure failure while querying state.
    #[snafu(display("{backend} query failed: {message}"))]
    Query {
        /// Backend that failed.
        backend: BackendKind,
        /// Error description.
        message: String,
    },
}

impl AdapterError {
    /// Returns the stable error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration { .. } => ErrorCode::Configuration,
            Self::Initialization { .. } => ErrorCode::Initialization,
            Self::Provisioning { .. } => ErrorCode::Provisioning,
            Self::Deployment { .. } => ErrorCode::Deployment,
            Self::Context { .. } => ErrorCode::Context,
            Self::Invocation { .. } => ErrorCode::Invocation,
            Self::Query { .. } => ErrorCode::Query,
        }
    }

    /// Returns true if a driver may retry the operation.
    ///
    /// The facade itself never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<ConfigError> for AdapterError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        ConfigurationSnafu { message: err.to_string() }.build()
    }
}
