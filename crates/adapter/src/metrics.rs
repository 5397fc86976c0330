//! Facade-side metrics for benchmark observability.
//!
//! A pluggable trait ([`BenchMetrics`]) lets the harness collect telemetry
//! from the facade without this crate choosing an exporter. Two
//! implementations are included:
//!
//! - [`NoopBenchMetrics`]: Default that discards everything.
//! - [`MetricsBenchMetrics`]: Forwards to the [`metrics`](https://docs.rs/metrics) crate
//!   facade, so whatever recorder the process installs receives the values.
//!
//! # Metric Names
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `ledger_bench_operations_total` | Counter | `backend`, `operation`, `status` | Facade operations by outcome |
//! | `ledger_bench_operation_duration_seconds` | Histogram | `backend`, `operation` | Facade operation latency |
//! | `ledger_bench_tx_outcomes_total` | Counter | `backend`, `status` | Outcome records by final status |
//! | `ledger_bench_contexts_active` | Gauge | `backend` | Contexts acquired and not yet released |

use std::{fmt, sync::Arc, time::Duration};

use ledger_bench_types::{BackendKind, TxStatus};

/// Facade operations reported to [`BenchMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `init`
    Init,
    /// `create_clients`
    CreateClients,
    /// `install_smart_contract`
    InstallSmartContract,
    /// `get_context`
    GetContext,
    /// `release_context`
    ReleaseContext,
    /// `invoke_smart_contract`
    InvokeSmartContract,
    /// `query_state`
    QueryState,
}

impl Operation {
    /// Label value used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::CreateClients => "create_clients",
            Self::InstallSmartContract => "install_smart_contract",
            Self::GetContext => "get_context",
            Self::ReleaseContext => "release_context",
            Self::InvokeSmartContract => "invoke_smart_contract",
            Self::QueryState => "query_state",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextEvent {
    /// A context was bound to client credentials.
    Acquired,
    /// A context was released.
    Released,
}

/// Trait for facade metrics collection.
///
/// All methods default to no-ops, so implementations only override what they
/// need. Implementations are shared across every worker using the facade and
/// must be `Send + Sync`.
pub trait BenchMetrics: Send + Sync + fmt::Debug {
    /// Records a completed facade operation.
    ///
    /// `success` is false only when the operation returned an error; a
    /// `failed` outcome record still counts as a successful call.
    fn record_operation(
        &self,
        backend: BackendKind,
        operation: Operation,
        duration: Duration,
        success: bool,
    ) {
        let _ = (backend, operation, duration, success);
    }

    /// Records the final status of an outcome record.
    fn record_outcome(&self, backend: BackendKind, status: TxStatus) {
        let _ = (backend, status);
    }

    /// Records a context lifecycle event.
    fn record_context(&self, backend: BackendKind, event: ContextEvent) {
        let _ = (backend, event);
    }
}

/// No-op metrics implementation.
#[derive(Debug, Clone, Copy)]
pub struct NoopBenchMetrics;

impl BenchMetrics for NoopBenchMetrics {}

/// Metrics implementation using the [`metrics`](https://docs.rs/metrics) crate facade.
///
/// All metric names use the `ledger_bench_` prefix.
#[derive(Debug, Clone, Copy)]
pub struct MetricsBenchMetrics;

mod metric_names {
    pub const OPERATIONS_TOTAL: &str = "ledger_bench_operations_total";
    pub const OPERATION_DURATION: &str = "ledger_bench_operation_duration_seconds";
    pub const TX_OUTCOMES_TOTAL: &str = "ledger_bench_tx_outcomes_total";
    pub const CONTEXTS_ACTIVE: &str = "ledger_bench_contexts_active";
}

impl BenchMetrics for MetricsBenchMetrics {
    fn record_operation(
        &self,
        backend: BackendKind,
        operation: Operation,
        duration: Duration,
        success: bool,
    ) {
        let status = if success { "success" } else { "error" };
        metrics::counter!(
            metric_names::OPERATIONS_TOTAL,
            "backend" => backend.marker(),
            "operation" => operation.as_str(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(
            metric_names::OPERATION_DURATION,
            "backend" => backend.marker(),
            "operation" => operation.as_str(),
        )
        .record(duration.as_secs_f64());
    }

    fn record_outcome(&self, backend: BackendKind, status: TxStatus) {
        metrics::counter!(
            metric_names::TX_OUTCOMES_TOTAL,
            "backend" => backend.marker(),
            "status" => status.to_string(),
        )
        .increment(1);
    }

    fn record_context(&self, backend: BackendKind, event: ContextEvent) {
        let gauge = metrics::gauge!(metric_names::CONTEXTS_ACTIVE, "backend" => backend.marker());
        match event {
            ContextEvent::Acquired => gauge.increment(1.0),
            ContextEvent::Released => gauge.decrement(1.0),
        }
    }
}

/// Creates the default metrics instance (no-op).
pub(crate) fn default_metrics() -> Arc<dyn BenchMetrics> {
    Arc::new(NoopBenchMetrics)
}
