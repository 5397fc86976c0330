//! Seconds-based report snapshot of an aggregate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `[min, max]` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

/// Latency bounds and sum in seconds. Bounds are `null` without commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelaySummary {
    /// Smallest latency.
    pub min: Option<f64>,
    /// Largest latency.
    pub max: Option<f64>,
    /// Sum of latencies.
    pub sum: f64,
    /// Per-record latencies, present only in detail mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<f64>,
}

/// Report-facing view of a [`crate::TxStats`].
///
/// Times are in seconds; throughput keys are whole-second buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxStatsSummary {
    /// Committed transactions.
    pub succ: u64,
    /// Transactions that did not commit.
    pub fail: u64,
    /// Submission time bounds over all records.
    pub create: Option<Window>,
    /// Commit time bounds over committed records.
    pub valid: Option<Window>,
    /// Latency statistics over committed records.
    pub delay: DelaySummary,
    /// Committed transactions per bucket.
    pub throughput: BTreeMap<u64, u64>,
    /// Auxiliary caller values.
    pub out: Vec<serde_json::Value>,
}
