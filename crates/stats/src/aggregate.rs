//! Worker-local and merged transaction statistics.
//!
//! All bounds and the delay sum are accumulated in integer milliseconds and
//! only converted to seconds when read. Merging is therefore exactly
//! associative and commutative; no result depends on the order in which
//! floating-point values were summed.

use std::collections::BTreeMap;

use ledger_bench_types::{TxOutcome, TxStatus};
use serde::{Deserialize, Serialize};

use crate::{
    error::{RecordFormatSnafu, Result},
    summary::{DelaySummary, TxStatsSummary, Window},
};

/// Milliseconds per second.
const MILLIS_PER_SEC: u64 = 1_000;

/// Converts epoch milliseconds to fractional seconds.
#[inline]
pub(crate) fn millis_to_secs(ms: u64) -> f64 {
    ms as f64 / MILLIS_PER_SEC as f64
}

/// Throughput bucket for a commit time: `round(ms / 1000)` with halves rounding up.
#[inline]
pub fn throughput_bucket(time_valid_ms: u64) -> u64 {
    time_valid_ms.saturating_add(MILLIS_PER_SEC / 2) / MILLIS_PER_SEC
}

/// Inclusive `[min, max]` range in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Smallest observed value.
    pub min: u64,
    /// Largest observed value.
    pub max: u64,
}

impl Span {
    /// A range covering a single value.
    #[must_use]
    pub const fn point(value: u64) -> Self {
        Self { min: value, max: value }
    }

    /// Smallest range covering both operands.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Converts to a seconds-based window.
    #[must_use]
    pub fn to_window(self) -> Window {
        Window { min: millis_to_secs(self.min), max: millis_to_secs(self.max) }
    }
}

/// Extends an optional span with another optional span.
fn union_opt(a: Option<Span>, b: Option<Span>) -> Option<Span> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Options controlling what [`crate::compute`] retains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsOptions {
    /// Keep every success delay so latency percentiles can be computed.
    pub detail: bool,
}

impl StatsOptions {
    /// Options retaining per-record delay detail.
    #[must_use]
    pub const fn detailed() -> Self {
        Self { detail: true }
    }
}

/// Aggregate statistics over a set of transaction outcome records.
///
/// Produced worker-locally by [`crate::compute`] and combined with
/// [`crate::merge`] or [`TxStats::merge_from`]. `create`, `valid`, and delay
/// bounds are `None` when no record contributed to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxStats {
    succ: u64,
    fail: u64,
    create: Option<Span>,
    valid: Option<Span>,
    delay: Option<Span>,
    delay_sum_ms: u64,
    throughput: BTreeMap<u64, u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    out: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    delays_ms: Vec<u64>,
    #[serde(default)]
    detail: bool,
}

impl TxStats {
    /// An aggregate over zero records; the identity element of merge.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty aggregate configured with `options`.
    #[must_use]
    pub fn with_options(options: StatsOptions) -> Self {
        Self { detail: options.detail, ..Self::default() }
    }

    /// Appends caller-supplied auxiliary values.
    #[must_use]
    pub fn with_out(mut self, values: impl IntoIterator<Item = serde_json::Value>) -> Self {
        self.out.extend(values);
        self
    }

    /// Folds one record into the aggregate.
    ///
    /// `created` and `failed` records count as failures and only contribute
    /// to the `create` bounds.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StatsError::RecordFormat`] for a `success` record
    /// without `time_valid` or with `time_valid < time_create`. The aggregate
    /// is left unchanged in that case.
    pub fn push(&mut self, record: &TxOutcome) -> Result<()> {
        let committed = match record.status {
            TxStatus::Success => {
                let Some(valid) = record.time_valid else {
                    return RecordFormatSnafu {
                        index: self.length(),
                        id: record.id.as_str(),
                        reason: "success record has no time_valid",
                    }
                    .fail();
                };
                let Some(delay) = valid.checked_sub(record.time_create) else {
                    return RecordFormatSnafu {
                        index: self.length(),
                        id: record.id.as_str(),
                        reason: format!(
                            "time_valid {valid} precedes time_create {}",
                            record.time_create
                        ),
                    }
                    .fail();
                };
                Some((valid, delay))
            },
            TxStatus::Created | TxStatus::Failed => None,
        };

        self.create = union_opt(self.create, Some(Span::point(record.time_create)));

        match committed {
            Some((valid, delay)) => {
                self.succ += 1;
                self.valid = union_opt(self.valid, Some(Span::point(valid)));
                self.delay = union_opt(self.delay, Some(Span::point(delay)));
                self.delay_sum_ms = self.delay_sum_ms.saturating_add(delay);
                *self.throughput.entry(throughput_bucket(valid)).or_insert(0) += 1;
                if self.detail {
                    self.delays_ms.push(delay);
                }
            },
            None => self.fail += 1,
        }
        Ok(())
    }

    /// Merges `other` into `self`, treating `self` as the running accumulator.
    ///
    /// Latency detail survives only when every operand that committed
    /// something retained it; otherwise the retained delays are dropped.
    pub fn merge_from(&mut self, other: &TxStats) {
        let detail = (self.detail || other.detail)
            && self.has_complete_detail()
            && other.has_complete_detail();
        self.succ += other.succ;
        self.fail += other.fail;
        self.out.extend(other.out.iter().cloned());
        self.create = union_opt(self.create, other.create);
        self.valid = union_opt(self.valid, other.valid);
        self.delay = union_opt(self.delay, other.delay);
        self.delay_sum_ms = self.delay_sum_ms.saturating_add(other.delay_sum_ms);
        for (bucket, count) in &other.throughput {
            *self.throughput.entry(*bucket).or_insert(0) += count;
        }
        if detail {
            self.delays_ms.extend_from_slice(&other.delays_ms);
        } else {
            self.delays_ms.clear();
        }
        self.detail = detail;
    }

    /// True when the retained delays cover every committed record.
    fn has_complete_detail(&self) -> bool {
        self.detail || self.succ == 0
    }

    /// Number of committed transactions.
    #[must_use]
    pub fn succ(&self) -> u64 {
        self.succ
    }

    /// Number of transactions that did not commit.
    #[must_use]
    pub fn fail(&self) -> u64 {
        self.fail
    }

    /// Number of records folded in (`succ + fail`).
    #[must_use]
    pub fn length(&self) -> u64 {
        self.succ + self.fail
    }

    /// Returns true if no record has been folded in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Submission time bounds over all records, in milliseconds.
    #[must_use]
    pub fn create_ms(&self) -> Option<Span> {
        self.create
    }

    /// Commit time bounds over committed records, in milliseconds.
    #[must_use]
    pub fn valid_ms(&self) -> Option<Span> {
        self.valid
    }

    /// Latency bounds over committed records, in milliseconds.
    #[must_use]
    pub fn delay_ms(&self) -> Option<Span> {
        self.delay
    }

    /// Sum of latencies over committed records, in milliseconds.
    #[must_use]
    pub fn delay_sum_ms(&self) -> u64 {
        self.delay_sum_ms
    }

    /// Submission time bounds, in seconds.
    #[must_use]
    pub fn create(&self) -> Option<Window> {
        self.create.map(Span::to_window)
    }

    /// Commit time bounds, in seconds.
    #[must_use]
    pub fn valid(&self) -> Option<Window> {
        self.valid.map(Span::to_window)
    }

    /// Latency bounds, in seconds.
    #[must_use]
    pub fn delay(&self) -> Option<Window> {
        self.delay.map(Span::to_window)
    }

    /// Sum of latencies, in seconds.
    #[must_use]
    pub fn delay_sum(&self) -> f64 {
        millis_to_secs(self.delay_sum_ms)
    }

    /// Committed transactions per one-second bucket.
    #[must_use]
    pub fn throughput(&self) -> &BTreeMap<u64, u64> {
        &self.throughput
    }

    /// Caller-supplied auxiliary values, in merge order.
    #[must_use]
    pub fn out(&self) -> &[serde_json::Value] {
        &self.out
    }

    /// Retained per-record latencies in milliseconds (detail mode only).
    #[must_use]
    pub fn delays_ms(&self) -> &[u64] {
        &self.delays_ms
    }

    /// Mean latency of committed transactions, in seconds.
    #[must_use]
    pub fn avg_latency(&self) -> Option<f64> {
        (self.succ > 0).then(|| self.delay_sum() / self.succ as f64)
    }

    /// Submission rate: records per second between the first and last submission.
    #[must_use]
    pub fn send_rate(&self) -> Option<f64> {
        let create = self.create?;
        let elapsed = create.max - create.min;
        (elapsed > 0).then(|| self.length() as f64 / millis_to_secs(elapsed))
    }

    /// Committed transactions per second between the first submission and
    /// the last commit.
    #[must_use]
    pub fn committed_throughput(&self) -> Option<f64> {
        let create = self.create?;
        let valid = self.valid?;
        let elapsed = valid.max.checked_sub(create.min)?;
        (elapsed > 0).then(|| self.succ as f64 / millis_to_secs(elapsed))
    }

    /// Nearest-rank latency percentile in seconds over retained delays.
    ///
    /// Returns `None` without complete detail data or when `percentile` is
    /// outside `0.0..=100.0`.
    #[must_use]
    pub fn latency_percentile(&self, percentile: f64) -> Option<f64> {
        if self.delays_ms.is_empty()
            || self.delays_ms.len() as u64 != self.succ
            || !(0.0..=100.0).contains(&percentile)
        {
            return None;
        }
        let mut sorted = self.delays_ms.clone();
        sorted.sort_unstable();
        let rank = ((percentile / 100.0) * sorted.len() as f64).ceil() as usize;
        let index = rank.saturating_sub(1).min(sorted.len() - 1);
        Some(millis_to_secs(sorted[index]))
    }

    /// Throughput buckets from the first to the last committed second, with
    /// empty seconds filled in as zero.
    #[must_use]
    pub fn throughput_series(&self) -> Vec<(u64, u64)> {
        let (Some((&first, _)), Some((&last, _))) =
            (self.throughput.first_key_value(), self.throughput.last_key_value())
        else {
            return Vec::new();
        };
        (first..=last).map(|bucket| (bucket, self.throughput.get(&bucket).copied().unwrap_or(0))).collect()
    }

    /// Seconds-based snapshot for reporting.
    #[must_use]
    pub fn summary(&self) -> TxStatsSummary {
        TxStatsSummary {
            succ: self.succ,
            fail: self.fail,
            create: self.create(),
            valid: self.valid(),
            delay: DelaySummary {
                min: self.delay.map(|d| millis_to_secs(d.min)),
                max: self.delay.map(|d| millis_to_secs(d.max)),
                sum: self.delay_sum(),
                detail: self.delays_ms.iter().copied().map(millis_to_secs).collect(),
            },
            throughput: self.throughput.clone(),
            out: self.out.clone(),
        }
    }
}
