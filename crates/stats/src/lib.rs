//! Statistics engine for ledger benchmarks.
//!
//! Reduces transaction outcome records into aggregate performance statistics
//! and merges worker-local partial aggregates into a global one.
//!
//! # Flow
//!
//! ```text
//!  worker 1 records ──► compute ──► TxStats ─┐
//!  worker 2 records ──► compute ──► TxStats ─┼──► merge ──► TxStats ──► summary()
//!  worker N records ──► compute ──► TxStats ─┘
//! ```
//!
//! Both operations are pure, synchronous, and lock-free. The result of
//! [`compute`] depends only on the multiset of its records; [`merge`] is
//! associative and commutative, so partials can be combined in any order or
//! tree shape as they become available.
//!
//! # Example
//!
//! ```
//! use ledger_bench_stats::{StatsOptions, compute, merge};
//! use ledger_bench_types::TxOutcome;
//!
//! let mut committed = TxOutcome::created("tx-1", 1_000);
//! committed.mark_success(1_500);
//! let mut rejected = TxOutcome::created("tx-2", 2_000);
//! rejected.mark_failed();
//!
//! let worker_a = compute(&[committed], StatsOptions::default())?;
//! let worker_b = compute(&[rejected], StatsOptions::default())?;
//! let total = merge(&[worker_a, worker_b])?;
//!
//! assert_eq!((total.succ(), total.fail()), (1, 1));
//! assert_eq!(total.throughput().get(&2), Some(&1));
//! # Ok::<(), ledger_bench_stats::StatsError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod aggregate;
mod error;
mod summary;

pub use aggregate::{Span, StatsOptions, TxStats, throughput_bucket};
pub use error::{Result, StatsError};
use ledger_bench_types::TxOutcome;
pub use summary::{DelaySummary, TxStatsSummary, Window};

/// Aggregates one worker's outcome records.
///
/// An empty input yields [`TxStats::empty`], whose bounds are all `None`.
///
/// # Errors
///
/// Returns [`StatsError::RecordFormat`] for the first record that violates
/// the record contract.
pub fn compute(records: &[TxOutcome], options: StatsOptions) -> Result<TxStats> {
    let mut stats = TxStats::with_options(options);
    for record in records {
        stats.push(record)?;
    }
    Ok(stats)
}

/// Merges partial aggregates into a fresh aggregate.
///
/// Folds left from the first element; the inputs are not modified.
///
/// # Errors
///
/// Returns [`StatsError::EmptyMerge`] if `parts` is empty.
pub fn merge(parts: &[TxStats]) -> Result<TxStats> {
    let (first, rest) = parts.split_first().ok_or(StatsError::EmptyMerge)?;
    let mut merged = first.clone();
    for part in rest {
        merged.merge_from(part);
    }
    Ok(merged)
}
