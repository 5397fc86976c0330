//! Proptest strategies for benchmark outcome records.
//!
//! Strategies produce records that satisfy the record contract (committed
//! records carry `time_valid >= time_create`, others carry none), so
//! properties can focus on aggregation rather than validation.
//!
//! # Usage
//!
//! ```no_run
//! use ledger_bench_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(records in strategies::arb_outcomes(32)) {
//!         // test invariant over a random batch of records
//!     }
//! }
//! ```

use ledger_bench_types::{TxOutcome, TxStatus};
use proptest::prelude::*;

/// Submission times span roughly one minute of benchmark run.
const CREATE_RANGE_MS: std::ops::Range<u64> = 1_700_000_000_000..1_700_000_060_000;

/// Largest generated commit latency.
const MAX_LATENCY_MS: u64 = 5_000;

/// Generates an arbitrary [`TxStatus`], weighted towards successes.
pub fn arb_status() -> impl Strategy<Value = TxStatus> {
    prop_oneof![
        6 => Just(TxStatus::Success),
        3 => Just(TxStatus::Failed),
        1 => Just(TxStatus::Created),
    ]
}

/// Generates a single well-formed [`TxOutcome`].
///
/// Latencies fall in `0..=5000` ms and include exact half-second boundaries
/// often enough to exercise bucket rounding.
pub fn arb_outcome() -> impl Strategy<Value = TxOutcome> {
    (
        "[a-f0-9]{8}",
        arb_status(),
        CREATE_RANGE_MS,
        prop_oneof![0u64..=MAX_LATENCY_MS, (0u64..=10).prop_map(|half| half * 500)],
    )
        .prop_map(|(id, status, time_create, latency)| {
            let mut tx = TxOutcome::created(id, time_create);
            match status {
                TxStatus::Success => tx.mark_success(time_create + latency),
                TxStatus::Failed => tx.mark_failed(),
                TxStatus::Created => {},
            }
            tx
        })
}

/// Generates `0..=max_len` well-formed outcome records.
pub fn arb_outcomes(max_len: usize) -> impl Strategy<Value = Vec<TxOutcome>> {
    proptest::collection::vec(arb_outcome(), 0..=max_len)
}

/// Generates records plus an assignment of each record to one of `parts`
/// worker groups.
///
/// Returns `(records, groups, parts)` where `groups[i] < parts` names the
/// group of `records[i]` and `1 <= parts <= max_parts`. Groups may be empty.
pub fn arb_partitioned_outcomes(
    max_len: usize,
    max_parts: usize,
) -> impl Strategy<Value = (Vec<TxOutcome>, Vec<usize>, usize)> {
    (1..=max_parts.max(1)).prop_flat_map(move |parts| {
        arb_outcomes(max_len).prop_flat_map(move |records| {
            let len = records.len();
            (Just(records), proptest::collection::vec(0..parts, len), Just(parts))
        })
    })
}
