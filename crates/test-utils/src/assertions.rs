//! Test assertion helpers.
//!
//! Provides polling-based assertions for async test scenarios.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Default polling interval for [`assert_eventually`].
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls a condition until it returns true or the timeout expires.
///
/// Uses tokio's clock, so it cooperates with paused-time tests: a block
/// producer ticking in the background advances while this helper sleeps.
///
/// # Returns
///
/// `true` if the condition became true before timeout, `false` otherwise.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use ledger_bench_test_utils::assert_eventually;
///
/// # async fn example(pending: impl Fn() -> usize) {
/// let drained = assert_eventually(Duration::from_millis(200), || pending() == 0).await;
/// assert!(drained, "block producer should drain the queue");
/// # }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(DEFAULT_POLL_INTERVAL).await;
    }

    // Final check after timeout
    condition()
}
