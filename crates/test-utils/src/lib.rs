//! Shared test utilities for the ledger benchmark crates.
//!
//! - [`strategies`] - Proptest generators for outcome records and partitions
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`test_memory_network`] / [`test_chain_network`] - Fast network configurations

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

mod assertions;
pub use assertions::assert_eventually;

mod config;
pub use config::{TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, test_chain_network, test_memory_network};

pub mod strategies;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use ledger_bench_types::BackendKind;

    use super::*;

    // ============================================
    // assert_eventually tests
    // ============================================

    #[tokio::test]
    async fn test_assert_eventually_immediate_success() {
        let result = assert_eventually(Duration::from_millis(100), || true).await;
        assert!(result, "immediately true condition should succeed");
    }

    #[tokio::test]
    async fn test_assert_eventually_delayed_success() {
        let counter = AtomicUsize::new(0);
        let result = assert_eventually(Duration::from_millis(500), || {
            let val = counter.fetch_add(1, Ordering::SeqCst);
            val >= 3
        })
        .await;
        assert!(result, "condition should eventually become true");
        assert!(counter.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assert_eventually_timeout() {
        let result = assert_eventually(Duration::from_millis(50), || false).await;
        assert!(!result, "never-true condition should timeout");
    }

    // ============================================
    // Config helper tests
    // ============================================

    #[test]
    fn test_memory_network_is_valid() {
        let config = test_memory_network();
        config.validate().expect("valid memory network");
        assert_eq!(config.backend_markers(), vec![BackendKind::Memory]);
        assert_eq!(config.contracts[0].id, TEST_CONTRACT_ID);
    }

    #[test]
    fn test_chain_network_is_valid() {
        let config = test_chain_network();
        config.validate().expect("valid chain network");
        assert_eq!(config.backend_markers(), vec![BackendKind::Chain]);
        assert_eq!(config.contracts[0].version, TEST_CONTRACT_VERSION);
    }
}
