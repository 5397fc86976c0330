//! Test network configurations.
//!
//! Centralizes the small latencies and block sizes tests rely on, so test
//! modules don't scatter magic values.

use std::{collections::BTreeMap, time::Duration};

use ledger_bench_types::{ChainConfig, ContractSpec, MemoryConfig, NetworkConfig};

/// Contract id deployed by the test networks.
pub const TEST_CONTRACT_ID: &str = "simple";

/// Contract version deployed by the test networks.
pub const TEST_CONTRACT_VERSION: &str = "v0";

fn test_contract() -> ContractSpec {
    let mut init_state = BTreeMap::new();
    init_state.insert("genesis".to_string(), serde_json::json!(1));
    ContractSpec { id: TEST_CONTRACT_ID.into(), version: TEST_CONTRACT_VERSION.into(), init_state }
}

/// Returns an in-memory network suitable for tests.
///
/// - `commit_latency`: 5ms (fast commits)
/// - `reject_every`: 0 (no ledger rejections)
#[must_use]
pub fn test_memory_network() -> NetworkConfig {
    NetworkConfig {
        memory: Some(MemoryConfig {
            commit_latency: Duration::from_millis(5),
            ..MemoryConfig::default()
        }),
        chain: None,
        contracts: vec![test_contract()],
    }
}

/// Returns a block-producing network suitable for tests.
///
/// - `block_interval`: 50ms
/// - `max_block_txs`: 10
/// - `tick_interval`: 1ms
#[must_use]
pub fn test_chain_network() -> NetworkConfig {
    NetworkConfig {
        memory: None,
        chain: Some(ChainConfig {
            block_interval: Duration::from_millis(50),
            max_block_txs: 10,
            tick_interval: Duration::from_millis(1),
            ..ChainConfig::default()
        }),
        contracts: vec![test_contract()],
    }
}
