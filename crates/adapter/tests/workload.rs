//! End-to-end workloads: facade → concurrent workers → statistics.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use ledger_bench_adapter::{Blockchain, InvokeTimeout};
use ledger_bench_stats::{StatsOptions, TxStats, compute, merge};
use ledger_bench_test_utils::{
    TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, test_chain_network, test_memory_network,
};
use ledger_bench_types::{MemoryConfig, NetworkConfig, TxOutcome, TxStatus};
use serde_json::json;

const WORKERS: usize = 4;
const TXS_PER_WORKER: usize = 10;

/// Deploys `config` and runs `WORKERS` concurrent workers, each submitting
/// `TXS_PER_WORKER` invocations with `timeout`, returning per-worker records.
async fn run_workload(config: NetworkConfig, timeout: InvokeTimeout) -> Vec<Vec<TxOutcome>> {
    let chain = Arc::new(Blockchain::new(config).unwrap());
    chain.init().await.unwrap();
    chain.install_smart_contract().await.unwrap();
    let clients = chain.create_clients(WORKERS).await.unwrap();
    assert_eq!(clients.len(), WORKERS);

    let workers = clients.into_iter().enumerate().map(|(worker, creds)| {
        let chain = Arc::clone(&chain);
        tokio::spawn(async move {
            let ctx = chain.get_context("put", &creds).await.unwrap();
            let mut records = Vec::with_capacity(TXS_PER_WORKER);
            for i in 0..TXS_PER_WORKER {
                let args = json!({"key": format!("w{worker}-{i}"), "value": i});
                let tx = chain
                    .invoke_smart_contract(&ctx, TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, &args, timeout)
                    .await
                    .unwrap();
                records.push(tx);
            }
            chain.release_context(&ctx).await.unwrap();
            records
        })
    });

    join_all(workers).await.into_iter().map(Result::unwrap).collect()
}

fn per_worker_stats(records: &[Vec<TxOutcome>]) -> Vec<TxStats> {
    records.iter().map(|r| compute(r, StatsOptions::detailed()).unwrap()).collect()
}

#[tokio::test(start_paused = true)]
async fn memory_workload_merges_to_whole() {
    let records = run_workload(test_memory_network(), InvokeTimeout::default()).await;
    let partials = per_worker_stats(&records);
    let merged = merge(&partials).unwrap();

    let all: Vec<TxOutcome> = records.into_iter().flatten().collect();
    let whole = compute(&all, StatsOptions::detailed()).unwrap();

    assert_eq!(merged.succ(), (WORKERS * TXS_PER_WORKER) as u64);
    assert_eq!(merged.fail(), 0);
    assert_eq!(merged.succ(), whole.succ());
    assert_eq!(merged.delay_sum_ms(), whole.delay_sum_ms());
    assert_eq!(merged.throughput(), whole.throughput());
    assert_eq!(merged.throughput().values().sum::<u64>(), merged.succ());
    assert_eq!(merged.delays_ms().len(), WORKERS * TXS_PER_WORKER);
}

#[tokio::test(start_paused = true)]
async fn chain_workload_commits_in_blocks() {
    let records = run_workload(test_chain_network(), InvokeTimeout::default()).await;
    let all: Vec<&TxOutcome> = records.iter().flatten().collect();

    assert!(all.iter().all(|tx| tx.status == TxStatus::Success));
    let mut heights: Vec<u64> =
        all.iter().map(|tx| tx.extensions.get("block_height").unwrap().as_u64().unwrap()).collect();
    heights.sort_unstable();
    heights.dedup();
    assert!(!heights.is_empty());
    assert_eq!(heights[0], 1);

    let merged = merge(&per_worker_stats(&records)).unwrap();
    assert_eq!(merged.succ() + merged.fail(), (WORKERS * TXS_PER_WORKER) as u64);
}

#[tokio::test(start_paused = true)]
async fn rejections_and_timeouts_count_as_failures() {
    let mut config = test_memory_network();
    config.memory = Some(MemoryConfig {
        commit_latency: Duration::from_millis(5),
        reject_every: 5,
        ..MemoryConfig::default()
    });
    let records = run_workload(config, InvokeTimeout::default()).await;
    let merged = merge(&per_worker_stats(&records)).unwrap();
    let total = (WORKERS * TXS_PER_WORKER) as u64;
    assert_eq!(merged.fail(), total / 5);
    assert_eq!(merged.succ(), total - total / 5);

    // Every invocation overruns a 1ms deadline.
    let mut slow = test_memory_network();
    slow.memory = Some(MemoryConfig { commit_latency: Duration::from_secs(1), ..MemoryConfig::default() });
    let records = run_workload(slow, InvokeTimeout::from(Duration::from_millis(1))).await;
    let merged = merge(&per_worker_stats(&records)).unwrap();
    assert_eq!(merged.succ(), 0);
    assert_eq!(merged.fail(), total);
    assert!(merged.valid_ms().is_none());
    assert!(merged.create_ms().is_some());
    assert!(records.iter().flatten().all(|tx| !tx.verified));
}

#[tokio::test(start_paused = true)]
async fn query_sees_committed_writes() {
    let chain = Blockchain::new(test_memory_network()).unwrap();
    chain.init().await.unwrap();
    chain.install_smart_contract().await.unwrap();
    let creds = chain.create_clients(1).await.unwrap().remove(0);
    let ctx = chain.get_context("query", &creds).await.unwrap();

    let genesis = chain.query_state(&ctx, TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, "genesis").await.unwrap();
    assert_eq!(genesis.result, Some(json!(1)));

    chain
        .invoke_smart_contract(
            &ctx,
            TEST_CONTRACT_ID,
            TEST_CONTRACT_VERSION,
            &json!({"key": "genesis"}),
            InvokeTimeout::from_json(Some(&json!("soon"))),
        )
        .await
        .unwrap();
    let deleted = chain.query_state(&ctx, TEST_CONTRACT_ID, TEST_CONTRACT_VERSION, "genesis").await.unwrap();
    assert_eq!(deleted.status, TxStatus::Success);
    assert_eq!(deleted.result, Some(serde_json::Value::Null));

    chain.release_context(&ctx).await.unwrap();
}
