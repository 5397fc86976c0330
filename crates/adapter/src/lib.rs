//! Adapter facade for ledger benchmarks.
//!
//! A benchmark driver talks to every ledger through the same seven
//! operations:
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | [`Blockchain::init`] | One-time network setup |
//! | [`Blockchain::create_clients`] | Issue client credential sets |
//! | [`Blockchain::install_smart_contract`] | Deploy configured contracts |
//! | [`Blockchain::get_context`] | Bind a worker to one client |
//! | [`Blockchain::release_context`] | Tear the binding down, exactly once |
//! | [`Blockchain::invoke_smart_contract`] | Submit a transaction, wait for commit |
//! | [`Blockchain::query_state`] | Read committed state |
//!
//! The backend is selected from the network configuration's marker section
//! ([`detect_backend`]). Two in-process backends ship with the crate:
//! [`MemoryLedger`] and [`ChainLedger`]. Both implement [`LedgerAdapter`],
//! the contract a production SDK adapter fulfils as well.
//!
//! # Example
//!
//! ```no_run
//! use ledger_bench_adapter::{Blockchain, InvokeTimeout};
//! use ledger_bench_types::NetworkConfig;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NetworkConfig::load("network.toml")?;
//! let chain = Blockchain::new(config)?;
//! chain.init().await?;
//! chain.install_smart_contract().await?;
//!
//! let clients = chain.create_clients(1).await?;
//! let ctx = chain.get_context("transfer", &clients[0]).await?;
//! let tx = chain
//!     .invoke_smart_contract(&ctx, "simple", "v0", &json!({"key": "a", "value": 1}), InvokeTimeout::default())
//!     .await?;
//! println!("{} {}", tx.id, tx.status);
//! chain.release_context(&ctx).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod backend;
mod context;
mod error;
mod facade;
mod metrics;
mod timeout;

pub use adapter::{CLIENT_SECRET_LEN, ClientCredentials, LedgerAdapter, Session};
pub use backend::{Backend, ChainLedger, MemoryLedger};
pub use context::Context;
pub use error::{AdapterError, Result};
pub use facade::{Blockchain, detect_backend};
pub use metrics::{BenchMetrics, ContextEvent, MetricsBenchMetrics, NoopBenchMetrics, Operation};
pub use timeout::{DEFAULT_INVOKE_TIMEOUT, InvokeTimeout};
