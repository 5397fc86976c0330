//! Core types and configuration for ledger benchmarking.
//!
//! This crate provides the foundational types shared by the adapter facade and
//! the statistics engine:
//! - Transaction outcome records and their status lifecycle
//! - Backend identification (`BackendKind`) and context identifiers
//! - Network configuration with per-backend marker sections
//! - Machine-readable error codes

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ChainConfig, ConfigError, ContractSpec, MemoryConfig, NetworkConfig};
pub use error::ErrorCode;
pub use types::*;
