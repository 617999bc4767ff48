//! Corebridge: Bitcoin Core sync and wallet-scan state for external clients
//!
//! This crate watches a full node's synchronization and wallet rescan state,
//! reduces it to a small [`Status`] model, and drives the one-time import of
//! watch-only descriptors into the node's wallet.
//!
//! # Architecture
//!
//! - **Node adapter** ([`node`]): the `NodeClient`/`DescriptorCodec` capability
//!   traits, the `bitcoincore-rpc` implementation and the local decoding of
//!   calls whose upstream typing disagrees with the wire format
//! - **Sync worker** ([`worker`]): IBD wait, supply audit, import or resumed
//!   rescan, checkpointing, plus a progress watchdog
//! - **Status surface** ([`status`], [`chain`]): status, health, fee and
//!   network queries that never fail
//! - **Supervisor** ([`supervisor`]): turns any fatal task error into a
//!   process-wide shutdown
//!
//! # Example
//!
//! ```ignore
//! use corebridge::{StatusAggregator, RpcClientFactory, WorkerState};
//!
//! let state = Arc::new(WorkerState::new());
//! let status = StatusAggregator::new(Arc::new(RpcClientFactory::new(settings)), state);
//! println!("{:?}", status.get_status().status);
//! ```

pub mod chain;
pub mod checkpoint;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod import;
pub mod node;
pub mod status;
pub mod supervisor;
pub mod supply;
pub mod types;
pub mod worker;

// Re-exports for convenience
pub use chain::ChainExplorer;
pub use checkpoint::{CheckpointStore, FileCheckpointStore, RescanCheckpoint};
pub use config::{Account, BridgeConfig};
pub use descriptor::{Branch, Descriptor, BIP0039_GENESIS, DEFAULT_ACCOUNT_DEPTH};
pub use error::{BridgeError, NodeError, StorageError};
pub use import::{ImportCoordinator, ImportSummary};
pub use node::{ClientFactory, DescriptorCodec, NodeClient, RpcClientFactory, RpcNodeClient, RpcSettings};
pub use status::StatusAggregator;
pub use supervisor::{Supervisor, FATAL_EXIT_CODE};
pub use supply::{expected_supply, SupplyAudit};
pub use types::*;
pub use worker::{ImportReason, SyncPath, SyncWorker, WorkerOptions, WorkerOutcome, WorkerState};

/// Crate version reported in every status
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Common result type
pub type Result<T> = std::result::Result<T, BridgeError>;
