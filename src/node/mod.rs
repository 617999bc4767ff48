//! Node adapter layer
//!
//! - `NodeClient`: the capability set the bridge needs from Bitcoin Core
//! - `DescriptorCodec`: descriptor canonicalization (checksum recomputation)
//! - `ClientFactory`: per-query client construction for the status surface
//! - `decode`: local shapes for calls whose upstream typing disagrees with the wire
//! - `rpc`: the `bitcoincore-rpc` backed implementation

pub mod decode;
pub mod rpc;

use std::sync::Arc;

use bitcoin::{Amount, BlockHash};
use serde_json::Value;

use crate::error::NodeError;
use crate::types::*;

pub use rpc::{RpcClientFactory, RpcNodeClient, RpcSettings};

/// Calls into a full node. All methods block until the node answers.
///
/// `import_descriptors` and `rescan_blockchain` may block for hours.
pub trait NodeClient: Send + Sync {
    /// Untyped passthrough, for calls decoded through [`decode`]
    fn raw_request(&self, method: &'static str, params: &[Value]) -> Result<Value, NodeError>;

    fn best_block_hash(&self) -> Result<BlockHash, NodeError>;

    fn block_count(&self) -> Result<u64, NodeError>;

    /// Hash of the block at `height` on the best chain
    fn block_hash(&self, height: u64) -> Result<BlockHash, NodeError>;

    fn block(&self, hash: &BlockHash) -> Result<BlockSummary, NodeError>;

    fn wallet_scan_state(&self) -> Result<WalletScanState, NodeError>;

    fn tx_out_set_info(&self) -> Result<TxOutSetInfo, NodeError>;

    fn address_info(&self, address: &str) -> Result<AddressInfo, NodeError>;

    /// Derive the address at `index` of a (ranged) descriptor
    fn derive_address(&self, descriptor: &str, index: u32) -> Result<String, NodeError>;

    /// Bulk import; the node rescans from the oldest timestamp before returning
    fn import_descriptors(&self, requests: &[ImportRequest]) -> Result<(), NodeError>;

    /// Returns whether a running scan was actually aborted
    fn abort_rescan(&self) -> Result<bool, NodeError>;

    fn rescan_blockchain(&self, start: u64, stop: u64) -> Result<(), NodeError>;

    /// Fee rate per kvB, or `None` when the node has not enough data
    fn estimate_smart_fee(&self, target: u16, mode: FeeMode) -> Result<Option<Amount>, NodeError>;
}

pub trait DescriptorCodec: Send + Sync {
    /// Canonical form of `descriptor` including a freshly computed checksum
    fn canonical_descriptor(&self, descriptor: &str) -> Result<String, NodeError>;
}

pub trait ClientFactory: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn NodeClient>, NodeError>;
}
