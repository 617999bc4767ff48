//! Domain types shared between the node adapter, the worker and the status surface

use std::collections::BTreeMap;
use std::time::Duration;

use bitcoin::{Amount, BlockHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Node-reported chain state, decoded from a raw `getblockchaininfo` call.
///
/// Polled repeatedly and never cached beyond one use.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    pub chain: String,
    pub blocks: u64,
    pub headers: u64,
    pub best_block_hash: String,
    pub verification_progress: f64,
    pub initial_block_download: bool,
    pub pruned: bool,
    pub softforks: Vec<SoftFork>,
    pub warnings: Vec<String>,
}

impl ChainSnapshot {
    /// Whether the node has downloaded every block it has a header for
    pub fn is_caught_up(&self) -> bool {
        self.blocks == self.headers
    }

    /// Verification progress as a percentage
    pub fn sync_percent(&self) -> f64 {
        self.verification_progress * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftFork {
    pub id: String,
    pub version: Option<i32>,
    pub active: Option<bool>,
    pub rejected: Option<bool>,
}

/// Wallet rescan state as reported by `getwalletinfo`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WalletScanState {
    NotScanning,
    Scanning { progress: f64, duration: Duration },
}

impl WalletScanState {
    pub fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning { .. })
    }
}

/// Result of `gettxoutsetinfo`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutSetInfo {
    pub height: u64,
    pub total_amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressInfo {
    pub is_watch_only: bool,
}

/// One entry of a bulk `importdescriptors` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRequest {
    #[serde(rename = "desc")]
    pub descriptor: String,
    pub timestamp: i64,
    pub range: [u32; 2],
}

/// Fee estimation mode forwarded to `estimatesmartfee`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeMode {
    #[default]
    Unset,
    Economical,
    Conservative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub hash: BlockHash,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub transactions: Vec<String>,
}

/// How the configured wallet was made available on the node at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletOrigin {
    AlreadyLoaded,
    Loaded,
    Created,
}

/// Externally visible bridge status, derived on every query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NodeDisconnected,
    PendingScan,
    Syncing,
    Scanning,
    Ready,
}

/// Static facts about the node, recorded once the worker first sees it synced
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NodeProfile {
    pub chain: String,
    pub pruned: bool,
    #[serde(rename = "txindex")]
    pub tx_index: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub version: String,
    /// Empty until the worker has recorded it
    #[serde(flatten)]
    pub node: NodeProfile,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_progress: Option<f64>,
}

impl StatusReport {
    pub fn new(status: Status, node: NodeProfile) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            node,
            status,
            sync_progress: None,
            scan_progress: None,
        }
    }

    /// Progress (0-100) for the Syncing/Scanning states
    pub fn progress(&self) -> Option<f64> {
        self.sync_progress.or(self.scan_progress)
    }
}

/// Fee rates in sat/kvB keyed by confirmation target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeEstimates {
    #[serde(flatten)]
    pub fees: BTreeMap<String, Option<u64>>,
    pub last_updated: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NetworkReport {
    pub relay_fee: f64,
    pub incremental_fee: f64,
    pub version: i64,
    pub subversion: String,
}
