//! Common test utilities for corebridge integration tests
//!
//! This module provides a scripted in-memory node:
//! - `MockNode`: implements `NodeClient` and `DescriptorCodec` over a mutable `NodeState`
//! - `MockFactory`: hands out the node, or fails as if it were unreachable
//! - Helpers for accounts, temporary checkpoint stores and logging

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bitcoin::{Amount, BlockHash};
use chrono::DateTime;
use serde_json::{json, Value};
use tempfile::TempDir;

use corebridge::{
    Account, AddressInfo, BlockSummary, ClientFactory, DescriptorCodec, FeeMode,
    FileCheckpointStore, ImportRequest, NodeClient, NodeError, TxOutSetInfo, WalletScanState,
};

pub const TIP_HASH: &str = "0000000000000000000320283a032748cef8227873ff4872689bf23f1cda83a5";

pub fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// Everything the mock node knows, plus call counters
#[derive(Clone, Debug, Default)]
pub struct NodeState {
    pub blocks: u64,
    pub headers: u64,
    pub verification_progress: f64,
    /// Blocks gained on every `getblockchaininfo` while behind
    pub catch_up_per_poll: u64,
    /// `(progress, duration secs)` while the wallet is rescanning
    pub scanning: Option<(f64, u64)>,
    pub watched: HashSet<String>,
    pub fees: HashMap<u16, u64>,
    /// UTXO set total in sats
    pub total_amount: u64,
    pub pruned: bool,
    pub tx_index: bool,

    pub unreachable: bool,
    pub garbled_chain_info: bool,
    pub fail_wallet_info: bool,
    pub fail_derive: bool,
    pub fail_address_info: bool,
    pub fail_import: bool,
    pub fail_abort: bool,
    pub fail_rescan: bool,
    pub import_delay: Duration,
    pub rescan_delay: Duration,
    pub tx_out_set_delay: Duration,
    pub wallet_info_delay: Duration,

    pub chain_info_calls: usize,
    pub index_info_calls: usize,
    pub wallet_info_calls: usize,
    pub tx_out_set_calls: usize,
    pub abort_calls: usize,
    pub import_batches: Vec<Vec<ImportRequest>>,
    pub rescans: Vec<(u64, u64)>,
}

pub struct MockNode {
    state: Mutex<NodeState>,
}

impl MockNode {
    /// A node fully synced at `height` with an idle wallet
    pub fn synced(height: u64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(NodeState {
                blocks: height,
                headers: height,
                verification_progress: 1.0,
                ..Default::default()
            }),
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn snapshot(&self) -> NodeState {
        self.state.lock().unwrap().clone()
    }

    fn address(descriptor: &str, index: u32) -> String {
        format!("addr:{}:{}", descriptor, index)
    }

    fn check_reachable(state: &NodeState) -> Result<(), NodeError> {
        if state.unreachable {
            return Err(NodeError::Unreachable("connection refused".into()));
        }
        Ok(())
    }
}

impl NodeClient for MockNode {
    fn raw_request(&self, method: &'static str, _params: &[Value]) -> Result<Value, NodeError> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;

        match method {
            "getblockchaininfo" => {
                state.chain_info_calls += 1;
                if state.garbled_chain_info {
                    return Ok(json!({ "blocks": "many", "warnings": 7 }));
                }
                let info = json!({
                    "chain": "main",
                    "blocks": state.blocks,
                    "headers": state.headers,
                    "bestblockhash": TIP_HASH,
                    "verificationprogress": state.verification_progress,
                    "initialblockdownload": state.blocks != state.headers,
                    "pruned": state.pruned,
                    "warnings": [],
                });
                if state.blocks < state.headers {
                    state.blocks = (state.blocks + state.catch_up_per_poll).min(state.headers);
                }
                Ok(info)
            }
            "getindexinfo" => {
                state.index_info_calls += 1;
                if state.tx_index {
                    Ok(json!({ "txindex": { "synced": true, "best_block_height": state.blocks } }))
                } else {
                    Ok(json!({}))
                }
            }
            "getnetworkinfo" => Ok(json!({
                "version": 270000,
                "subversion": "/Satoshi:27.0.0/",
                "relayfee": 0.00001,
                "incrementalfee": 0.00001,
                "warnings": [],
            })),
            other => Err(NodeError::rpc(other, "Method not found")),
        }
    }

    fn best_block_hash(&self) -> Result<BlockHash, NodeError> {
        Self::check_reachable(&self.state.lock().unwrap())?;
        BlockHash::from_str(TIP_HASH).map_err(|e| NodeError::InvalidResponse(e.to_string()))
    }

    fn block_count(&self) -> Result<u64, NodeError> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        Ok(state.blocks)
    }

    fn block_hash(&self, height: u64) -> Result<BlockHash, NodeError> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        if height != state.blocks {
            return Err(NodeError::rpc("getblockhash", "Block height out of range"));
        }
        BlockHash::from_str(TIP_HASH).map_err(|e| NodeError::InvalidResponse(e.to_string()))
    }

    fn block(&self, hash: &BlockHash) -> Result<BlockSummary, NodeError> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        Ok(BlockSummary {
            hash: *hash,
            height: state.blocks,
            time: DateTime::from_timestamp(1_713_571_767, 0).unwrap(),
            transactions: vec!["a".repeat(64)],
        })
    }

    fn wallet_scan_state(&self) -> Result<WalletScanState, NodeError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            Self::check_reachable(&state)?;
            state.wallet_info_calls += 1;
            state.wallet_info_delay
        };
        std::thread::sleep(delay);

        let state = self.state.lock().unwrap();
        if state.fail_wallet_info {
            return Err(NodeError::rpc("getwalletinfo", "Requested wallet does not exist or is not loaded"));
        }
        Ok(match state.scanning {
            Some((progress, secs)) => WalletScanState::Scanning {
                progress,
                duration: Duration::from_secs(secs),
            },
            None => WalletScanState::NotScanning,
        })
    }

    fn tx_out_set_info(&self) -> Result<TxOutSetInfo, NodeError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            Self::check_reachable(&state)?;
            state.tx_out_set_calls += 1;
            state.tx_out_set_delay
        };
        std::thread::sleep(delay);

        let state = self.state.lock().unwrap();
        Ok(TxOutSetInfo {
            height: state.blocks,
            total_amount: Amount::from_sat(state.total_amount),
        })
    }

    fn address_info(&self, address: &str) -> Result<AddressInfo, NodeError> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        if state.fail_address_info {
            return Err(NodeError::rpc("getaddressinfo", "Invalid address"));
        }
        Ok(AddressInfo {
            is_watch_only: state.watched.contains(address),
        })
    }

    fn derive_address(&self, descriptor: &str, index: u32) -> Result<String, NodeError> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        if state.fail_derive {
            return Err(NodeError::rpc("deriveaddresses", "Missing checksum"));
        }
        Ok(Self::address(descriptor, index))
    }

    fn import_descriptors(&self, requests: &[ImportRequest]) -> Result<(), NodeError> {
        let delay = {
            let state = self.state.lock().unwrap();
            Self::check_reachable(&state)?;
            state.import_delay
        };
        // Blocks like the real call, without holding the lock
        std::thread::sleep(delay);

        let mut state = self.state.lock().unwrap();
        if state.fail_import {
            return Err(NodeError::rpc("importdescriptors", "Rescan failed"));
        }
        for request in requests {
            state.watched.insert(Self::address(&request.descriptor, request.range[1]));
        }
        state.import_batches.push(requests.to_vec());
        Ok(())
    }

    fn abort_rescan(&self) -> Result<bool, NodeError> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        state.abort_calls += 1;
        if state.fail_abort {
            return Err(NodeError::rpc("abortrescan", "Wallet is locked"));
        }
        Ok(state.scanning.take().is_some())
    }

    fn rescan_blockchain(&self, start: u64, stop: u64) -> Result<(), NodeError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            Self::check_reachable(&state)?;
            if state.fail_rescan {
                return Err(NodeError::rpc("rescanblockchain", "Invalid start_height"));
            }
            state.rescans.push((start, stop));
            state.rescan_delay
        };
        std::thread::sleep(delay);
        Ok(())
    }

    fn estimate_smart_fee(&self, target: u16, _mode: FeeMode) -> Result<Option<Amount>, NodeError> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        Ok(state.fees.get(&target).map(|sat| Amount::from_sat(*sat)))
    }
}

impl DescriptorCodec for MockNode {
    fn canonical_descriptor(&self, descriptor: &str) -> Result<String, NodeError> {
        if descriptor.contains("invalid") {
            return Err(NodeError::rpc("getdescriptorinfo", "Invalid descriptor"));
        }
        Ok(format!("{}#chk{:05}", descriptor, descriptor.len()))
    }
}

pub struct MockFactory {
    pub node: Arc<MockNode>,
    pub reachable: AtomicBool,
}

impl MockFactory {
    pub fn new(node: Arc<MockNode>) -> Arc<Self> {
        Arc::new(Self {
            node,
            reachable: AtomicBool::new(true),
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl ClientFactory for MockFactory {
    fn connect(&self) -> Result<Arc<dyn NodeClient>, NodeError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(NodeError::Unreachable("dial tcp 127.0.0.1:8332: connection refused".into()));
        }
        Ok(self.node.clone())
    }
}

pub fn account(name: &str) -> Account {
    Account {
        external: format!("wpkh([{}/84'/0'/0']xpub/0/*)#oldsum00", name),
        internal: format!("wpkh([{}/84'/0'/0']xpub/1/*)#oldsum01", name),
        depth: None,
        birthday: None,
    }
}

/// Checkpoint store in a temp dir that lives as long as the returned guard
pub fn temp_store() -> (TempDir, FileCheckpointStore) {
    let dir = TempDir::new().unwrap();
    let store = FileCheckpointStore::new(dir.path().join("rescan.json"));
    (dir, store)
}
